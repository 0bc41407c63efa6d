//! The 3D rendering capability consumed by the render loop.
//!
//! # Implementations
//! - [`crate::RecordingRenderer`] - Records calls (tests, headless replays)
//! - `RerunRenderer` - Logs scenes to a Rerun recording (feature `visualization`)

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::layout::{Layout, RenderConfig};
use crate::primitives::Primitive;

/// Errors raised by renderers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The renderer could not be loaded
    #[error("Failed to load renderer: {0}")]
    Load(String),

    /// A create or update call failed
    #[error("Scene operation failed: {0}")]
    Scene(String),

    /// The renderer or viewer has already been released
    #[error("Renderer has been released")]
    Released,

    /// The viewer reported an error status
    #[error("Viewer error: {0}")]
    Viewer(String),
}

impl RenderError {
    pub fn load(msg: impl Into<String>) -> Self {
        RenderError::Load(msg.into())
    }

    pub fn scene(msg: impl Into<String>) -> Self {
        RenderError::Scene(msg.into())
    }
}

/// A camera interaction reported by the renderer.
///
/// Payloads are flat maps of key paths (`scene.camera.eye.x`) or partial
/// objects (`scene.camera`).
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Continuous event while the user drags the camera
    Dragging(Map<String, Value>),
    /// Terminal event once the camera has settled
    Settled(Map<String, Value>),
}

impl InteractionEvent {
    pub fn fields(&self) -> &Map<String, Value> {
        match self {
            InteractionEvent::Dragging(fields) | InteractionEvent::Settled(fields) => fields,
        }
    }

    /// True while the interaction is still in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self, InteractionEvent::Dragging(_))
    }
}

/// Handle for an interaction subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// An active interaction subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::UnboundedReceiver<InteractionEvent>,
}

/// A live 3D scene surface.
#[async_trait]
pub trait Renderer3D: Send + Sync + 'static {
    /// Renderer name (for logging).
    fn name(&self) -> &str;

    /// Creates the scene from scratch, replacing any previous content.
    async fn create_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        config: &RenderConfig,
    ) -> Result<(), RenderError>;

    /// Replaces the content of an existing scene.
    async fn update_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        config: &RenderConfig,
    ) -> Result<(), RenderError>;

    /// Releases the scene and everything attached to it.
    fn destroy_scene(&self);

    /// Starts delivering interaction events.
    fn subscribe(&self) -> Subscription;

    /// Stops delivering events to `id`. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Loads a renderer asynchronously.
#[async_trait]
pub trait RendererLoader: Send + Sync + 'static {
    async fn load(&self) -> Result<Arc<dyn Renderer3D>, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_accessors() {
        let fields = json!({"scene.camera.eye.x": 1}).as_object().cloned().unwrap();
        let drag = InteractionEvent::Dragging(fields.clone());
        let settle = InteractionEvent::Settled(fields);

        assert!(drag.is_dragging());
        assert!(!settle.is_dragging());
        assert_eq!(drag.fields(), settle.fields());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RenderError::load("module missing").to_string(),
            "Failed to load renderer: module missing"
        );
        assert_eq!(RenderError::Released.to_string(), "Renderer has been released");
    }
}
