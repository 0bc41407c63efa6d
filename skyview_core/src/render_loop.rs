//! Camera-preserving render loop.
//!
//! Owns the renderer slot, the scene-created flag, the interaction flag, and
//! the last known camera for one viewer. The first successful present
//! creates the scene; later presents update it with the last camera
//! reapplied. Nothing is sent to the renderer while the user is dragging.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::bounds::SceneBounds;
use crate::camera::CameraState;
use crate::layout::{Layout, RenderConfig};
use crate::primitives::Primitive;
use crate::renderer::{InteractionEvent, RenderError, Renderer3D, SubscriptionId};

/// Lifecycle of the viewer's renderer.
pub enum RendererSlot {
    /// Load in flight
    Loading,
    Ready {
        renderer: Arc<dyn Renderer3D>,
        subscription: SubscriptionId,
    },
    /// Load failed; the message is shown instead of the scene
    Failed(String),
    Released,
}

impl std::fmt::Debug for RendererSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RendererSlot::Loading => write!(f, "Loading"),
            RendererSlot::Ready { renderer, subscription } => {
                write!(f, "Ready({}, {:?})", renderer.name(), subscription)
            }
            RendererSlot::Failed(msg) => write!(f, "Failed({})", msg),
            RendererSlot::Released => write!(f, "Released"),
        }
    }
}

/// What a present call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PresentOutcome {
    /// Renderer not loaded (or failed to load)
    NotReady,
    /// User is interacting; nothing sent
    Suppressed,
    Created,
    Updated,
    /// The renderer rejected the call
    Failed,
    Released,
}

/// Counters over the lifetime of a render loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    pub creates: u64,
    pub updates: u64,
    pub suppressed: u64,
    pub failures: u64,
    pub events: u64,
}

/// Effect of an interaction event on the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionOutcome {
    pub interacting: bool,
    pub camera_changed: bool,
}

#[derive(Debug)]
pub struct RenderLoop {
    slot: RendererSlot,
    camera: CameraState,
    scene_created: bool,
    interacting: bool,
    last_error: Option<RenderError>,
    stats: RenderStats,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            slot: RendererSlot::Loading,
            camera: CameraState::new(),
            scene_created: false,
            interacting: false,
            last_error: None,
            stats: RenderStats::default(),
        }
    }

    pub fn slot(&self) -> &RendererSlot {
        &self.slot
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.slot, RendererSlot::Ready { .. })
    }

    pub fn is_released(&self) -> bool {
        matches!(self.slot, RendererSlot::Released)
    }

    pub fn scene_created(&self) -> bool {
        self.scene_created
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// Last load or scene error, cleared by the next successful present.
    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Installs a loaded renderer and subscribes to its interaction events.
    ///
    /// Returns `None` if the loop was released before the load completed.
    pub fn attach(&mut self, renderer: Arc<dyn Renderer3D>) -> Option<mpsc::UnboundedReceiver<InteractionEvent>> {
        if self.is_released() {
            tracing::debug!(renderer = renderer.name(), "renderer loaded after release, discarding");
            return None;
        }
        let subscription = renderer.subscribe();
        tracing::info!(renderer = renderer.name(), "renderer ready");
        self.slot = RendererSlot::Ready {
            renderer,
            subscription: subscription.id,
        };
        self.last_error = None;
        Some(subscription.events)
    }

    /// Records a failed renderer load.
    pub fn fail_load(&mut self, error: RenderError) {
        if self.is_released() {
            return;
        }
        tracing::error!(%error, "renderer failed to load");
        self.slot = RendererSlot::Failed(error.to_string());
        self.last_error = Some(error);
    }

    /// Forgets the camera and forces the next present to recreate the scene.
    pub fn reset_for_new_log(&mut self) {
        self.camera.clear();
        self.scene_created = false;
        self.interacting = false;
    }

    /// Merges camera fields and updates the interaction flag.
    pub fn handle_event(&mut self, event: &InteractionEvent) -> InteractionOutcome {
        self.stats.events += 1;
        let camera_changed = self.camera.merge_fields(event.fields());
        self.interacting = event.is_dragging();
        InteractionOutcome {
            interacting: self.interacting,
            camera_changed,
        }
    }

    /// Sends `traces` to the renderer.
    ///
    /// Creates the scene if it does not exist yet, otherwise updates it. A
    /// failed create leaves the scene absent so the next present retries.
    pub async fn present(
        &mut self,
        traces: &[Primitive],
        bounds: &SceneBounds,
        config: &RenderConfig,
    ) -> Result<PresentOutcome, RenderError> {
        let renderer = match &self.slot {
            RendererSlot::Ready { renderer, .. } => Arc::clone(renderer),
            RendererSlot::Released => return Ok(PresentOutcome::Released),
            RendererSlot::Loading | RendererSlot::Failed(_) => return Ok(PresentOutcome::NotReady),
        };
        if self.interacting {
            self.stats.suppressed += 1;
            return Ok(PresentOutcome::Suppressed);
        }

        let layout = Layout::for_scene(bounds, &self.camera);
        let result = if self.scene_created {
            renderer
                .update_scene(traces, &layout, config)
                .await
                .map(|_| PresentOutcome::Updated)
        } else {
            renderer
                .create_scene(traces, &layout, config)
                .await
                .map(|_| PresentOutcome::Created)
        };

        match result {
            Ok(outcome) => {
                match outcome {
                    PresentOutcome::Created => {
                        self.scene_created = true;
                        self.stats.creates += 1;
                        tracing::debug!(renderer = renderer.name(), traces = traces.len(), "scene created");
                    }
                    _ => self.stats.updates += 1,
                }
                self.last_error = None;
                Ok(outcome)
            }
            Err(error) => {
                self.stats.failures += 1;
                tracing::warn!(renderer = renderer.name(), %error, "render failed");
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Releases the scene and the event subscription. Safe to call repeatedly.
    pub fn release(&mut self) {
        let previous = std::mem::replace(&mut self.slot, RendererSlot::Released);
        if let RendererSlot::Ready { renderer, subscription } = previous {
            renderer.unsubscribe(subscription);
            renderer.destroy_scene();
            tracing::debug!(renderer = renderer.name(), "scene released");
        }
        self.scene_created = false;
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{RenderCall, RecordingRenderer};
    use serde_json::{json, Map, Value};

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn ready_loop(renderer: &Arc<RecordingRenderer>) -> RenderLoop {
        let mut rl = RenderLoop::new();
        rl.attach(renderer.clone()).unwrap();
        rl
    }

    #[tokio::test]
    async fn test_not_ready_until_attached() {
        let mut rl = RenderLoop::new();
        let outcome = rl.present(&[], &SceneBounds::UNIT, &RenderConfig::default()).await;
        assert_eq!(outcome, Ok(PresentOutcome::NotReady));
        assert!(!rl.scene_created());
    }

    #[tokio::test]
    async fn test_create_then_update_with_camera() {
        let renderer = RecordingRenderer::shared();
        let mut rl = ready_loop(&renderer);
        let config = RenderConfig::default();

        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Created));

        rl.handle_event(&InteractionEvent::Settled(fields(json!({
            "scene.camera": {"eye": {"x": 1.5, "y": 1.5, "z": 1.5}}
        }))));
        rl.handle_event(&InteractionEvent::Settled(fields(json!({"scene.camera.eye.z": 0.2}))));

        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Updated));
        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Updated));

        let last = renderer.last_scene().unwrap();
        assert_eq!(last.layout.scene.camera, Some(json!({"eye": {"x": 1.5, "y": 1.5, "z": 0.2}})));
        assert_eq!(renderer.create_count(), 1);
        assert_eq!(renderer.update_count(), 2);
    }

    #[tokio::test]
    async fn test_no_scene_calls_while_dragging() {
        let renderer = RecordingRenderer::shared();
        let mut rl = ready_loop(&renderer);
        let config = RenderConfig::default();
        rl.present(&[], &SceneBounds::UNIT, &config).await.unwrap();

        let outcome = rl.handle_event(&InteractionEvent::Dragging(fields(json!({"scene.camera.eye.x": 3}))));
        assert!(outcome.interacting);
        assert!(outcome.camera_changed);

        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Suppressed));
        assert_eq!(renderer.update_count(), 0);

        rl.handle_event(&InteractionEvent::Settled(Map::new()));
        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Updated));
        assert_eq!(rl.camera().get("eye.x"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_failed_create_is_retried() {
        let renderer = RecordingRenderer::shared();
        renderer.fail_next_creates(1);
        let mut rl = ready_loop(&renderer);
        let config = RenderConfig::default();

        assert!(rl.present(&[], &SceneBounds::UNIT, &config).await.is_err());
        assert!(!rl.scene_created());
        assert!(rl.last_error().is_some());

        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Created));
        assert!(rl.last_error().is_none());
    }

    #[tokio::test]
    async fn test_new_log_forces_recreation() {
        let renderer = RecordingRenderer::shared();
        let mut rl = ready_loop(&renderer);
        let config = RenderConfig::default();
        rl.present(&[], &SceneBounds::UNIT, &config).await.unwrap();
        rl.handle_event(&InteractionEvent::Settled(fields(json!({"scene.camera.eye.x": 3}))));

        rl.reset_for_new_log();
        assert!(rl.camera().is_empty());
        assert_eq!(rl.present(&[], &SceneBounds::UNIT, &config).await, Ok(PresentOutcome::Created));
        assert_eq!(renderer.last_scene().unwrap().layout.scene.camera, None);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let renderer = RecordingRenderer::shared();
        let mut rl = ready_loop(&renderer);
        assert_eq!(renderer.subscriber_count(), 1);

        rl.release();
        rl.release();
        drop(rl);

        assert_eq!(renderer.calls(), vec![RenderCall::Destroy]);
        assert_eq!(renderer.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_release_before_load() {
        let mut rl = RenderLoop::new();
        rl.release();
        rl.fail_load(RenderError::load("late"));

        let renderer = RecordingRenderer::shared();
        assert!(rl.attach(renderer.clone()).is_none());
        assert!(rl.is_released());
        drop(rl);
        assert_eq!(renderer.destroy_count(), 0);
    }
}
