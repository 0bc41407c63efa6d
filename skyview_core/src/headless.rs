//! Headless renderer that records every call.
//!
//! Used by tests and by the replay harness. Interaction events are injected
//! with [`RecordingRenderer::emit`]; failures can be scripted.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::layout::{Layout, RenderConfig};
use crate::primitives::{MeshRole, Primitive};
use crate::renderer::{InteractionEvent, RenderError, Renderer3D, RendererLoader, Subscription, SubscriptionId};

/// Summary of the traces passed to one call.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub primitives: usize,
    pub obstacles: usize,
    pub trail_segments: usize,
    pub goals: usize,
    pub drones: usize,
    pub layout: Layout,
}

impl SceneSummary {
    fn new(traces: &[Primitive], layout: &Layout) -> Self {
        let count = |role: MeshRole| traces.iter().filter(|p| p.role() == Some(role)).count();
        Self {
            primitives: traces.len(),
            obstacles: count(MeshRole::Obstacle),
            trail_segments: traces.iter().filter(|p| p.as_trail().is_some()).count(),
            goals: count(MeshRole::Goal),
            drones: count(MeshRole::Drone),
            layout: layout.clone(),
        }
    }
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Create(SceneSummary),
    Update(SceneSummary),
    Destroy,
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<RenderCall>,
    subscribers: HashMap<SubscriptionId, mpsc::UnboundedSender<InteractionEvent>>,
    next_subscription: u64,
    failing_creates: usize,
    failing_updates: usize,
}

/// Renderer that records calls instead of drawing.
#[derive(Default)]
pub struct RecordingRenderer {
    state: Mutex<RecorderState>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next `count` create calls fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.lock().failing_creates = count;
    }

    /// Makes the next `count` update calls fail.
    pub fn fail_next_updates(&self, count: usize) {
        self.lock().failing_updates = count;
    }

    /// Sends an event to every subscriber. Returns how many received it.
    pub fn emit(&self, event: InteractionEvent) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|_, tx| !tx.is_closed());
        state
            .subscribers
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.lock().calls.clone()
    }

    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, RenderCall::Create(_)))
    }

    pub fn update_count(&self) -> usize {
        self.count(|c| matches!(c, RenderCall::Update(_)))
    }

    pub fn destroy_count(&self) -> usize {
        self.count(|c| matches!(c, RenderCall::Destroy))
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Summary of the most recent create or update.
    pub fn last_scene(&self) -> Option<SceneSummary> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            RenderCall::Create(s) | RenderCall::Update(s) => Some(s.clone()),
            RenderCall::Destroy => None,
        })
    }

    fn count(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl Renderer3D for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        _config: &RenderConfig,
    ) -> Result<(), RenderError> {
        let mut state = self.lock();
        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(RenderError::scene("scripted create failure"));
        }
        state.calls.push(RenderCall::Create(SceneSummary::new(traces, layout)));
        Ok(())
    }

    async fn update_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        _config: &RenderConfig,
    ) -> Result<(), RenderError> {
        let mut state = self.lock();
        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            return Err(RenderError::scene("scripted update failure"));
        }
        state.calls.push(RenderCall::Update(SceneSummary::new(traces, layout)));
        Ok(())
    }

    fn destroy_scene(&self) {
        self.lock().calls.push(RenderCall::Destroy);
    }

    fn subscribe(&self) -> Subscription {
        let (tx, events) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscribers.insert(id, tx);
        Subscription { id, events }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.lock().subscribers.remove(&id);
    }
}

/// Loader handing out a shared [`RecordingRenderer`].
#[derive(Clone)]
pub struct RecordingLoader {
    renderer: Arc<RecordingRenderer>,
    delay: Duration,
    failure: Option<String>,
}

impl RecordingLoader {
    pub fn new(renderer: Arc<RecordingRenderer>) -> Self {
        Self {
            renderer,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Completes the load only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes the load fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn renderer(&self) -> Arc<RecordingRenderer> {
        Arc::clone(&self.renderer)
    }
}

#[async_trait]
impl RendererLoader for RecordingLoader {
    async fn load(&self) -> Result<Arc<dyn Renderer3D>, RenderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(message) => Err(RenderError::load(message.clone())),
            None => Ok(self.renderer.clone() as Arc<dyn Renderer3D>),
        }
    }
}
