//! Viewer session: one log, one playback controller, one render loop.
//!
//! Derived per-log state (obstacles, radii, bounds) is computed once in
//! [`ViewerSession::load`]. Every state change marks the session dirty;
//! [`ViewerSession::present`] rebuilds the traces for the current frame and
//! hands them to the render loop.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::bounds::{compute_bounds, SceneBounds};
use crate::config::ViewerConfig;
use crate::flight_log::SimulationLog;
use crate::obstacles::{report_unrecognized, Obstacle};
use crate::playback::{PlaybackController, PlaybackState, TimerKey};
use crate::render_loop::{InteractionOutcome, PresentOutcome, RenderLoop, RenderStats, RendererSlot};
use crate::renderer::{InteractionEvent, RenderError, Renderer3D};
use crate::traces::build_traces_with_window;

/// Info line shown when the log has no frames.
pub const NO_FRAMES_TEXT: &str = "No frames available to render";

/// Unique identifier for a viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visible state of the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ViewerStatus {
    /// Renderer still loading
    Loading,
    Ready,
    /// Renderer failed to load or the last render failed
    Error(String),
    Released,
}

/// A log plus everything derived from it once per load.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub log: Arc<SimulationLog>,
    pub obstacles: Vec<Obstacle>,
    pub goal_threshold: f64,
    pub drone_radius: f64,
    pub bounds: SceneBounds,
}

impl LoadedScene {
    pub fn new(log: Arc<SimulationLog>, config: &ViewerConfig) -> Self {
        let obstacles = log.obstacles();
        let goal_threshold = log.goal_threshold(config.default_goal_threshold);
        let drone_radius = log.drone_radius(config.default_drone_radius);
        let bounds = compute_bounds(&log, &obstacles, goal_threshold, drone_radius);
        Self {
            log,
            obstacles,
            goal_threshold,
            drone_radius,
            bounds,
        }
    }
}

pub struct ViewerSession {
    id: SessionId,
    config: ViewerConfig,
    playback: PlaybackController,
    render: RenderLoop,
    scene: Option<LoadedScene>,
    dirty: bool,
}

impl ViewerSession {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            id: SessionId::new(),
            playback: PlaybackController::new(config.playback),
            render: RenderLoop::new(),
            config,
            scene: None,
            dirty: false,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render
    }

    pub fn scene(&self) -> Option<&LoadedScene> {
        self.scene.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn frame_count(&self) -> usize {
        self.scene.as_ref().map(|s| s.log.frame_count()).unwrap_or(0)
    }

    /// Replaces the log and resets frame, play state, camera, and scene.
    pub fn load(&mut self, log: Arc<SimulationLog>) {
        let scene = LoadedScene::new(log, &self.config);
        let skipped = report_unrecognized(&scene.obstacles);
        tracing::info!(
            session = %self.id,
            frames = scene.log.frame_count(),
            obstacles = scene.obstacles.len(),
            skipped_obstacles = skipped,
            "log loaded"
        );

        self.playback.load(scene.log.frame_count());
        self.render.reset_for_new_log();
        self.scene = Some(scene);
        self.dirty = true;
    }

    pub fn toggle_play(&mut self) -> bool {
        self.playback.toggle()
    }

    pub fn play(&mut self) {
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn reset(&mut self) {
        self.dirty |= self.playback.reset();
    }

    pub fn scrub(&mut self, frame: usize) {
        self.dirty |= self.playback.scrub(frame);
    }

    pub fn set_speed(&mut self, speed_ms: u64) -> u64 {
        self.playback.set_speed(speed_ms)
    }

    /// Timer callback: advances one frame if playing.
    pub fn tick(&mut self) -> Option<usize> {
        let frame = self.playback.tick()?;
        self.dirty = true;
        Some(frame)
    }

    pub fn timer_key(&self) -> TimerKey {
        self.playback.timer_key()
    }

    pub fn timer_period(&self) -> Option<std::time::Duration> {
        self.playback.timer_period()
    }

    /// Installs the loaded renderer. Returns its interaction events.
    pub fn attach_renderer(
        &mut self,
        renderer: Arc<dyn Renderer3D>,
    ) -> Option<mpsc::UnboundedReceiver<InteractionEvent>> {
        let events = self.render.attach(renderer)?;
        self.dirty = true;
        Some(events)
    }

    pub fn renderer_failed(&mut self, error: RenderError) {
        self.render.fail_load(error);
    }

    /// Applies a camera interaction.
    ///
    /// Settling after a drag marks the session dirty so that anything held
    /// back during the drag is presented.
    pub fn handle_event(&mut self, event: &InteractionEvent) -> InteractionOutcome {
        let was_interacting = self.render.is_interacting();
        let outcome = self.render.handle_event(event);
        self.playback.set_interacting(outcome.interacting);
        if was_interacting && !outcome.interacting {
            self.dirty = true;
        }
        outcome
    }

    /// Presents the current frame if anything changed since the last present.
    ///
    /// Renders nothing for a log without frames. Errors are kept in the
    /// status rather than returned.
    pub async fn present(&mut self) -> Option<PresentOutcome> {
        if !self.dirty {
            return None;
        }
        let scene = self.scene.as_ref()?;
        if scene.log.is_empty() {
            self.dirty = false;
            return None;
        }

        let traces = build_traces_with_window(
            &scene.log,
            self.playback.current_frame(),
            &scene.obstacles,
            scene.goal_threshold,
            scene.drone_radius,
            self.config.trail_window,
        );
        let bounds = scene.bounds;

        let outcome = self
            .render
            .present(&traces, &bounds, &self.config.render)
            .await
            .unwrap_or(PresentOutcome::Failed);
        // Anything not drawn stays dirty and is retried on the next present
        if matches!(
            outcome,
            PresentOutcome::Created | PresentOutcome::Updated | PresentOutcome::Released
        ) {
            self.dirty = false;
        }
        Some(outcome)
    }

    /// `Frame: i / max | Time: t.ttts | Drones: n`, or the empty-log text.
    pub fn info_text(&self) -> String {
        let Some(scene) = self.scene.as_ref().filter(|s| !s.log.is_empty()) else {
            return NO_FRAMES_TEXT.to_string();
        };
        let frame = self.playback.current_frame();
        let (time, drones) = scene
            .log
            .state(frame)
            .map(|s| (s.time(), s.drone_count()))
            .unwrap_or((0.0, 0));
        format!(
            "Frame: {} / {} | Time: {:.3}s | Drones: {}",
            frame,
            scene.log.max_frame(),
            time,
            drones
        )
    }

    pub fn status(&self) -> ViewerStatus {
        match self.render.slot() {
            RendererSlot::Loading => ViewerStatus::Loading,
            RendererSlot::Failed(msg) => ViewerStatus::Error(msg.clone()),
            RendererSlot::Released => ViewerStatus::Released,
            RendererSlot::Ready { .. } => match self.render.last_error() {
                Some(err) => ViewerStatus::Error(err.to_string()),
                None => ViewerStatus::Ready,
            },
        }
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            session: self.id,
            playback: self.playback.state(),
            frame_count: self.frame_count(),
            interacting: self.render.is_interacting(),
            scene_created: self.render.scene_created(),
            camera: self.render.camera().to_value(),
            bounds: self.scene.as_ref().map(|s| s.bounds).unwrap_or_default(),
            info_text: self.info_text(),
            status: self.status(),
            stats: self.render.stats(),
        }
    }

    /// Releases the renderer. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.playback.pause();
        self.render.release();
        tracing::debug!(session = %self.id, "viewer torn down");
    }
}

/// Point-in-time view of a session, for callers outside the actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub session: SessionId,
    pub playback: PlaybackState,
    pub frame_count: usize,
    pub interacting: bool,
    pub scene_created: bool,
    pub camera: Option<serde_json::Value>,
    pub bounds: SceneBounds,
    pub info_text: String,
    pub status: ViewerStatus,
    pub stats: RenderStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_log::{Coords, DroneId, SimulationFrame, SimulationState};
    use crate::headless::RecordingRenderer;
    use serde_json::json;

    fn log(frames: usize) -> Arc<SimulationLog> {
        Arc::new(SimulationLog::new(
            (0..frames)
                .map(|i| {
                    SimulationFrame::from(SimulationState {
                        t: Some(i as f64 * 0.1),
                        pos: vec![Coords::from([i as f64, 0.0, 1.0]), Coords::from([0.0, i as f64, 1.0])],
                        ids: vec![DroneId::Int(0), DroneId::Int(1)],
                        goals: vec![],
                    })
                })
                .collect(),
        ))
    }

    fn ready_session(renderer: &Arc<RecordingRenderer>) -> ViewerSession {
        let mut session = ViewerSession::new(ViewerConfig::default());
        session.attach_renderer(renderer.clone()).unwrap();
        session
    }

    #[test]
    fn test_info_text() {
        let mut session = ViewerSession::new(ViewerConfig::default());
        assert_eq!(session.info_text(), NO_FRAMES_TEXT);

        session.load(log(0));
        assert_eq!(session.info_text(), NO_FRAMES_TEXT);

        session.load(log(20));
        session.scrub(12);
        assert_eq!(session.info_text(), "Frame: 12 / 19 | Time: 1.200s | Drones: 2");
    }

    #[tokio::test]
    async fn test_present_only_when_dirty() {
        let renderer = RecordingRenderer::shared();
        let mut session = ready_session(&renderer);
        session.load(log(5));

        assert_eq!(session.present().await, Some(PresentOutcome::Created));
        assert_eq!(session.present().await, None);

        session.scrub(3);
        assert_eq!(session.present().await, Some(PresentOutcome::Updated));
        assert_eq!(renderer.last_scene().unwrap().trail_segments, 6);
    }

    #[tokio::test]
    async fn test_empty_log_renders_nothing() {
        let renderer = RecordingRenderer::shared();
        let mut session = ready_session(&renderer);
        session.load(log(0));

        assert_eq!(session.present().await, None);
        assert!(!session.toggle_play());
        assert_eq!(session.snapshot().bounds, SceneBounds::UNIT);
        assert_eq!(renderer.create_count(), 0);
    }

    #[tokio::test]
    async fn test_drag_holds_frames_until_settled() {
        let renderer = RecordingRenderer::shared();
        let mut session = ready_session(&renderer);
        session.load(log(5));
        session.present().await;
        session.play();

        session.handle_event(&InteractionEvent::Dragging(
            json!({"scene.camera.eye.x": 2}).as_object().cloned().unwrap(),
        ));
        assert_eq!(session.tick(), None);
        session.scrub(2);
        assert_eq!(session.present().await, Some(PresentOutcome::Suppressed));

        session.handle_event(&InteractionEvent::Settled(serde_json::Map::new()));
        assert_eq!(session.present().await, Some(PresentOutcome::Updated));
        assert_eq!(
            renderer.last_scene().unwrap().layout.scene.camera,
            Some(json!({"eye": {"x": 2}}))
        );
        assert_eq!(session.tick(), Some(3));
    }

    #[tokio::test]
    async fn test_reload_resets_everything() {
        let renderer = RecordingRenderer::shared();
        let mut session = ready_session(&renderer);
        session.load(log(5));
        session.present().await;
        session.handle_event(&InteractionEvent::Settled(
            json!({"scene.camera.eye.x": 2}).as_object().cloned().unwrap(),
        ));
        session.play();
        session.scrub(4);

        session.load(log(8));
        let snap = session.snapshot();
        assert_eq!(snap.playback.current_frame, 0);
        assert!(!snap.playback.is_playing);
        assert_eq!(snap.camera, None);
        assert!(!snap.scene_created);

        assert_eq!(session.present().await, Some(PresentOutcome::Created));
        assert_eq!(renderer.create_count(), 2);
    }

    #[tokio::test]
    async fn test_render_failure_is_status() {
        let renderer = RecordingRenderer::shared();
        renderer.fail_next_creates(1);
        let mut session = ready_session(&renderer);
        session.load(log(3));

        assert_eq!(session.present().await, Some(PresentOutcome::Failed));
        assert!(matches!(session.status(), ViewerStatus::Error(_)));
        assert!(session.is_dirty());

        assert_eq!(session.present().await, Some(PresentOutcome::Created));
        assert_eq!(session.status(), ViewerStatus::Ready);
    }

    #[test]
    fn test_load_failure_status() {
        let mut session = ViewerSession::new(ViewerConfig::default());
        assert_eq!(session.status(), ViewerStatus::Loading);

        session.renderer_failed(RenderError::load("Failed to load renderer module"));
        assert_eq!(
            session.status(),
            ViewerStatus::Error("Failed to load renderer: Failed to load renderer module".into())
        );

        session.teardown();
        assert_eq!(session.status(), ViewerStatus::Released);
    }
}
