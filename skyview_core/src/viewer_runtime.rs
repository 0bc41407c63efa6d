//! Viewer actor: one tokio task per viewer.
//!
//! The task owns its [`ViewerSession`] and reacts to four sources, one
//! message at a time:
//!
//! ```text
//!   ViewerHandle ──commands──┐
//!   RendererLoader ──ready───┤
//!   Renderer3D ──events──────┼──▶ ViewerSession ──present──▶ Renderer3D
//!   ctx.sleep(speed) ──tick──┘
//! ```
//!
//! Render calls are awaited inside the task, so a scene creation always
//! completes before the next update is issued. The playback timer is a
//! sleep on the [`ViewerContext`] and is re-armed whenever the playback
//! [`TimerKey`] changes.

use skyview_env::ViewerContext;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::config::ViewerConfig;
use crate::flight_log::SimulationLog;
use crate::playback::TimerKey;
use crate::renderer::{InteractionEvent, RenderError, Renderer3D, RendererLoader};
use crate::viewer::{SessionId, ViewerSession, ViewerSnapshot, ViewerStatus};

const READY_POLL: Duration = Duration::from_millis(10);

type LoadResult = Result<Arc<dyn Renderer3D>, RenderError>;
type Timer = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Messages accepted by a viewer task.
#[derive(Debug)]
pub enum ViewerCommand {
    Load(Arc<SimulationLog>),
    TogglePlay,
    Play,
    Pause,
    Reset,
    Scrub(usize),
    SetSpeed(u64),
    Snapshot(oneshot::Sender<ViewerSnapshot>),
    Shutdown,
}

/// Cloneable handle to a running viewer.
///
/// Dropping every handle tears the viewer down.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<ViewerCommand>,
}

impl ViewerHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// True once the viewer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    pub fn send(&self, command: ViewerCommand) -> Result<(), RenderError> {
        self.commands.send(command).map_err(|_| RenderError::Released)
    }

    pub fn load(&self, log: impl Into<Arc<SimulationLog>>) -> Result<(), RenderError> {
        self.send(ViewerCommand::Load(log.into()))
    }

    pub fn toggle_play(&self) -> Result<(), RenderError> {
        self.send(ViewerCommand::TogglePlay)
    }

    pub fn play(&self) -> Result<(), RenderError> {
        self.send(ViewerCommand::Play)
    }

    pub fn pause(&self) -> Result<(), RenderError> {
        self.send(ViewerCommand::Pause)
    }

    pub fn reset(&self) -> Result<(), RenderError> {
        self.send(ViewerCommand::Reset)
    }

    pub fn scrub(&self, frame: usize) -> Result<(), RenderError> {
        self.send(ViewerCommand::Scrub(frame))
    }

    pub fn set_speed(&self, speed_ms: u64) -> Result<(), RenderError> {
        self.send(ViewerCommand::SetSpeed(speed_ms))
    }

    /// Current state, after every previously sent command has been applied.
    pub async fn snapshot(&self) -> Result<ViewerSnapshot, RenderError> {
        let (tx, rx) = oneshot::channel();
        self.send(ViewerCommand::Snapshot(tx))?;
        rx.await.map_err(|_| RenderError::Released)
    }

    /// Waits until the renderer has loaded and the current log is on screen.
    ///
    /// Fails with the viewer's error status if the renderer could not be
    /// loaded.
    pub async fn wait_ready(&self) -> Result<ViewerSnapshot, RenderError> {
        loop {
            let snapshot = self.snapshot().await?;
            match &snapshot.status {
                ViewerStatus::Loading => tokio::time::sleep(READY_POLL).await,
                ViewerStatus::Ready => return Ok(snapshot),
                ViewerStatus::Error(message) => return Err(RenderError::Viewer(message.clone())),
                ViewerStatus::Released => return Err(RenderError::Released),
            }
        }
    }

    /// Asks the viewer to release its renderer and stop.
    pub fn shutdown(&self) {
        let _ = self.commands.send(ViewerCommand::Shutdown);
    }
}

/// Spawns a viewer task and starts loading its renderer.
pub fn spawn_viewer<Ctx, L>(ctx: Arc<Ctx>, loader: L, config: ViewerConfig) -> ViewerHandle
where
    Ctx: ViewerContext,
    L: RendererLoader,
{
    let session = ViewerSession::new(config);
    let id = session.id();
    let (commands_tx, commands) = mpsc::unbounded_channel();
    let (load_tx, load_rx) = oneshot::channel();

    ctx.spawn("renderer-load", async move {
        let _ = load_tx.send(loader.load().await);
    });

    let actor = ViewerActor {
        ctx: Arc::clone(&ctx),
        session,
        commands,
        load: Some(load_rx),
        events: None,
        timer: None,
        armed: None,
    };
    ctx.spawn("viewer", actor.run());

    ViewerHandle {
        id,
        commands: commands_tx,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

struct ViewerActor<Ctx: ViewerContext> {
    ctx: Arc<Ctx>,
    session: ViewerSession,
    commands: mpsc::UnboundedReceiver<ViewerCommand>,
    load: Option<oneshot::Receiver<LoadResult>>,
    events: Option<mpsc::UnboundedReceiver<InteractionEvent>>,
    timer: Option<Timer>,
    /// Key the current timer was armed for
    armed: Option<TimerKey>,
}

impl<Ctx: ViewerContext> ViewerActor<Ctx> {
    async fn run(mut self) {
        let started = self.ctx.now();
        tracing::debug!(session = %self.session.id(), name = %self.session.config().name, "viewer started");

        loop {
            self.rearm_timer();

            let step = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => Step::Stop,
                },
                loaded = recv_load(&mut self.load), if self.load.is_some() => {
                    self.load = None;
                    self.on_loaded(loaded.unwrap_or_else(|_| Err(RenderError::load("renderer loader dropped"))), started);
                    Step::Continue
                }
                event = recv_event(&mut self.events), if self.events.is_some() => {
                    match event {
                        Some(event) => {
                            self.session.handle_event(&event);
                        }
                        None => self.events = None,
                    }
                    Step::Continue
                }
                _ = wait_timer(&mut self.timer), if self.timer.is_some() => {
                    self.timer = None;
                    self.armed = None;
                    self.session.tick();
                    Step::Continue
                }
            };

            if step == Step::Stop {
                break;
            }
            self.session.present().await;
        }

        self.timer = None;
        self.events = None;
        self.session.teardown();
    }

    fn handle_command(&mut self, command: ViewerCommand) -> Step {
        match command {
            ViewerCommand::Load(log) => self.session.load(log),
            ViewerCommand::TogglePlay => {
                self.session.toggle_play();
            }
            ViewerCommand::Play => self.session.play(),
            ViewerCommand::Pause => self.session.pause(),
            ViewerCommand::Reset => self.session.reset(),
            ViewerCommand::Scrub(frame) => self.session.scrub(frame),
            ViewerCommand::SetSpeed(speed_ms) => {
                self.session.set_speed(speed_ms);
            }
            ViewerCommand::Snapshot(reply) => {
                let _ = reply.send(self.session.snapshot());
            }
            ViewerCommand::Shutdown => return Step::Stop,
        }
        Step::Continue
    }

    fn on_loaded(&mut self, result: LoadResult, started: std::time::Duration) {
        let elapsed = self.ctx.now().saturating_sub(started);
        match result {
            Ok(renderer) => {
                tracing::debug!(session = %self.session.id(), elapsed_ms = elapsed.as_millis() as u64, "renderer loaded");
                self.events = self.session.attach_renderer(renderer);
            }
            Err(error) => self.session.renderer_failed(error),
        }
    }

    /// Replaces the timer when anything it depends on has changed.
    fn rearm_timer(&mut self) {
        let key = self.session.timer_key();
        if self.armed == Some(key) {
            return;
        }
        self.armed = Some(key);
        self.timer = self.session.timer_period().map(|period| {
            let ctx = Arc::clone(&self.ctx);
            Box::pin(async move { ctx.sleep(period).await }) as Timer
        });
    }
}

async fn recv_load(rx: &mut Option<oneshot::Receiver<LoadResult>>) -> Result<LoadResult, oneshot::error::RecvError> {
    match rx {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}

async fn recv_event(rx: &mut Option<mpsc::UnboundedReceiver<InteractionEvent>>) -> Option<InteractionEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_timer(timer: &mut Option<Timer>) {
    match timer {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_log::{Coords, DroneId, SimulationFrame, SimulationState};
    use crate::headless::{RecordingLoader, RecordingRenderer};
    use serde_json::json;
    use skyview_env::TokioContext;

    fn log(frames: usize) -> SimulationLog {
        SimulationLog::new(
            (0..frames)
                .map(|i| {
                    SimulationFrame::from(SimulationState {
                        t: Some(i as f64 * 0.1),
                        pos: vec![Coords::from([i as f64, 0.0, 1.0])],
                        ids: vec![DroneId::Int(0)],
                        goals: vec![Coords::from([10.0, 0.0, 1.0])],
                    })
                })
                .collect(),
        )
    }

    fn fields(v: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        v.as_object().cloned().unwrap()
    }

    fn spawn(renderer: &Arc<RecordingRenderer>) -> ViewerHandle {
        spawn_viewer(
            TokioContext::shared(),
            RecordingLoader::new(renderer.clone()),
            ViewerConfig::default(),
        )
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_advances_on_cadence() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn(&renderer);
        viewer.load(log(10)).unwrap();
        viewer.play().unwrap();

        advance(760).await;
        let snap = viewer.snapshot().await.unwrap();

        assert_eq!(snap.playback.current_frame, 3);
        assert_eq!(snap.status, ViewerStatus::Ready);
        assert_eq!(renderer.create_count(), 1);
        assert_eq!(renderer.update_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_change_restarts_interval() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn(&renderer);
        viewer.load(log(10)).unwrap();
        viewer.play().unwrap();

        advance(200).await;
        viewer.set_speed(1000).unwrap();
        advance(900).await;
        assert_eq!(viewer.snapshot().await.unwrap().playback.current_frame, 0);

        advance(150).await;
        assert_eq!(viewer.snapshot().await.unwrap().playback.current_frame, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_pauses_and_camera_persists() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn(&renderer);
        viewer.load(log(10)).unwrap();
        viewer.play().unwrap();
        advance(260).await;

        renderer.emit(InteractionEvent::Dragging(fields(json!({"scene.camera.eye": {"x": 2, "y": 0}}))));
        advance(1000).await;
        let snap = viewer.snapshot().await.unwrap();
        assert!(snap.interacting);
        assert_eq!(snap.playback.current_frame, 1);
        assert_eq!(renderer.update_count(), 1);

        renderer.emit(InteractionEvent::Settled(fields(json!({"scene.camera.eye.z": 1}))));
        advance(10).await;
        let snap = viewer.snapshot().await.unwrap();
        assert!(!snap.interacting);
        assert_eq!(snap.camera, Some(json!({"eye": {"x": 2, "y": 0, "z": 1}})));
        assert_eq!(renderer.update_count(), 2);

        advance(250).await;
        assert_eq!(viewer.snapshot().await.unwrap().playback.current_frame, 2);
        assert_eq!(
            renderer.last_scene().unwrap().layout.scene.camera,
            Some(json!({"eye": {"x": 2, "y": 0, "z": 1}}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_playback() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn_viewer(
            TokioContext::shared(),
            RecordingLoader::new(renderer.clone()).failing("module not found"),
            ViewerConfig::default(),
        );
        viewer.load(log(10)).unwrap();
        viewer.play().unwrap();
        advance(510).await;

        let snap = viewer.snapshot().await.unwrap();
        assert_eq!(snap.playback.current_frame, 2);
        assert_eq!(
            snap.status,
            ViewerStatus::Error("Failed to load renderer: module not found".into())
        );
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scene_created_once_renderer_arrives() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn_viewer(
            TokioContext::shared(),
            RecordingLoader::new(renderer.clone()).with_delay(Duration::from_millis(100)),
            ViewerConfig::default(),
        );
        viewer.load(log(10)).unwrap();
        viewer.scrub(4).unwrap();

        let snap = viewer.snapshot().await.unwrap();
        assert_eq!(snap.status, ViewerStatus::Loading);
        assert!(!snap.scene_created);

        advance(150).await;
        let snap = viewer.snapshot().await.unwrap();
        assert!(snap.scene_created);
        assert_eq!(renderer.create_count(), 1);
        assert_eq!(renderer.last_scene().unwrap().trail_segments, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ready_before_scrubbing_presents_every_frame() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn_viewer(
            TokioContext::shared(),
            RecordingLoader::new(renderer.clone()).with_delay(Duration::from_millis(100)),
            ViewerConfig::default(),
        );
        viewer.load(log(5)).unwrap();

        let snap = viewer.wait_ready().await.unwrap();
        assert!(snap.scene_created);
        assert_eq!(snap.stats.creates, 1);

        for frame in 1..5 {
            viewer.scrub(frame).unwrap();
        }
        let snap = viewer.snapshot().await.unwrap();
        assert_eq!(snap.stats.creates + snap.stats.updates, 5);
        assert_eq!(renderer.update_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ready_reports_load_failure() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn_viewer(
            TokioContext::shared(),
            RecordingLoader::new(renderer.clone()).failing("no display"),
            ViewerConfig::default(),
        );
        viewer.load(log(3)).unwrap();

        match viewer.wait_ready().await {
            Err(RenderError::Viewer(message)) => assert!(message.contains("no display")),
            other => panic!("expected a viewer error, got {:?}", other.map(|s| s.status)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_once() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn(&renderer);
        viewer.load(log(3)).unwrap();
        advance(1).await;

        viewer.shutdown();
        advance(1).await;
        viewer.shutdown();
        advance(1).await;

        assert!(viewer.is_closed());
        assert_eq!(renderer.destroy_count(), 1);
        assert_eq!(renderer.subscriber_count(), 0);
        assert_eq!(viewer.snapshot().await.unwrap_err(), RenderError::Released);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_tears_down() {
        let renderer = RecordingRenderer::shared();
        let viewer = spawn(&renderer);
        advance(1).await;

        drop(viewer);
        advance(1).await;
        assert_eq!(renderer.destroy_count(), 1);
    }
}
