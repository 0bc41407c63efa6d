//! Replay runner - plays a log through a viewer session and checks invariants.
//!
//! The session is driven directly (no actor) against a [`RecordingRenderer`],
//! with the playback timer sleeping on the virtual clock. Checked on every run:
//! - the scene is created exactly once and torn down exactly once
//! - no update is issued while the camera is being dragged
//! - the camera captured during a drag is reapplied on later updates
//! - trail length never exceeds the window
//! - every drone and goal position lies inside the scene bounds
//! - playback wraps from the last frame back to 0

use serde::Serialize;
use serde_json::{json, Map, Value};
use skyview_core::{
    InteractionEvent, PresentOutcome, RecordingRenderer, SimulationLog, ViewerConfig, ViewerSession,
    NO_FRAMES_TEXT,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::SimContext;
use skyview_env::ViewerContext;

/// Errors raised before a replay can start.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read log: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ingest(#[from] skyview_core::IngestError),
}

/// Reads and parses a log file.
pub fn load_log(path: impl AsRef<Path>) -> Result<SimulationLog, ReplayError> {
    let text = std::fs::read_to_string(path)?;
    Ok(SimulationLog::from_json_str(&text)?)
}

/// Results from replaying one log.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    /// Name of the replayed log (scenario name or file name)
    pub name: String,

    /// Seed used
    pub seed: u64,

    /// Whether every invariant held
    pub passed: bool,

    /// Frames in the log
    pub frame_count: usize,

    /// Timer ticks executed
    pub ticks: u64,

    /// Virtual time at the end of the replay
    pub final_time_secs: f64,

    /// Counters collected during the replay
    pub metrics: ReplayMetrics,

    /// Broken invariants, in the order they were found
    pub violations: Vec<String>,
}

impl ReplayResult {
    /// First violation, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.violations.first().map(String::as_str)
    }
}

/// Counters collected during a replay.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayMetrics {
    pub creates: usize,
    pub updates: usize,
    pub suppressed: u64,
    pub destroys: usize,
    pub max_trail_segments: usize,
    pub interaction_events: u64,
}

/// Replays logs against a headless renderer.
pub struct ReplayRunner {
    /// Virtual clock and seed
    ctx: Arc<SimContext>,

    /// Viewer settings under test
    config: ViewerConfig,

    /// Timer ticks to run; defaults to one full pass plus the wrap
    max_ticks: Option<u64>,

    /// Whether to simulate a camera drag mid-replay
    drag: bool,
}

impl ReplayRunner {
    /// Creates a new replay runner.
    pub fn new(seed: u64) -> Self {
        Self {
            ctx: SimContext::shared(seed),
            config: ViewerConfig::default(),
            max_ticks: None,
            drag: true,
        }
    }

    pub fn with_config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn without_drag(mut self) -> Self {
        self.drag = false;
        self
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.ctx
    }

    /// Plays `log` from frame 0 through the wrap and reports violations.
    pub async fn run(&self, name: &str, log: Arc<SimulationLog>) -> ReplayResult {
        info!("Starting replay: {} (seed={}, frames={})", name, self.ctx.seed(), log.frame_count());

        let mut check = Checker::default();
        let renderer = RecordingRenderer::shared();
        let mut session = ViewerSession::new(self.config.clone());
        let mut events = match session.attach_renderer(renderer.clone()) {
            Some(events) => events,
            None => {
                check.fail("renderer could not be attached");
                return self.finish(name, &log, check, 0, &renderer);
            }
        };

        session.load(log.clone());
        session.present().await;

        if log.is_empty() {
            check.ensure(renderer.create_count() == 0, "empty log created a scene");
            check.ensure(!session.toggle_play(), "empty log started playing");
            check.ensure(session.info_text() == NO_FRAMES_TEXT, "empty log info text");
            session.teardown();
            return self.finish(name, &log, check, 0, &renderer);
        }

        check.ensure(renderer.create_count() == 1, "first present did not create the scene");
        self.check_bounds(&session, &log, &mut check);

        let frame_count = log.frame_count() as u64;
        let total_ticks = self.max_ticks.unwrap_or(frame_count);
        let drag_at = (self.drag && frame_count > 2).then_some(frame_count / 3);
        let mut expected_camera: Option<Value> = None;
        let mut ticks = 0;

        session.play();
        while ticks < total_ticks {
            let Some(period) = session.timer_period() else {
                check.fail("timer disarmed while playing");
                break;
            };
            self.ctx.sleep(period).await;
            let Some(frame) = session.tick() else {
                check.fail("tick did not advance while playing");
                break;
            };
            ticks += 1;

            let expected = (ticks % frame_count) as usize;
            check.ensure(frame == expected, &format!("tick {} landed on frame {}", ticks, frame));

            if drag_at == Some(ticks) {
                expected_camera = self.simulate_drag(&mut session, &renderer, &mut events, &mut check).await;
            }

            match session.present().await {
                Some(PresentOutcome::Updated) => {}
                other => check.fail(&format!("frame {} presented as {:?}", frame, other)),
            }

            if let Some(scene) = renderer.last_scene() {
                check.ensure(
                    scene.trail_segments <= self.trail_bound(&log, frame),
                    &format!("frame {} has {} trail segments", frame, scene.trail_segments),
                );
                check.max_trail = check.max_trail.max(scene.trail_segments);
                if let Some(camera) = &expected_camera {
                    check.ensure(
                        scene.layout.scene.camera.as_ref() == Some(camera),
                        &format!("camera lost at frame {}", frame),
                    );
                }
            }
        }

        check.ensure(renderer.create_count() == 1, "scene created more than once");

        session.teardown();
        session.teardown();
        check.ensure(renderer.destroy_count() == 1, "scene not destroyed exactly once");
        check.ensure(renderer.subscriber_count() == 0, "event subscription not dropped");

        check.suppressed = session.render_loop().stats().suppressed;
        check.events = session.render_loop().stats().events;
        self.finish(name, &log, check, ticks, &renderer)
    }

    /// Most trail segments frame `frame` may draw.
    fn trail_bound(&self, log: &SimulationLog, frame: usize) -> usize {
        let steps = frame.min(self.config.trail_window);
        let max_drones = log.frames.iter().map(|f| f.state.drone_count()).max().unwrap_or(0);
        steps * max_drones
    }

    fn check_bounds(&self, session: &ViewerSession, log: &SimulationLog, check: &mut Checker) {
        let Some(scene) = session.scene() else {
            check.fail("log not loaded");
            return;
        };
        for (index, frame) in log.frames.iter().enumerate() {
            let positions = frame.state.pos.iter().chain(frame.state.goals.iter());
            for p in positions.filter_map(|c| c.point()) {
                if !scene.bounds.contains(p) {
                    check.fail(&format!("frame {}: {:?} outside {:?}", index, p, scene.bounds));
                    return;
                }
            }
        }
    }

    /// Drags the camera, verifies playback holds, then settles.
    async fn simulate_drag(
        &self,
        session: &mut ViewerSession,
        renderer: &RecordingRenderer,
        events: &mut mpsc::UnboundedReceiver<InteractionEvent>,
        check: &mut Checker,
    ) -> Option<Value> {
        let drag = fields(json!({"scene.camera.eye": {"x": 1.5, "y": -1.5, "z": 0.8}}));
        let settle = fields(json!({"scene.camera.up.z": 1, "scene.camera.eye.z": 1.2}));

        renderer.emit(InteractionEvent::Dragging(drag));
        let Some(event) = events.recv().await else {
            check.fail("drag event not delivered");
            return None;
        };
        session.handle_event(&event);

        check.ensure(session.timer_period().is_none(), "timer armed during drag");
        check.ensure(session.tick().is_none(), "frame advanced during drag");
        let updates_before = renderer.update_count();
        check.ensure(
            session.present().await == Some(PresentOutcome::Suppressed),
            "present during drag was not suppressed",
        );
        check.ensure(renderer.update_count() == updates_before, "update issued during drag");

        renderer.emit(InteractionEvent::Settled(settle));
        let event = events.recv().await?;
        session.handle_event(&event);
        debug!("camera settled: {:?}", session.render_loop().camera().to_value());

        Some(json!({"eye": {"x": 1.5, "y": -1.5, "z": 1.2}, "up": {"z": 1}}))
    }

    fn finish(
        &self,
        name: &str,
        log: &SimulationLog,
        check: Checker,
        ticks: u64,
        renderer: &RecordingRenderer,
    ) -> ReplayResult {
        let passed = check.violations.is_empty();
        if !passed {
            warn!("{} (seed={}): {} violation(s)", name, self.ctx.seed(), check.violations.len());
        }
        ReplayResult {
            name: name.to_string(),
            seed: self.ctx.seed(),
            passed,
            frame_count: log.frame_count(),
            ticks,
            final_time_secs: self.ctx.now().as_secs_f64(),
            metrics: ReplayMetrics {
                creates: renderer.create_count(),
                updates: renderer.update_count(),
                suppressed: check.suppressed,
                destroys: renderer.destroy_count(),
                max_trail_segments: check.max_trail,
                interaction_events: check.events,
            },
            violations: check.violations,
        }
    }
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<String>,
    max_trail: usize,
    suppressed: u64,
    events: u64,
}

impl Checker {
    fn fail(&mut self, msg: &str) {
        self.violations.push(msg.to_string());
    }

    fn ensure(&mut self, ok: bool, msg: &str) {
        if !ok {
            self.fail(msg);
        }
    }
}
