//! Rerun-backed renderer.
//!
//! Logs every scene to a Rerun recording:
//! - obstacle, goal and drone meshes as `Mesh3D` under `world/<role>/<n>`
//! - trail segments as one `LineStrips3D` batch under `world/trail`
//! - one `frame` timeline step per create/update
//!
//! Rerun does not report camera changes back, so subscriptions never
//! receive events.
//!
//! Enable with the `visualization` feature flag.

use async_trait::async_trait;
use rerun::{RecordingStream, RecordingStreamBuilder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

use crate::layout::{Layout, RenderConfig};
use crate::primitives::{Mesh, MeshRole, Primitive};
use crate::renderer::{InteractionEvent, RenderError, Renderer3D, RendererLoader, Subscription, SubscriptionId};

fn to_f32(p: [f64; 3]) -> [f32; 3] {
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

fn scene_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::scene(err.to_string())
}

/// Renderer that streams scenes into a Rerun recording.
pub struct RerunRenderer {
    rec: RecordingStream,
    step: AtomicI64,
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<InteractionEvent>>>,
    next_subscription: AtomicI64,
}

impl RerunRenderer {
    pub fn new(rec: RecordingStream) -> Self {
        Self {
            rec,
            step: AtomicI64::new(0),
            subscribers: Mutex::new(HashMap::new()),
            next_subscription: AtomicI64::new(0),
        }
    }

    /// Spawns a Rerun viewer and records into it.
    pub fn spawn(app_id: &str) -> Result<Self, RenderError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .spawn()
            .map_err(|e| RenderError::load(e.to_string()))?;
        Ok(Self::new(rec))
    }

    /// Records into an `.rrd` file.
    pub fn save(app_id: &str, path: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let rec = RecordingStreamBuilder::new(app_id)
            .save(path.into())
            .map_err(|e| RenderError::load(e.to_string()))?;
        Ok(Self::new(rec))
    }

    fn log_scene(&self, traces: &[Primitive], layout: &Layout) -> Result<(), RenderError> {
        self.rec
            .set_time_sequence("frame", self.step.fetch_add(1, Ordering::Relaxed));
        self.rec
            .log("world", &rerun::Clear::recursive())
            .map_err(scene_error)?;

        let mut counters: HashMap<MeshRole, usize> = HashMap::new();
        let mut strips: Vec<[[f32; 3]; 2]> = Vec::new();
        let mut trail_color = None;
        let mut trail_width = 1.0_f32;

        for primitive in traces {
            match primitive {
                Primitive::Mesh(mesh) => {
                    let n = counters.entry(mesh.role).or_insert(0);
                    self.log_mesh(mesh, *n)?;
                    *n += 1;
                }
                Primitive::Trail(seg) => {
                    strips.push([to_f32(seg.from), to_f32(seg.to)]);
                    trail_color = Some(seg.color.to_rgba());
                    trail_width = seg.width;
                }
            }
        }

        if let Some(color) = trail_color {
            self.rec
                .log(
                    "world/trail",
                    &rerun::LineStrips3D::new(strips)
                        .with_colors([color])
                        .with_radii([rerun::Radius::new_ui_points(trail_width)]),
                )
                .map_err(scene_error)?;
        }

        let bounds = layout.bounds();
        let center = [
            ((bounds.x[0] + bounds.x[1]) / 2.0) as f32,
            ((bounds.y[0] + bounds.y[1]) / 2.0) as f32,
            ((bounds.z[0] + bounds.z[1]) / 2.0) as f32,
        ];
        let size = [
            (bounds.x[1] - bounds.x[0]) as f32,
            (bounds.y[1] - bounds.y[0]) as f32,
            (bounds.z[1] - bounds.z[0]) as f32,
        ];
        self.rec
            .log(
                "world/bounds",
                &rerun::Boxes3D::from_centers_and_sizes([center], [size]).with_colors([[211, 211, 211, 255]]),
            )
            .map_err(scene_error)?;

        Ok(())
    }

    fn log_mesh(&self, mesh: &Mesh, index: usize) -> Result<(), RenderError> {
        let group = match mesh.role {
            MeshRole::Obstacle => "obstacles",
            MeshRole::Goal => "goals",
            MeshRole::Drone => "drones",
        };
        let [r, g, b, a] = mesh.color.to_rgba();
        self.rec
            .log(
                format!("world/{}/{}", group, index),
                &rerun::Mesh3D::new(mesh.vertices.iter().map(|v| to_f32(*v)))
                    .with_triangle_indices(mesh.triangles.iter().copied())
                    .with_albedo_factor(rerun::Rgba32::from_unmultiplied_rgba(r, g, b, a)),
            )
            .map_err(scene_error)
    }
}

#[async_trait]
impl Renderer3D for RerunRenderer {
    fn name(&self) -> &str {
        "rerun"
    }

    async fn create_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        _config: &RenderConfig,
    ) -> Result<(), RenderError> {
        self.rec
            .log_static("world", &rerun::ViewCoordinates::RIGHT_HAND_Z_UP())
            .map_err(scene_error)?;
        self.log_scene(traces, layout)
    }

    async fn update_scene(
        &self,
        traces: &[Primitive],
        layout: &Layout,
        _config: &RenderConfig,
    ) -> Result<(), RenderError> {
        self.log_scene(traces, layout)
    }

    fn destroy_scene(&self) {
        if let Err(err) = self.rec.log("world", &rerun::Clear::recursive()) {
            tracing::warn!(%err, "failed to clear rerun scene");
        }
        self.rec.flush_blocking();
    }

    fn subscribe(&self) -> Subscription {
        let (tx, events) = mpsc::unbounded_channel();
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed) as u64);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        Subscription { id, events }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Where a [`RerunLoader`] sends its recording.
#[derive(Debug, Clone)]
pub enum RerunSink {
    Spawn,
    File(PathBuf),
}

/// Loader that opens a Rerun recording on demand.
#[derive(Debug, Clone)]
pub struct RerunLoader {
    app_id: String,
    sink: RerunSink,
}

impl RerunLoader {
    pub fn new(app_id: impl Into<String>, sink: RerunSink) -> Self {
        Self {
            app_id: app_id.into(),
            sink,
        }
    }
}

#[async_trait]
impl RendererLoader for RerunLoader {
    async fn load(&self) -> Result<Arc<dyn Renderer3D>, RenderError> {
        let renderer = match &self.sink {
            RerunSink::Spawn => RerunRenderer::spawn(&self.app_id)?,
            RerunSink::File(path) => RerunRenderer::save(&self.app_id, path.clone())?,
        };
        Ok(Arc::new(renderer))
    }
}
