//! SkyView Core - Interactive 3D trajectory viewer for drone-flight simulation logs
//!
//! Turns a simulation log into a renderable scene, frame by frame:
//! 1. **Log model**: frames of drone positions, ids and goals plus environment metadata
//! 2. **Scene geometry**: obstacle boxes, fixed padded bounds, sliding-window motion trails
//! 3. **Playback**: fixed-cadence frame stepping that pauses while the camera is being dragged
//! 4. **Render loop**: create once, update afterwards, reapply the last observed camera
//!
//! Everything up to the [`Renderer3D`] seam is pure and synchronous.
//! [`spawn_viewer`] drives a [`ViewerSession`] as a tokio actor.

pub mod flight_log;
pub mod metadata;
pub mod ingest;
pub mod obstacles;
pub mod primitives;
pub mod bounds;
pub mod traces;
pub mod camera;
pub mod layout;
pub mod config;
pub mod playback;
pub mod renderer;
pub mod headless;
pub mod render_loop;
pub mod viewer;
pub mod viewer_runtime;

#[cfg(feature = "visualization")]
pub mod visualization;

// Re-export key types for convenience
pub use flight_log::{DroneId, Point3, SimulationFrame, SimulationLog, SimulationState};
pub use ingest::{sanitize_non_finite, IngestError};
pub use obstacles::{build_obstacle_geometry, extract_obstacles, Obstacle, ObstacleKind};
pub use primitives::{Color, Mesh, MeshRole, Primitive, TrailSegment};
pub use bounds::{compute_bounds, SceneBounds};
pub use traces::{build_traces, TRAIL_WINDOW};
pub use camera::CameraState;
pub use layout::{Layout, RenderConfig};
pub use config::{PlaybackConfig, ViewerConfig};
pub use playback::{PlaybackController, PlaybackState};
pub use renderer::{InteractionEvent, RenderError, Renderer3D, RendererLoader, Subscription, SubscriptionId};
pub use headless::{RecordingLoader, RecordingRenderer};
pub use render_loop::{PresentOutcome, RenderLoop};
pub use viewer::{SessionId, ViewerSession, ViewerSnapshot, ViewerStatus, NO_FRAMES_TEXT};
pub use viewer_runtime::{spawn_viewer, ViewerCommand, ViewerHandle};

#[cfg(feature = "visualization")]
pub use visualization::{RerunLoader, RerunRenderer, RerunSink};
