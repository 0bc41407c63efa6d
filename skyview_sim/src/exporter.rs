//! JSON scene exporter.
//!
//! Exports the primitives the viewer would draw for every frame, so that a
//! replay can be inspected or diffed without a renderer.

use serde::{Deserialize, Serialize};
use skyview_core::bounds::SceneBounds;
use skyview_core::traces::build_traces_with_window;
use skyview_core::viewer::LoadedScene;
use skyview_core::{Primitive, SimulationLog, ViewerConfig};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;

/// A single exported frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFrame {
    /// Frame index
    pub frame: usize,

    /// Simulation time in seconds
    pub time_sec: f64,

    /// Drones present in the frame
    pub drones: usize,

    /// Everything the viewer draws for this frame
    pub primitives: Vec<Primitive>,
}

/// Complete scene export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneExport {
    /// Log name
    pub name: String,

    /// Seed used
    pub seed: u64,

    /// Fixed axis ranges for the whole log
    pub bounds: SceneBounds,

    pub goal_threshold: f64,
    pub drone_radius: f64,

    /// Frames in the source log
    pub frame_count: usize,

    /// Exported frames
    pub frames: Vec<ExportFrame>,
}

impl SceneExport {
    /// Builds an export of every `stride`-th frame of `log`.
    pub fn build(name: &str, seed: u64, log: Arc<SimulationLog>, config: &ViewerConfig, stride: usize) -> Self {
        let scene = LoadedScene::new(log, config);
        let frames = (0..scene.log.frame_count())
            .step_by(stride.max(1))
            .map(|index| ExportFrame {
                frame: index,
                time_sec: scene.log.state(index).map(|s| s.time()).unwrap_or(0.0),
                drones: scene.log.state(index).map(|s| s.drone_count()).unwrap_or(0),
                primitives: build_traces_with_window(
                    &scene.log,
                    index,
                    &scene.obstacles,
                    scene.goal_threshold,
                    scene.drone_radius,
                    config.trail_window,
                ),
            })
            .collect();

        Self {
            name: name.to_string(),
            seed,
            bounds: scene.bounds,
            goal_threshold: scene.goal_threshold,
            drone_radius: scene.drone_radius,
            frame_count: scene.log.frame_count(),
            frames,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
