//! Seeded synthetic flight logs.
//!
//! Every scenario is a pure function of `(seed, frames)`, so a failing
//! replay can be reproduced from the seed alone.

use nalgebra::Vector3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};
use skyview_core::flight_log::Coords;
use skyview_core::{DroneId, SimulationFrame, SimulationLog, SimulationState};
use std::f64::consts::TAU;

use crate::context::SimContext;

/// Seconds between consecutive frames.
pub const FRAME_DT: f64 = 0.1;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Drones holding position with small jitter
    Hover,

    /// Drones circling the origin at different altitudes
    Orbit,

    /// Two groups flying through each other to opposite goals
    Crossing,

    /// Crossing flight where drones drop out of some frames
    Dropout,

    /// Frames whose `ids` are shorter than `pos`
    MismatchedIds,

    /// Flight through walls, gates and clutter, plus malformed obstacles
    ObstacleCourse,

    /// A log with no frames
    Empty,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Hover,
            ScenarioId::Orbit,
            ScenarioId::Crossing,
            ScenarioId::Dropout,
            ScenarioId::MismatchedIds,
            ScenarioId::ObstacleCourse,
            ScenarioId::Empty,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Hover => "hover",
            ScenarioId::Orbit => "orbit",
            ScenarioId::Crossing => "crossing",
            ScenarioId::Dropout => "dropout",
            ScenarioId::MismatchedIds => "mismatched_ids",
            ScenarioId::ObstacleCourse => "obstacle_course",
            ScenarioId::Empty => "empty",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Hover => "3 drones hovering over their goals",
            ScenarioId::Orbit => "4 drones orbiting the origin",
            ScenarioId::Crossing => "6 drones crossing to the opposite side",
            ScenarioId::Dropout => "crossing with drones missing from random frames",
            ScenarioId::MismatchedIds => "fewer ids than positions in every frame",
            ScenarioId::ObstacleCourse => "wall, gate and clutter plus unknown and incomplete obstacles",
            ScenarioId::Empty => "no frames at all",
        }
    }

    /// Generates the log for this scenario.
    pub fn generate(&self, seed: u64, frames: usize) -> SimulationLog {
        let mut rng = SimContext::new(seed).derive_rng(*self as u64);
        let frames = if *self == ScenarioId::Empty { 0 } else { frames };

        let log = match self {
            ScenarioId::Hover => hover(&mut rng, frames),
            ScenarioId::Orbit => orbit(&mut rng, frames),
            ScenarioId::Crossing => crossing(&mut rng, frames, 0.0),
            ScenarioId::Dropout => crossing(&mut rng, frames, 0.15),
            ScenarioId::MismatchedIds => mismatched(&mut rng, frames),
            ScenarioId::ObstacleCourse => obstacle_course(&mut rng, frames),
            ScenarioId::Empty => SimulationLog::new(Vec::new()),
        };
        log.with_metadata(base_metadata(self, seed))
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hover" => Ok(ScenarioId::Hover),
            "orbit" => Ok(ScenarioId::Orbit),
            "crossing" => Ok(ScenarioId::Crossing),
            "dropout" => Ok(ScenarioId::Dropout),
            "mismatched_ids" | "mismatched" => Ok(ScenarioId::MismatchedIds),
            "obstacle_course" | "obstacles" => Ok(ScenarioId::ObstacleCourse),
            "empty" => Ok(ScenarioId::Empty),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

fn base_metadata(scenario: &ScenarioId, seed: u64) -> Map<String, Value> {
    let mut meta = json!({
        "scenario": scenario.name(),
        "seed": seed,
        "config": {"simulation": {"goal_threshold": 0.5, "drone_radius": 0.15, "dt": FRAME_DT}}
    });
    if *scenario == ScenarioId::ObstacleCourse {
        meta["environment"] = json!({"obstacles": course_obstacles()});
    }
    match meta {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn point(v: Vector3<f64>) -> Coords {
    Coords::from([v.x, v.y, v.z])
}

fn frame(index: usize, positions: &[Vector3<f64>], ids: Vec<DroneId>, goals: &[Vector3<f64>]) -> SimulationFrame {
    SimulationFrame::from(SimulationState {
        t: Some(index as f64 * FRAME_DT),
        pos: positions.iter().copied().map(point).collect(),
        ids,
        goals: goals.iter().copied().map(point).collect(),
    })
}

fn int_ids(count: usize) -> Vec<DroneId> {
    (0..count as i64).map(DroneId::Int).collect()
}

fn random_point(rng: &mut ChaCha8Rng, half: f64, z: (f64, f64)) -> Vector3<f64> {
    Vector3::new(rng.gen_range(-half..half), rng.gen_range(-half..half), rng.gen_range(z.0..z.1))
}

fn hover(rng: &mut ChaCha8Rng, frames: usize) -> SimulationLog {
    let goals: Vec<Vector3<f64>> = (0..3).map(|_| random_point(rng, 5.0, (1.0, 4.0))).collect();
    let frames = (0..frames)
        .map(|i| {
            let positions: Vec<Vector3<f64>> = goals
                .iter()
                .map(|g| g + Vector3::new(rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05), rng.gen_range(-0.05..0.05)))
                .collect();
            frame(i, &positions, int_ids(3), &goals)
        })
        .collect();
    SimulationLog::new(frames)
}

fn orbit(rng: &mut ChaCha8Rng, frames: usize) -> SimulationLog {
    let orbits: Vec<(f64, f64, f64)> = (0..4)
        .map(|k| (rng.gen_range(2.0..8.0), rng.gen_range(0.2..0.8), 1.0 + k as f64))
        .collect();
    let goals = vec![Vector3::new(0.0, 0.0, 1.0)];
    let frames = (0..frames)
        .map(|i| {
            let t = i as f64 * FRAME_DT;
            let positions: Vec<Vector3<f64>> = orbits
                .iter()
                .enumerate()
                .map(|(k, (r, w, z))| {
                    let phase = k as f64 * TAU / 4.0 + w * t;
                    Vector3::new(r * phase.cos(), r * phase.sin(), *z)
                })
                .collect();
            let ids = (0..orbits.len()).map(|k| DroneId::from(format!("uav-{}", k).as_str())).collect();
            frame(i, &positions, ids, &goals)
        })
        .collect();
    SimulationLog::new(frames)
}

fn crossing(rng: &mut ChaCha8Rng, frames: usize, dropout: f64) -> SimulationLog {
    let count = 6;
    let starts: Vec<Vector3<f64>> = (0..count)
        .map(|k| {
            let side = if k % 2 == 0 { -10.0 } else { 10.0 };
            Vector3::new(side, rng.gen_range(-6.0..6.0), rng.gen_range(1.0..3.0))
        })
        .collect();
    let goals: Vec<Vector3<f64>> = starts.iter().map(|s| Vector3::new(-s.x, -s.y, s.z)).collect();
    let span = frames.saturating_sub(1).max(1) as f64;

    let frames = (0..frames)
        .map(|i| {
            let alpha = i as f64 / span;
            let mut positions = Vec::with_capacity(count);
            let mut ids = Vec::with_capacity(count);
            for k in 0..count {
                if dropout > 0.0 && rng.gen_bool(dropout) {
                    continue;
                }
                positions.push(starts[k].lerp(&goals[k], alpha));
                ids.push(DroneId::Int(k as i64));
            }
            frame(i, &positions, ids, &goals)
        })
        .collect();
    SimulationLog::new(frames)
}

fn mismatched(rng: &mut ChaCha8Rng, frames: usize) -> SimulationLog {
    let velocities: Vec<Vector3<f64>> = (0..4).map(|_| random_point(rng, 1.0, (-0.2, 0.2))).collect();
    let origin = Vector3::new(0.0, 0.0, 2.0);
    let frames = (0..frames)
        .map(|i| {
            let t = i as f64 * FRAME_DT;
            let positions: Vec<Vector3<f64>> = velocities.iter().map(|v| origin + v * t).collect();
            frame(i, &positions, int_ids(positions.len() - 1), &[])
        })
        .collect();
    SimulationLog::new(frames)
}

fn course_obstacles() -> Value {
    json!([
        {"id": "wall-1", "type": "wall", "position": [0, 0, 1], "length": 4, "thickness": 1, "height": 2},
        {"id": "gate-1", "type": "Gate", "position": [5, 0, 1.5], "width": 3, "thickness": 0.2, "height": 3},
        {"id": "box-1", "type": "rectangular_prism", "position": [-5, 3, 0.5], "length": 1, "width": 1, "height": 1},
        {"id": "ufo", "type": "spaceship", "position": [0, 8, 4]},
        {"id": "short", "type": "wall", "position": [0, -8, 1], "length": 2}
    ])
}

fn obstacle_course(rng: &mut ChaCha8Rng, frames: usize) -> SimulationLog {
    let waypoints = [
        Vector3::new(-10.0, -2.0, 1.0),
        Vector3::new(-5.0, 2.0, 2.0),
        Vector3::new(5.0, 0.0, 1.5),
        Vector3::new(10.0, 2.0, 1.0),
    ];
    let offsets: Vec<Vector3<f64>> = (0..2).map(|_| random_point(rng, 0.5, (0.0, 0.5))).collect();
    let goals: Vec<Vector3<f64>> = offsets.iter().map(|o| waypoints[3] + o).collect();
    let span = frames.saturating_sub(1).max(1) as f64;

    let frames = (0..frames)
        .map(|i| {
            let s = (i as f64 / span) * (waypoints.len() - 1) as f64;
            let leg = (s.floor() as usize).min(waypoints.len() - 2);
            let base = waypoints[leg].lerp(&waypoints[leg + 1], s - leg as f64);
            let positions: Vec<Vector3<f64>> = offsets.iter().map(|o| base + o).collect();
            frame(i, &positions, int_ids(positions.len()), &goals)
        })
        .collect();
    SimulationLog::new(frames)
}
