//! Scene bounds: one scan over the whole log producing fixed axis ranges.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::flight_log::{Point3, SimulationLog};
use crate::obstacles::Obstacle;

/// Fraction of the span added on each side of an axis.
pub const PADDING_RATIO: f64 = 0.05;

/// Axis ranges used as fixed, non-autoscaling scene ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl SceneBounds {
    /// The fallback cube `[-1, 1]` on every axis.
    pub const UNIT: SceneBounds = SceneBounds {
        x: [-1.0, 1.0],
        y: [-1.0, 1.0],
        z: [-1.0, 1.0],
    };

    /// Ranges in axis order.
    pub fn axes(&self) -> [[f64; 2]; 3] {
        [self.x, self.y, self.z]
    }

    /// True if `p` lies inside the ranges (inclusive).
    pub fn contains(&self, p: Point3) -> bool {
        self.axes()
            .iter()
            .zip(p.iter())
            .all(|(range, v)| range[0] <= *v && *v <= range[1])
    }
}

impl Default for SceneBounds {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Running min/max over finite points.
#[derive(Debug, Clone, Copy, Default)]
struct Extent {
    range: Option<(Vector3<f64>, Vector3<f64>)>,
}

impl Extent {
    fn include(&mut self, p: Vector3<f64>) {
        if !p.iter().all(|c| c.is_finite()) {
            return;
        }
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.inf(&p), hi.sup(&p)),
            None => (p, p),
        });
    }

    /// Includes the axis-aligned box `center ± half`.
    fn include_box(&mut self, center: Point3, half: Vector3<f64>) {
        let c = Vector3::from(center);
        self.include(c - half);
        self.include(c + half);
    }

    fn padded(self) -> SceneBounds {
        let Some((lo, hi)) = self.range else {
            return SceneBounds::UNIT;
        };
        let axis = |i: usize| {
            let pad = (hi[i] - lo[i]).max(1.0) * PADDING_RATIO;
            [lo[i] - pad, hi[i] + pad]
        };
        SceneBounds {
            x: axis(0),
            y: axis(1),
            z: axis(2),
        }
    }
}

/// Computes padded scene bounds over every frame and obstacle.
///
/// Drone positions are expanded by `drone_radius`, goals by
/// `goal_threshold`, obstacles by half their declared extents. With no
/// finite extent at all the result is exactly [`SceneBounds::UNIT`].
pub fn compute_bounds(
    log: &SimulationLog,
    obstacles: &[Obstacle],
    goal_threshold: f64,
    drone_radius: f64,
) -> SceneBounds {
    let mut extent = Extent::default();
    let drone_half = Vector3::repeat(drone_radius.abs());
    let goal_half = Vector3::repeat(goal_threshold.abs());

    for frame in &log.frames {
        for p in frame.state.pos.iter().filter_map(|c| c.point()) {
            extent.include_box(p, drone_half);
        }
        for g in frame.state.goals.iter().filter_map(|c| c.point()) {
            extent.include_box(g, goal_half);
        }
    }

    for (center, size) in obstacles.iter().filter_map(Obstacle::footprint) {
        let half = Vector3::from(size).abs() / 2.0;
        extent.include_box(center, half);
    }

    extent.padded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_log::{Coords, DroneId, SimulationFrame, SimulationState};
    use crate::obstacles::extract_obstacles;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn log_with_positions(points: &[Point3]) -> SimulationLog {
        let frames = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                SimulationFrame::from(SimulationState {
                    t: Some(i as f64 * 0.1),
                    pos: vec![Coords::from(*p)],
                    ids: vec![DroneId::Int(0)],
                    goals: vec![],
                })
            })
            .collect();
        SimulationLog::new(frames)
    }

    #[test]
    fn test_empty_log_is_unit_cube() {
        assert_eq!(compute_bounds(&SimulationLog::default(), &[], 1.0, 0.1), SceneBounds::UNIT);

        let log: SimulationLog = serde_json::from_value(json!({
            "frames": [{"state": {"pos": [[null, 1, 2]], "goals": [[1]]}}]
        }))
        .unwrap();
        assert_eq!(compute_bounds(&log, &[], 1.0, 0.1), SceneBounds::UNIT);
    }

    #[test]
    fn test_radius_is_included() {
        let log = log_with_positions(&[[-5.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        let bounds = compute_bounds(&log, &[], 1.0, 0.2);

        assert!(bounds.x[0] <= -5.2);
        assert!(bounds.x[1] >= 5.2);
        // span 10.4 → pad 0.52
        assert_relative_eq!(bounds.x[0], -5.72, epsilon = 1e-9);
        assert_relative_eq!(bounds.x[1], 5.72, epsilon = 1e-9);
    }

    #[test]
    fn test_small_span_uses_floor() {
        let log = log_with_positions(&[[0.0, 0.0, 0.0]]);
        let bounds = compute_bounds(&log, &[], 1.0, 0.1);

        // span 0.2 is floored to 1 → pad 0.05
        assert_relative_eq!(bounds.z[0], -0.15, epsilon = 1e-9);
        assert_relative_eq!(bounds.z[1], 0.15, epsilon = 1e-9);
    }

    #[test]
    fn test_obstacles_and_goals_extend_bounds() {
        let meta = json!({"obstacles": [
            {"type": "wall", "position": [0, 0, 1], "length": 4, "thickness": 1, "height": 2},
            {"type": "spaceship", "position": [30, 0, 0]}
        ]});
        let obstacles = extract_obstacles(meta.as_object());
        let log: SimulationLog = serde_json::from_value(json!({
            "frames": [{"state": {"pos": [], "goals": [[0, -10, 0]]}}]
        }))
        .unwrap();

        let bounds = compute_bounds(&log, &obstacles, 1.5, 0.1);

        assert!(bounds.contains([30.0, 0.0, 0.0]));
        assert!(bounds.contains([2.0, 0.5, 2.0]));
        assert!(bounds.y[0] <= -11.5);
    }
}
