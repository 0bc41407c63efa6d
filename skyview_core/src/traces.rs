//! Trace builder: the full primitive list for one frame.
//!
//! Output order is fixed: obstacle boxes, trail segments (oldest step
//! first), goal spheres, drone spheres. The builder is pure; the same
//! inputs always produce the same list.

use std::ops::RangeInclusive;

use crate::flight_log::SimulationLog;
use crate::obstacles::{obstacle_geometry, Obstacle};
use crate::primitives::{sphere_mesh, Color, MeshRole, Primitive, TrailSegment};

/// Number of most recent steps drawn as trail.
pub const TRAIL_WINDOW: usize = 100;

/// Line width of trail segments.
pub const TRAIL_WIDTH: f32 = 4.0;

/// Steps whose segments (from `s - 1` to `s`) make up the trail at `frame_index`.
///
/// Empty when `frame_index` is 0 or the log has fewer than two frames.
pub fn trail_steps(frame_index: usize, frame_count: usize, window: usize) -> RangeInclusive<usize> {
    let last = frame_index.min(frame_count.saturating_sub(1));
    if frame_index == 0 || last == 0 {
        return RangeInclusive::new(1, 0);
    }
    let first = (frame_index + 1).saturating_sub(window.max(1)).max(1);
    first..=last
}

/// Builds every primitive for `frame_index` with the default trail window.
pub fn build_traces(
    log: &SimulationLog,
    frame_index: usize,
    obstacles: &[Obstacle],
    goal_threshold: f64,
    drone_radius: f64,
) -> Vec<Primitive> {
    build_traces_with_window(log, frame_index, obstacles, goal_threshold, drone_radius, TRAIL_WINDOW)
}

/// Builds every primitive for `frame_index` with an explicit trail window.
pub fn build_traces_with_window(
    log: &SimulationLog,
    frame_index: usize,
    obstacles: &[Obstacle],
    goal_threshold: f64,
    drone_radius: f64,
    window: usize,
) -> Vec<Primitive> {
    let mut traces: Vec<Primitive> = obstacles.iter().flat_map(obstacle_geometry).collect();

    for step in trail_steps(frame_index, log.frame_count(), window) {
        let (Some(prev), Some(curr)) = (log.state(step - 1), log.state(step)) else {
            continue;
        };
        let previous = prev.positions_by_id();
        for (id, to) in curr.drones() {
            let Some(from) = previous.get(id) else {
                continue;
            };
            traces.push(Primitive::Trail(TrailSegment {
                drone: id.clone(),
                step,
                from: *from,
                to,
                color: Color::TRAIL,
                width: TRAIL_WIDTH,
            }));
        }
    }

    let Some(state) = log.state(frame_index) else {
        return traces;
    };

    let mut first_goal = true;
    for (index, goal) in state.goals.iter().enumerate() {
        let Some(center) = goal.point() else {
            continue;
        };
        let owner = state
            .ids
            .get(index)
            .map(ToString::to_string)
            .unwrap_or_else(|| index.to_string());
        let mut mesh = sphere_mesh(
            center,
            goal_threshold,
            MeshRole::Goal,
            &format!("Goal (Drone {})", owner),
            Color::GOAL,
        );
        if first_goal {
            mesh.legend = Some("Goals".to_string());
            first_goal = false;
        }
        traces.push(Primitive::Mesh(mesh));
    }

    let use_ids = state.ids_match_positions();
    let mut first_drone = true;
    for (index, coords) in state.pos.iter().enumerate() {
        let Some(center) = coords.point() else {
            continue;
        };
        let label = if use_ids {
            state.ids[index].to_string()
        } else {
            index.to_string()
        };
        let mut mesh = sphere_mesh(
            center,
            drone_radius,
            MeshRole::Drone,
            &format!("Drone {}", label),
            Color::DRONE,
        );
        if first_drone {
            mesh.legend = Some("Drones".to_string());
            first_drone = false;
        }
        traces.push(Primitive::Mesh(mesh));
    }

    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_log::{Coords, DroneId, SimulationFrame, SimulationState};
    use crate::obstacles::extract_obstacles;
    use serde_json::json;

    fn straight_line(frames: usize, ids: &[i64]) -> SimulationLog {
        SimulationLog::new(
            (0..frames)
                .map(|i| {
                    SimulationFrame::from(SimulationState {
                        t: Some(i as f64 * 0.1),
                        pos: ids.iter().map(|d| Coords::from([i as f64, *d as f64, 1.0])).collect(),
                        ids: ids.iter().map(|d| DroneId::Int(*d)).collect(),
                        goals: vec![Coords::from([10.0, 0.0, 1.0])],
                    })
                })
                .collect(),
        )
    }

    fn trails(traces: &[Primitive]) -> Vec<&TrailSegment> {
        traces.iter().filter_map(Primitive::as_trail).collect()
    }

    #[test]
    fn test_first_frame_has_no_trail() {
        let log = straight_line(5, &[0, 1]);
        let traces = build_traces(&log, 0, &[], 1.0, 0.1);

        assert!(trails(&traces).is_empty());
        assert_eq!(traces.len(), 1 + 2);
    }

    #[test]
    fn test_trail_window_at_frame_250() {
        assert_eq!(trail_steps(250, 300, 100), 151..=250);
        assert_eq!(trail_steps(50, 300, 100), 1..=50);
        assert!(trail_steps(0, 300, 100).is_empty());
        assert!(trail_steps(3, 1, 100).is_empty());

        let log = straight_line(300, &[7]);
        let traces = build_traces(&log, 250, &[], 1.0, 0.1);
        let segs = trails(&traces);

        assert_eq!(segs.len(), 100);
        assert_eq!(segs.first().unwrap().step, 151);
        assert_eq!(segs.last().unwrap().step, 250);
        assert_eq!(segs[0].from, [150.0, 7.0, 1.0]);
    }

    #[test]
    fn test_order_and_legend_entries() {
        let meta = json!({"obstacles": [
            {"type": "wall", "position": [0, 0, 1], "length": 4, "thickness": 1, "height": 2}
        ]});
        let log = straight_line(3, &[0, 1]).with_metadata(meta.as_object().cloned().unwrap());
        let obstacles = log.obstacles();
        let traces = build_traces(&log, 2, &obstacles, 0.5, 0.1);

        let roles: Vec<Option<MeshRole>> = traces.iter().map(Primitive::role).collect();
        assert_eq!(
            roles,
            vec![
                Some(MeshRole::Obstacle),
                None,
                None,
                None,
                None,
                Some(MeshRole::Goal),
                Some(MeshRole::Drone),
                Some(MeshRole::Drone),
            ]
        );

        let drones: Vec<_> = traces
            .iter()
            .filter_map(Primitive::as_mesh)
            .filter(|m| m.role == MeshRole::Drone)
            .collect();
        assert_eq!(drones[0].legend.as_deref(), Some("Drones"));
        assert_eq!(drones[1].legend, None);
        assert_eq!(drones[1].name, "Drone 1");

        let goal = traces[5].as_mesh().unwrap();
        assert_eq!(goal.legend.as_deref(), Some("Goals"));
        assert_eq!(goal.name, "Goal (Drone 0)");
    }

    #[test]
    fn test_deterministic() {
        let log = straight_line(40, &[0, 1, 2]);
        let obstacles = extract_obstacles(None);

        assert_eq!(
            build_traces(&log, 33, &obstacles, 1.0, 0.1),
            build_traces(&log, 33, &obstacles, 1.0, 0.1)
        );
    }

    #[test]
    fn test_id_mismatch_and_missing_ids() {
        let log: SimulationLog = serde_json::from_value(json!({
            "frames": [
                {"state": {"pos": [[0, 0, 0], [1, 1, 1]], "ids": ["a", "b"]}},
                {"state": {"pos": [[0, 0, 1], [1, 1, 2], [2, 2, 2]], "ids": ["b", "c"]}}
            ]
        }))
        .unwrap();
        let traces = build_traces(&log, 1, &[], 1.0, 0.1);

        // Only "b" is present in both frames
        let segs = trails(&traces);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].drone, DroneId::from("b"));
        assert_eq!(segs[0].from, [1.0, 1.0, 1.0]);
        assert_eq!(segs[0].to, [0.0, 0.0, 1.0]);

        // ids/pos disagree: positional labels
        let names: Vec<&str> = traces
            .iter()
            .filter_map(Primitive::as_mesh)
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Drone 0", "Drone 1", "Drone 2"]);
    }

    #[test]
    fn test_out_of_range_frame_draws_static_scene_only() {
        let meta = json!({"obstacles": [
            {"type": "clutter", "position": [0, 0, 0], "length": 1, "width": 1, "height": 1}
        ]});
        let obstacles = extract_obstacles(meta.as_object());
        let traces = build_traces(&SimulationLog::default(), 0, &obstacles, 1.0, 0.1);

        assert_eq!(traces.len(), 1);
    }
}
