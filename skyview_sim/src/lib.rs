//! SkyView Deterministic Replay Harness
//!
//! Generates synthetic flight logs from a seed and plays them through a
//! viewer session against a headless renderer, checking the viewer's
//! invariants on every frame.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: the playback timer sleeps on a virtual clock
//! - **Input**: logs are pure functions of `(scenario, seed, frames)`
//! - **Interaction**: camera drags are injected at fixed ticks
//!
//! # Usage
//!
//! ```ignore
//! use skyview_sim::{ReplayRunner, scenarios::ScenarioId};
//!
//! let log = Arc::new(ScenarioId::Crossing.generate(42, 200));
//! let result = ReplayRunner::new(42).run("crossing", log).await;
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{ExportFrame, SceneExport};
pub use runner::{load_log, ReplayError, ReplayMetrics, ReplayResult, ReplayRunner};

#[cfg(test)]
mod proptests {
    use crate::scenarios::ScenarioId;
    use proptest::prelude::*;
    use skyview_core::{build_traces, compute_bounds, MeshRole, TRAIL_WINDOW};

    fn scenario() -> impl Strategy<Value = ScenarioId> {
        prop::sample::select(ScenarioId::all())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// The same frame always yields the same primitives.
        #[test]
        fn prop_traces_deterministic(scenario in scenario(), seed in 0u64..1000, frame in 0usize..60) {
            let log = scenario.generate(seed, 60);
            let obstacles = log.obstacles();
            let a = build_traces(&log, frame, &obstacles, 0.5, 0.15);
            let b = build_traces(&log, frame, &obstacles, 0.5, 0.15);
            prop_assert_eq!(a, b);
        }

        /// Every drone and goal center lies inside the scene bounds.
        #[test]
        fn prop_bounds_contain_log(scenario in scenario(), seed in 0u64..1000, frames in 1usize..80) {
            let log = scenario.generate(seed, frames);
            let bounds = compute_bounds(&log, &log.obstacles(), 0.5, 0.15);
            for frame in &log.frames {
                for p in frame.state.pos.iter().chain(frame.state.goals.iter()).filter_map(|c| c.point()) {
                    prop_assert!(bounds.contains(p), "{:?} outside {:?}", p, bounds);
                }
            }
        }

        /// Trail segments never exceed window x drones.
        #[test]
        fn prop_trail_bounded(scenario in scenario(), seed in 0u64..1000, frame in 0usize..150) {
            let log = scenario.generate(seed, 150);
            let traces = build_traces(&log, frame, &log.obstacles(), 0.5, 0.15);
            let trails = traces.iter().filter(|p| p.as_trail().is_some()).count();
            let drones = log.frames.iter().map(|f| f.state.drone_count()).max().unwrap_or(0);
            prop_assert!(trails <= frame.min(TRAIL_WINDOW) * drones);

            let drawn = traces.iter().filter(|p| p.role() == Some(MeshRole::Drone)).count();
            let expected = log.state(frame).map(|s| s.drone_count()).unwrap_or(0);
            prop_assert_eq!(drawn, expected);
        }
    }
}
