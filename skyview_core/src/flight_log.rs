//! Simulation log model.
//!
//! A log is an ordered list of frames, each holding the drone positions,
//! drone identities, and goal positions at one instant, plus free-form
//! environment metadata (obstacles, thresholds, scores).
//!
//! Parsing is lenient: numbers that were sanitized to `null`, short
//! coordinate arrays, and `pos`/`ids` length mismatches all load fine and
//! are filtered at the point of use.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

use crate::metadata;
use crate::obstacles::{extract_obstacles, Obstacle};

/// A point in scene coordinates `[x, y, z]`.
pub type Point3 = [f64; 3];

// =============================================================================
// DRONE IDENTITY
// =============================================================================

/// Identity of a drone across frames.
///
/// Logs carry either integer or string ids. `1` and `"1"` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum DroneId {
    Int(i64),
    Text(String),
    /// Any other JSON value (fractional float, bool, null), kept in its JSON
    /// spelling. Integral floats such as `1.0` become `Int`.
    Other(String),
}

impl<'de> Deserialize<'de> for DroneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(ref n) if n.is_i64() => DroneId::Int(n.as_i64().unwrap_or_default()),
            Value::Number(ref n) if n.as_f64().is_some_and(is_integral) => {
                DroneId::Int(n.as_f64().unwrap_or_default() as i64)
            }
            Value::String(s) => DroneId::Text(s),
            other => DroneId::Other(other.to_string()),
        })
    }
}

fn is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15
}

impl From<i64> for DroneId {
    fn from(id: i64) -> Self {
        DroneId::Int(id)
    }
}

impl From<&str> for DroneId {
    fn from(id: &str) -> Self {
        DroneId::Text(id.to_string())
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroneId::Int(n) => write!(f, "{}", n),
            DroneId::Text(s) | DroneId::Other(s) => write!(f, "{}", s),
        }
    }
}

// =============================================================================
// COORDINATES
// =============================================================================

/// A coordinate tuple as it appears in the log.
///
/// Entries that are `null` or non-numeric are kept as `None` so that a
/// single bad component does not reject the whole log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Coords(pub Vec<Option<f64>>);

impl Coords {
    /// Returns the point if the first three components are finite numbers.
    pub fn point(&self) -> Option<Point3> {
        match self.0.as_slice() {
            [Some(x), Some(y), Some(z), ..] if x.is_finite() && y.is_finite() && z.is_finite() => {
                Some([*x, *y, *z])
            }
            _ => None,
        }
    }
}

impl From<Point3> for Coords {
    fn from(p: Point3) -> Self {
        Coords(p.iter().map(|c| Some(*c)).collect())
    }
}

impl<'de> Deserialize<'de> for Coords {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Coords(match value {
            Value::Array(items) => items.iter().map(Value::as_f64).collect(),
            _ => Vec::new(),
        }))
    }
}

// =============================================================================
// FRAMES
// =============================================================================

/// State of all drones at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Simulation time in seconds
    #[serde(default)]
    pub t: Option<f64>,

    /// Drone positions, parallel to `ids`
    #[serde(default)]
    pub pos: Vec<Coords>,

    /// Drone identities, parallel to `pos`
    #[serde(default)]
    pub ids: Vec<DroneId>,

    /// Goal positions
    #[serde(default)]
    pub goals: Vec<Coords>,
}

impl SimulationState {
    /// Simulation time, 0 when missing.
    pub fn time(&self) -> f64 {
        self.t.filter(|t| t.is_finite()).unwrap_or(0.0)
    }

    /// Number of position entries in this frame.
    pub fn drone_count(&self) -> usize {
        self.pos.len()
    }

    /// True if `ids` and `pos` have the same length.
    pub fn ids_match_positions(&self) -> bool {
        self.ids.len() == self.pos.len()
    }

    /// Iterates `(id, position)` pairs, zipping ids with positions.
    ///
    /// Surplus ids or positions are ignored; entries with an unusable
    /// position are skipped.
    pub fn drones(&self) -> impl Iterator<Item = (&DroneId, Point3)> + '_ {
        self.ids
            .iter()
            .zip(self.pos.iter())
            .filter_map(|(id, coords)| coords.point().map(|p| (id, p)))
    }

    /// Map from drone id to position, for pairing consecutive frames.
    pub fn positions_by_id(&self) -> HashMap<&DroneId, Point3> {
        self.drones().collect()
    }
}

/// One discrete timestep of a simulation log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationFrame {
    #[serde(default)]
    pub state: SimulationState,

    /// Per-frame diagnostics; not used by the viewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Map<String, Value>>,
}

impl From<SimulationState> for SimulationFrame {
    fn from(state: SimulationState) -> Self {
        Self { state, info: None }
    }
}

/// A complete simulation log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    pub frames: Vec<SimulationFrame>,
}

impl SimulationLog {
    /// Creates a log from frames without metadata.
    pub fn new(frames: Vec<SimulationFrame>) -> Self {
        Self {
            metadata: None,
            frames,
        }
    }

    /// Attaches metadata.
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the last frame (0 for an empty log).
    pub fn max_frame(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Returns true if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// State at `index`, if that frame exists.
    pub fn state(&self, index: usize) -> Option<&SimulationState> {
        self.frames.get(index).map(|f| &f.state)
    }

    /// Obstacles declared in the metadata.
    pub fn obstacles(&self) -> Vec<Obstacle> {
        extract_obstacles(self.metadata.as_ref())
    }

    /// Goal sphere radius from `config.simulation.goal_threshold`.
    pub fn goal_threshold(&self, default: f64) -> f64 {
        metadata::goal_threshold(self.metadata.as_ref(), default)
    }

    /// Drone sphere radius from `config.simulation.drone_radius`.
    pub fn drone_radius(&self, default: f64) -> f64 {
        metadata::drone_radius(self.metadata.as_ref(), default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_ids_and_nulls() {
        let log: SimulationLog = serde_json::from_value(json!({
            "frames": [
                {"state": {"t": 0.5, "pos": [[0, 0, 1], [1, null, 1]], "ids": [3, "b"], "goals": [[5, 5, 5]]}}
            ]
        }))
        .unwrap();

        let state = log.state(0).unwrap();
        assert_eq!(state.ids, vec![DroneId::Int(3), DroneId::Text("b".into())]);
        assert_eq!(state.pos[0].point(), Some([0.0, 0.0, 1.0]));
        assert_eq!(state.pos[1].point(), None);
        assert_eq!(state.time(), 0.5);
        assert_eq!(state.drones().count(), 1);
    }

    #[test]
    fn test_integral_float_ids_match_integers() {
        let ids: Vec<DroneId> = serde_json::from_value(json!([1.0, 2, 2.5, true])).unwrap();

        assert_eq!(ids[0], DroneId::Int(1));
        assert_eq!(ids[0].to_string(), "1");
        assert_eq!(ids[1], DroneId::Int(2));
        assert_eq!(ids[2], DroneId::Other("2.5".into()));
        assert_eq!(ids[3].to_string(), "true");
    }

    #[test]
    fn test_missing_state_fields_default() {
        let log: SimulationLog = serde_json::from_value(json!({
            "frames": [{"state": {}}, {}]
        }))
        .unwrap();

        assert_eq!(log.frame_count(), 2);
        assert_eq!(log.max_frame(), 1);
        assert_eq!(log.state(1).unwrap().time(), 0.0);
        assert!(log.state(2).is_none());
    }

    #[test]
    fn test_float_id_kept_distinct() {
        let id: DroneId = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(id, DroneId::Other("1.5".into()));
        assert_ne!(DroneId::Int(1), DroneId::Text("1".into()));
        assert_eq!(DroneId::Int(7).to_string(), "7");
    }

    #[test]
    fn test_drones_ignores_surplus_entries() {
        let state = SimulationState {
            t: Some(0.0),
            pos: vec![Coords::from([0.0; 3]), Coords::from([1.0; 3]), Coords::from([2.0; 3])],
            ids: vec![DroneId::Int(1), DroneId::Int(2)],
            goals: vec![],
        };

        assert!(!state.ids_match_positions());
        let ids: Vec<String> = state.drones().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
