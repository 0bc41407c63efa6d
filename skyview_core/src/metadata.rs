//! Accessors for the free-form metadata attached to a simulation log.
//!
//! Metadata has no fixed schema: sections may be missing, numbers may have
//! been sanitized to `null`, and producers spell keys in both snake_case and
//! camelCase. Every lookup here tries each known alias and falls back to an
//! explicit default instead of propagating a missing or non-finite value.

use serde_json::{Map, Value};

/// Aliases for the goal radius inside `config.simulation`.
pub const GOAL_THRESHOLD_KEYS: &[&str] = &["goal_threshold", "goalThreshold"];

/// Aliases for the drone radius inside `config.simulation`.
pub const DRONE_RADIUS_KEYS: &[&str] = &["drone_radius", "droneRadius"];

/// Returns the first alias that holds a finite number.
pub fn number_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(Value::as_f64)
        .find(|v| v.is_finite())
}

/// Returns the first alias that holds a boolean.
pub fn bool_field(obj: &Map<String, Value>, aliases: &[&str]) -> Option<bool> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(Value::as_bool)
}

/// Returns the first alias that holds an object.
pub fn section<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Map<String, Value>> {
    aliases
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(Value::as_object)
}

/// Follows a path of object keys.
pub fn section_path<'a>(obj: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Map<String, Value>> {
    path.iter().try_fold(obj, |current, key| current.get(*key)?.as_object())
}

/// Returns a strictly positive finite radius-like value or `default`.
fn positive_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| *v > 0.0).unwrap_or(default)
}

/// Goal sphere radius from `config.simulation.goal_threshold`.
pub fn goal_threshold(metadata: Option<&Map<String, Value>>, default: f64) -> f64 {
    let value = metadata
        .and_then(|m| section_path(m, &["config", "simulation"]))
        .and_then(|sim| number_field(sim, GOAL_THRESHOLD_KEYS));
    positive_or(value, default)
}

/// Drone sphere radius.
///
/// Looked up in `config.simulation`, then in `environment`, then at the top
/// level of the metadata.
pub fn drone_radius(metadata: Option<&Map<String, Value>>, default: f64) -> f64 {
    let Some(meta) = metadata else {
        return default;
    };
    let value = section_path(meta, &["config", "simulation"])
        .and_then(|sim| number_field(sim, DRONE_RADIUS_KEYS))
        .or_else(|| section(meta, &["environment"]).and_then(|env| number_field(env, DRONE_RADIUS_KEYS)))
        .or_else(|| number_field(meta, DRONE_RADIUS_KEYS));
    positive_or(value, default)
}

/// Raw obstacle records, from `obstacles` or `environment.obstacles`.
pub fn obstacle_records(metadata: Option<&Map<String, Value>>) -> &[Value] {
    let Some(meta) = metadata else {
        return &[];
    };
    if let Some(direct) = meta.get("obstacles").and_then(Value::as_array) {
        return direct;
    }
    section(meta, &["environment"])
        .and_then(|env| env.get("obstacles"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
