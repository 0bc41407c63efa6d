//! Camera state captured from renderer interaction events.
//!
//! Renderers report camera changes as flat key paths (`scene.camera.eye.x`),
//! partial objects (`scene.camera.eye`), or the whole camera
//! (`scene.camera`). All forms are merged into one nested map; nested
//! objects are merged key by key, never replaced wholesale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SCENE_KEY: &str = "scene";
const CAMERA_KEY: &str = "camera";
const CAMERA_PATH: &str = "scene.camera";

/// Last known camera (eye, center, up, projection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraState(Map<String, Value>);

impl CameraState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Field at a dotted path relative to the camera, e.g. `eye.x`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.0.get(parts.next()?)?;
        parts.try_fold(first, |current, key| current.get(key))
    }

    /// The camera as a JSON object, `None` when nothing has been observed.
    pub fn to_value(&self) -> Option<Value> {
        (!self.is_empty()).then(|| Value::Object(self.0.clone()))
    }

    /// Merges every camera field found in an event payload.
    ///
    /// Keys that do not address the camera are ignored. Returns true if any
    /// camera field was merged.
    pub fn merge_fields(&mut self, fields: &Map<String, Value>) -> bool {
        let mut merged = false;
        for (key, value) in fields {
            if key == SCENE_KEY {
                if let Some(camera) = value.get(CAMERA_KEY).and_then(Value::as_object) {
                    deep_merge(&mut self.0, camera);
                    merged = true;
                }
            } else if key == CAMERA_PATH {
                if let Some(camera) = value.as_object() {
                    deep_merge(&mut self.0, camera);
                    merged = true;
                }
            } else if let Some(path) = key.strip_prefix("scene.camera.") {
                if !path.is_empty() {
                    self.set_path(path, value.clone());
                    merged = true;
                }
            }
        }
        merged
    }

    /// Sets a value at a dotted path, merging objects and creating
    /// intermediate objects as needed.
    fn set_path(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut target = &mut self.0;
        for segment in segments {
            let entry = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            target = next;
        }

        match (target.get_mut(leaf), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => deep_merge(existing, &incoming),
            (_, value) => {
                target.insert(leaf.to_string(), value);
            }
        }
    }
}

/// Recursively merges `incoming` into `target`.
fn deep_merge(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
