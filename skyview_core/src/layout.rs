//! Scene layout and render configuration handed to the renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bounds::SceneBounds;
use crate::camera::CameraState;

/// Grid color shared by all three axes.
pub const GRID_COLOR: &str = "lightgray";

/// Token that tells the renderer to keep user interaction state across updates.
pub const UI_REVISION: &str = "keep";

/// One scene axis with a fixed range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLayout {
    pub title: String,
    pub range: [f64; 2],
    pub autorange: bool,
    #[serde(rename = "gridcolor")]
    pub grid_color: String,
}

impl AxisLayout {
    pub fn fixed(title: &str, range: [f64; 2]) -> Self {
        Self {
            title: title.to_string(),
            range,
            autorange: false,
            grid_color: GRID_COLOR.to_string(),
        }
    }
}

/// The 3D scene part of the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLayout {
    #[serde(rename = "xaxis")]
    pub x_axis: AxisLayout,
    #[serde(rename = "yaxis")]
    pub y_axis: AxisLayout,
    #[serde(rename = "zaxis")]
    pub z_axis: AxisLayout,
    /// Aspect follows the data ranges
    #[serde(rename = "aspectmode")]
    pub aspect_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<Value>,
}

/// Full layout for a create or update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub scene: SceneLayout,
    #[serde(rename = "uirevision")]
    pub ui_revision: String,
    pub margin: [u32; 4],
}

impl Layout {
    /// Builds a layout with fixed ranges from `bounds` and the last camera, if any.
    pub fn for_scene(bounds: &SceneBounds, camera: &CameraState) -> Self {
        Self {
            scene: SceneLayout {
                x_axis: AxisLayout::fixed("X", bounds.x),
                y_axis: AxisLayout::fixed("Y", bounds.y),
                z_axis: AxisLayout::fixed("Z", bounds.z),
                aspect_mode: "data".to_string(),
                camera: camera.to_value(),
            },
            ui_revision: UI_REVISION.to_string(),
            margin: [0; 4],
        }
    }

    /// Axis ranges as bounds.
    pub fn bounds(&self) -> SceneBounds {
        SceneBounds {
            x: self.scene.x_axis.range,
            y: self.scene.y_axis.range,
            z: self.scene.z_axis.range,
        }
    }
}

/// Renderer options that do not depend on the scene content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub responsive: bool,
    #[serde(rename = "displaylogo")]
    pub display_logo: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            responsive: true,
            display_logo: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layout_fixed_ranges_and_camera() {
        let mut camera = CameraState::new();
        let layout = Layout::for_scene(&SceneBounds::UNIT, &camera);

        assert!(!layout.scene.x_axis.autorange);
        assert_eq!(layout.scene.z_axis.title, "Z");
        assert_eq!(layout.bounds(), SceneBounds::UNIT);
        assert!(layout.scene.camera.is_none());

        camera.merge_fields(json!({"scene.camera.eye.x": 2}).as_object().unwrap());
        let layout = Layout::for_scene(&SceneBounds::UNIT, &camera);
        assert_eq!(layout.scene.camera, Some(json!({"eye": {"x": 2}})));
    }

    #[test]
    fn test_serialized_names() {
        let value = serde_json::to_value(Layout::for_scene(&SceneBounds::UNIT, &CameraState::new())).unwrap();

        assert_eq!(value["uirevision"], "keep");
        assert_eq!(value["scene"]["aspectmode"], "data");
        assert_eq!(value["scene"]["xaxis"]["gridcolor"], "lightgray");
        assert!(value["scene"].get("camera").is_none());

        let config = serde_json::to_value(RenderConfig::default()).unwrap();
        assert_eq!(config, json!({"responsive": true, "displaylogo": false}));
    }
}
