//! Obstacle descriptors and their box geometry.
//!
//! Obstacles arrive as loosely typed metadata records. Each record is
//! classified once into an [`ObstacleKind`]; records that cannot be drawn
//! (unknown type, missing dimensions, bad position) are kept as fallback
//! variants so that the bounds calculator can still account for them.

use serde_json::{Map, Value};

use crate::flight_log::{Coords, Point3};
use crate::metadata::{number_field, obstacle_records};
use crate::primitives::{box_mesh, Color, MeshRole, Primitive};

/// A classified obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: Option<String>,
    /// Center of the obstacle; `None` if fewer than 3 numeric components
    pub position: Option<Point3>,
    pub kind: ObstacleKind,
}

/// Recognized obstacle shapes plus fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleKind {
    /// Box of `length` (x) x `thickness` (y) x `height` (z)
    Wall { length: f64, thickness: f64, height: f64 },
    /// Box of `width` (x) x `thickness` (y) x `height` (z)
    Gate { width: f64, thickness: f64, height: f64 },
    /// Box of `length` (x) x `width` (y) x `height` (z)
    Clutter { length: f64, width: f64, height: f64 },
    /// Recognized type with a required dimension missing
    Incomplete { type_name: String },
    /// Non-empty type that is not recognized
    Unrecognized { type_name: String },
    /// No usable `type` field
    Untyped,
}

impl Obstacle {
    /// Classifies a raw metadata record.
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let record = value.as_object().unwrap_or(&empty);

        let id = record.get("id").and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        let position = record
            .get("position")
            .and_then(|v| serde_json::from_value::<Coords>(v.clone()).ok())
            .and_then(|c| c.point());
        let type_name = record.get("type").and_then(Value::as_str).unwrap_or("");

        Self {
            id,
            position,
            kind: ObstacleKind::classify(type_name, record),
        }
    }

    /// Full box extents `(dx, dy, dz)` for drawable kinds.
    pub fn extents(&self) -> Option<Point3> {
        match self.kind {
            ObstacleKind::Wall { length, thickness, height } => Some([length, thickness, height]),
            ObstacleKind::Gate { width, thickness, height } => Some([width, thickness, height]),
            ObstacleKind::Clutter { length, width, height } => Some([length, width, height]),
            _ => None,
        }
    }

    /// Region the obstacle occupies as `(center, extents)`.
    ///
    /// Non-drawable obstacles with a position occupy a degenerate box at
    /// that position.
    pub fn footprint(&self) -> Option<(Point3, Point3)> {
        let center = self.position?;
        Some((center, self.extents().unwrap_or([0.0; 3])))
    }

    /// Display name used for the mesh.
    pub fn label(&self) -> &'static str {
        match self.kind {
            ObstacleKind::Wall { .. } => "Wall",
            ObstacleKind::Gate { .. } => "Gate",
            ObstacleKind::Clutter { .. } => "Clutter",
            _ => "Obstacle",
        }
    }
}

impl ObstacleKind {
    fn classify(type_name: &str, record: &Map<String, Value>) -> Self {
        let dim = |key: &str| number_field(record, &[key]);
        let normalized = type_name.to_lowercase();

        let kind = match normalized.as_str() {
            "" => return ObstacleKind::Untyped,
            "wall" => match (dim("length"), dim("thickness"), dim("height")) {
                (Some(length), Some(thickness), Some(height)) => Some(ObstacleKind::Wall { length, thickness, height }),
                _ => None,
            },
            "gate" => match (dim("width"), dim("thickness"), dim("height")) {
                (Some(width), Some(thickness), Some(height)) => Some(ObstacleKind::Gate { width, thickness, height }),
                _ => None,
            },
            "clutter" | "rectangularprism" | "rectangular_prism" => {
                match (dim("length"), dim("width"), dim("height")) {
                    (Some(length), Some(width), Some(height)) => {
                        Some(ObstacleKind::Clutter { length, width, height })
                    }
                    _ => None,
                }
            }
            _ => {
                return ObstacleKind::Unrecognized {
                    type_name: type_name.to_string(),
                }
            }
        };

        kind.unwrap_or(ObstacleKind::Incomplete { type_name: normalized })
    }
}

/// Classifies every obstacle record in the log metadata.
pub fn extract_obstacles(metadata: Option<&Map<String, Value>>) -> Vec<Obstacle> {
    obstacle_records(metadata).iter().map(Obstacle::from_value).collect()
}

/// Box geometry for one obstacle, without logging.
pub fn obstacle_geometry(obstacle: &Obstacle) -> Vec<Primitive> {
    let (Some(center), Some(extents)) = (obstacle.position, obstacle.extents()) else {
        return Vec::new();
    };
    vec![Primitive::Mesh(box_mesh(
        center,
        extents,
        MeshRole::Obstacle,
        obstacle.label(),
        Color::OBSTACLE,
    ))]
}

/// Logs a warning if the obstacle has a position but an unknown type.
fn warn_if_unrecognized(obstacle: &Obstacle) -> bool {
    let ObstacleKind::Unrecognized { type_name } = &obstacle.kind else {
        return false;
    };
    if obstacle.position.is_none() {
        return false;
    }
    let id = obstacle.id.as_deref().unwrap_or("unknown");
    tracing::warn!(
        obstacle_type = %type_name,
        id,
        "Unknown obstacle type '{}' (id: {}), skipping visualization",
        type_name,
        id
    );
    true
}

/// Box geometry for one obstacle.
///
/// Unrecognized types produce no geometry and a warning. Missing
/// dimensions or position produce no geometry silently.
pub fn build_obstacle_geometry(obstacle: &Obstacle) -> Vec<Primitive> {
    warn_if_unrecognized(obstacle);
    obstacle_geometry(obstacle)
}

/// Warns once for every unrecognized obstacle. Returns how many were skipped.
pub fn report_unrecognized(obstacles: &[Obstacle]) -> usize {
    obstacles.iter().filter(|o| warn_if_unrecognized(o)).count()
}
