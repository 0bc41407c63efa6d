//! Renderable geometric primitives.
//!
//! The trace builder emits a flat list of [`Primitive`]s; renderers turn
//! them into whatever their backend draws. Meshes are indexed triangle
//! lists, trails are single line segments.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::flight_log::{DroneId, Point3};

/// Latitude bands of a sphere mesh (poles included).
pub const SPHERE_LAT_BANDS: usize = 12;

/// Longitude segments of a sphere mesh.
pub const SPHERE_LON_SEGMENTS: usize = 24;

/// Triangles of an axis-aligned box over its 8 corners.
///
/// Corners are numbered bottom face first, counter-clockwise from
/// `(-x, -y)`, then the top face in the same order.
const BOX_TRIANGLES: [[u32; 3]; 12] = [
    [0, 1, 2],
    [0, 2, 3],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [2, 3, 7],
    [2, 7, 6],
    [0, 3, 7],
    [0, 7, 4],
    [1, 2, 6],
    [1, 6, 5],
];

/// RGB color plus opacity in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub rgb: [u8; 3],
    pub opacity: f32,
}

impl Color {
    pub const OBSTACLE: Color = Color::new([255, 0, 0], 0.15);
    pub const GOAL: Color = Color::new([0, 128, 0], 0.2);
    pub const DRONE: Color = Color::new([255, 165, 0], 1.0);
    pub const TRAIL: Color = Color::new([0, 0, 255], 1.0);

    pub const fn new(rgb: [u8; 3], opacity: f32) -> Self {
        Self { rgb, opacity }
    }

    /// RGBA bytes with opacity scaled to 0..=255.
    pub fn to_rgba(self) -> [u8; 4] {
        let alpha = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        [self.rgb[0], self.rgb[1], self.rgb[2], alpha]
    }
}

/// What a mesh represents in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshRole {
    Obstacle,
    Goal,
    Drone,
}

/// An indexed triangle mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub role: MeshRole,
    /// Hover label
    pub name: String,
    /// Legend entry, `None` when the mesh is kept out of the legend
    pub legend: Option<String>,
    pub vertices: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
    pub color: Color,
}

impl Mesh {
    /// Axis-aligned bounding box of the vertices, `None` for an empty mesh.
    pub fn aabb(&self) -> Option<(Point3, Point3)> {
        let mut iter = self.vertices.iter();
        let first = Vector3::from(*iter.next()?);
        let (min, max) = iter.fold((first, first), |(lo, hi), v| {
            let v = Vector3::from(*v);
            (lo.inf(&v), hi.sup(&v))
        });
        Some((min.into(), max.into()))
    }
}

/// One line segment of a drone's motion trail, from step `step - 1` to `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub drone: DroneId,
    pub step: usize,
    pub from: Point3,
    pub to: Point3,
    pub color: Color,
    pub width: f32,
}

/// A renderable primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Mesh(Mesh),
    Trail(TrailSegment),
}

impl Primitive {
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Primitive::Mesh(mesh) => Some(mesh),
            Primitive::Trail(_) => None,
        }
    }

    pub fn as_trail(&self) -> Option<&TrailSegment> {
        match self {
            Primitive::Trail(seg) => Some(seg),
            Primitive::Mesh(_) => None,
        }
    }

    /// Role of a mesh primitive, `None` for trail segments.
    pub fn role(&self) -> Option<MeshRole> {
        self.as_mesh().map(|m| m.role)
    }
}

/// Builds an axis-aligned box around `center` with full `extents`.
pub fn box_mesh(center: Point3, extents: Point3, role: MeshRole, name: &str, color: Color) -> Mesh {
    let c = Vector3::from(center);
    let half = Vector3::from(extents) / 2.0;

    let corners = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];
    let vertices = corners
        .iter()
        .map(|sign| Point3::from(c + Vector3::from(*sign).component_mul(&half)))
        .collect();

    Mesh {
        role,
        name: name.to_string(),
        legend: None,
        vertices,
        triangles: BOX_TRIANGLES.to_vec(),
        color,
    }
}

/// Builds a UV sphere of [`SPHERE_LAT_BANDS`] x [`SPHERE_LON_SEGMENTS`] vertices.
pub fn sphere_mesh(center: Point3, radius: f64, role: MeshRole, name: &str, color: Color) -> Mesh {
    let c = Vector3::from(center);
    let mut vertices = Vec::with_capacity(SPHERE_LAT_BANDS * SPHERE_LON_SEGMENTS);

    for t in 0..SPHERE_LAT_BANDS {
        let theta = PI * t as f64 / (SPHERE_LAT_BANDS - 1) as f64;
        for p in 0..SPHERE_LON_SEGMENTS {
            let phi = 2.0 * PI * p as f64 / SPHERE_LON_SEGMENTS as f64;
            let dir = Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            vertices.push(Point3::from(c + dir * radius));
        }
    }

    let lon = SPHERE_LON_SEGMENTS as u32;
    let mut triangles = Vec::with_capacity(2 * (SPHERE_LAT_BANDS - 1) * SPHERE_LON_SEGMENTS);
    for t in 0..(SPHERE_LAT_BANDS as u32 - 1) {
        for p in 0..lon {
            let next = (p + 1) % lon;
            let v00 = t * lon + p;
            let v01 = t * lon + next;
            let v10 = (t + 1) * lon + p;
            let v11 = (t + 1) * lon + next;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    Mesh {
        role,
        name: name.to_string(),
        legend: None,
        vertices,
        triangles,
        color,
    }
}
