//! Geometry instances.

use lumen_math::{Aabb, Placement, Transform, Vec3};
use serde::{Deserialize, Serialize};

/// Shape of a geometry instance, in its canonical object space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeomKind {
    /// Sphere of radius 0.5 centered at the origin.
    Sphere,
    /// Box spanning [-0.5, 0.5] on every axis.
    Cube,
    /// Unit square at z = 0 with normal +z.
    SquarePlane,
    /// A triangle mesh, baked into the scene triangle array at
    /// `first_triangle..first_triangle + triangle_count`.
    Mesh {
        mesh_id: usize,
        first_triangle: usize,
        triangle_count: usize,
    },
}

impl GeomKind {
    /// True for shapes intersected analytically (not through the BVH).
    pub fn is_analytic(&self) -> bool {
        !matches!(self, GeomKind::Mesh { .. })
    }

    /// Surface area in object space (for light sampling).
    pub fn local_area(&self) -> f32 {
        match self {
            GeomKind::Sphere => std::f32::consts::PI, // 4 * pi * 0.5^2
            GeomKind::Cube => 6.0,
            GeomKind::SquarePlane => 1.0,
            GeomKind::Mesh { .. } => 0.0,
        }
    }
}

/// A placed shape with a material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geom {
    #[serde(flatten)]
    pub kind: GeomKind,
    pub material_id: usize,
    #[serde(default)]
    pub transform: Transform,
}

impl Geom {
    pub fn new(kind: GeomKind, transform: Transform, material_id: usize) -> Self {
        Self {
            kind,
            material_id,
            transform,
        }
    }

    /// Move the instance. Matrix, inverse and inverse transpose are all
    /// recomputed.
    pub fn set_placement(&mut self, placement: Placement) {
        self.transform.set_placement(placement);
    }

    /// World-space bounds of an analytic shape (`None` for meshes, whose
    /// triangles are bounded individually).
    pub fn world_bounds(&self) -> Option<Aabb> {
        if !self.kind.is_analytic() {
            return None;
        }
        let local = match self.kind {
            GeomKind::SquarePlane => Aabb::from_points(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, 0.5, 0.0)),
            _ => Aabb::from_points(Vec3::splat(-0.5), Vec3::splat(0.5)),
        };
        Some(self.transform.transform_aabb(&local))
    }
}
