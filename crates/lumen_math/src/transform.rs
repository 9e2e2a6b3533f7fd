// Object placement for ray tracing.
//
// A `Transform` caches the object-to-world matrix together with its inverse
// and inverse transpose. The three are only ever rebuilt together from a
// `Placement`, so they cannot drift apart.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::Aabb;

/// Translation, XYZ Euler rotation in degrees, and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Placement {
    pub fn new(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Build the object-to-world matrix: `T * Rx * Ry * Rz * S`.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_scale(self.scale)
    }
}

/// Object-to-world transform with cached inverse and inverse transpose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Placement", into = "Placement")]
pub struct Transform {
    placement: Placement,
    matrix: Mat4,
    inverse: Mat4,
    inv_transpose: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_placement(Placement::default())
    }
}

impl From<Placement> for Transform {
    fn from(placement: Placement) -> Self {
        Self::from_placement(placement)
    }
}

impl From<Transform> for Placement {
    fn from(transform: Transform) -> Self {
        transform.placement
    }
}

impl Transform {
    pub fn from_placement(placement: Placement) -> Self {
        let matrix = placement.matrix();
        let inverse = matrix.inverse();
        Self {
            placement,
            matrix,
            inverse,
            inv_transpose: inverse.transpose(),
        }
    }

    /// Shorthand for a translated and scaled, unrotated object.
    pub fn from_translation_scale(translation: Vec3, scale: Vec3) -> Self {
        Self::from_placement(Placement::new(translation, Vec3::ZERO, scale))
    }

    /// Replace the placement and recompute all cached matrices.
    pub fn set_placement(&mut self, placement: Placement) {
        *self = Self::from_placement(placement);
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.set_placement(Placement {
            translation,
            ..self.placement
        });
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.set_placement(Placement {
            rotation,
            ..self.placement
        });
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.set_placement(Placement {
            scale,
            ..self.placement
        });
    }

    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    #[inline]
    pub fn inverse(&self) -> Mat4 {
        self.inverse
    }

    #[inline]
    pub fn inv_transpose(&self) -> Mat4 {
        self.inv_transpose
    }

    #[inline]
    pub fn point_to_world(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    #[inline]
    pub fn point_to_local(&self, p: Vec3) -> Vec3 {
        self.inverse.transform_point3(p)
    }

    /// Directions ignore translation (w = 0).
    #[inline]
    pub fn vector_to_local(&self, v: Vec3) -> Vec3 {
        self.inverse.transform_vector3(v)
    }

    /// Normals go through the inverse transpose so they stay perpendicular
    /// to the surface under non-uniform scale.
    #[inline]
    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        self.inv_transpose.transform_vector3(n).normalize_or_zero()
    }

    /// Ratio of world to local surface area at a point with local unit normal
    /// `local_normal` (Nanson's formula: `|det M| * |M^-T n|`).
    pub fn area_scale(&self, local_normal: Vec3) -> f32 {
        self.matrix.determinant().abs() * self.inv_transpose.transform_vector3(local_normal).length()
    }

    /// Bounding box of the 8 transformed corners of a local-space box.
    pub fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        let min = aabb.min_point();
        let max = aabb.max_point();

        let mut result = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            result.grow(self.point_to_world(corner));
        }

        Aabb::from_points(result.min_point(), result.max_point())
    }
}
