//! Mesh geometry and the world-space triangles baked from it.
//!
//! A `Mesh` is the loader-facing representation (indexed vertex arrays).
//! The renderer never sees it directly: each mesh instance is baked into a
//! flat list of world-space [`Triangle`]s that the BVH is built over.

use glam::{Vec2, Vec3};
use lumen_math::{Aabb, Transform};
use serde::{Deserialize, Serialize};

/// A world-space triangle with precomputed plane data.
///
/// Immutable after baking. `double_area` is zero for degenerate triangles,
/// which the intersection code rejects outright.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    // positions
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
    // shading normals
    pub n0: Vec3,
    pub n1: Vec3,
    pub n2: Vec3,
    // texture coordinates (carried through, unused by the integrator)
    pub uv0: Vec2,
    pub uv1: Vec2,
    pub uv2: Vec2,
    /// Unit geometric normal, `(p1 - p0) x (p2 - p0)` normalized (CCW front)
    pub plane_normal: Vec3,
    /// Twice the triangle's area
    pub double_area: f32,
    pub material_id: usize,
}

impl Triangle {
    /// Create a triangle from three vertices.
    ///
    /// Without shading normals the face normal is used at every corner.
    pub fn new(positions: [Vec3; 3], normals: Option<[Vec3; 3]>, material_id: usize) -> Self {
        let [p0, p1, p2] = positions;
        let cross = (p1 - p0).cross(p2 - p0);
        let plane_normal = cross.normalize_or_zero();
        let [n0, n1, n2] = normals.unwrap_or([plane_normal; 3]);

        Self {
            p0,
            p1,
            p2,
            n0,
            n1,
            n2,
            uv0: Vec2::ZERO,
            uv1: Vec2::ZERO,
            uv2: Vec2::ZERO,
            plane_normal,
            double_area: cross.length(),
            material_id,
        }
    }

    /// Builder method to attach UVs.
    pub fn with_uvs(mut self, uvs: [Vec2; 3]) -> Self {
        [self.uv0, self.uv1, self.uv2] = uvs;
        self
    }

    pub fn area(&self) -> f32 {
        0.5 * self.double_area
    }

    /// True when the vertices are collinear or coincident.
    ///
    /// Measured against the edge lengths, so tiny but well-formed
    /// triangles still count as surfaces.
    pub fn is_degenerate(&self) -> bool {
        let scale = (self.p1 - self.p0).length() * (self.p2 - self.p0).length();
        !(self.double_area > 1e-7 * scale) || self.plane_normal == Vec3::ZERO
    }

    /// Padded bounding box (flat triangles still get volume).
    pub fn bounds(&self) -> Aabb {
        let min = self.p0.min(self.p1).min(self.p2);
        let max = self.p0.max(self.p1).max(self.p2);
        Aabb::from_points(min, max)
    }

    pub fn centroid(&self) -> Vec3 {
        (self.p0 + self.p1 + self.p2) / 3.0
    }
}

/// A mesh consisting of vertex positions, optional normals/UVs, and
/// triangle indices (every 3 indices form a CCW triangle).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - face normals are used when absent)
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one per vertex)
    #[serde(default)]
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self {
            positions,
            normals,
            uvs: None,
            indices,
        }
    }

    /// Compute smooth vertex normals by averaging (area-weighted) face normals.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Bake the mesh into world-space triangles.
    ///
    /// Positions go through the transform, normals through its inverse
    /// transpose. Faces with out-of-range indices are skipped with a warning,
    /// as are per-vertex arrays whose length does not match the positions.
    pub fn to_triangles(&self, transform: &Transform, material_id: usize) -> Vec<Triangle> {
        let vertex_count = self.positions.len();
        let normals = self.normals.as_ref().filter(|n| n.len() == vertex_count);
        let uvs = self.uvs.as_ref().filter(|uv| uv.len() == vertex_count);

        if self.normals.is_some() && normals.is_none() {
            log::debug!(
                "Normals array length doesn't match vertex count ({}), using face normals",
                vertex_count
            );
        }

        let mut triangles = Vec::with_capacity(self.triangle_count());
        for face in self.indices.chunks_exact(3) {
            let idx = [face[0] as usize, face[1] as usize, face[2] as usize];
            if idx.iter().any(|&i| i >= vertex_count) {
                log::warn!(
                    "Invalid triangle indices: {:?}, vertex count: {}",
                    idx,
                    vertex_count
                );
                continue;
            }

            let positions = idx.map(|i| transform.point_to_world(self.positions[i]));
            let shading = normals.map(|n| idx.map(|i| transform.normal_to_world(n[i])));
            let mut tri = Triangle::new(positions, shading, material_id);
            if let Some(uv) = uvs {
                tri = tri.with_uvs(idx.map(|i| uv[i]));
            }
            triangles.push(tri);
        }

        triangles
    }
}
