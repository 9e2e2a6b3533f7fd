//! Per-path state carried between bounces.

use lumen_core::material::Color;
use lumen_math::{Ray, Vec3};

use crate::intersect::MAX_INTERSECT_DIST;

/// One in-flight camera path.
///
/// A path is alive while `remaining_bounces > 0`. Terminating a path sets
/// it to zero; accumulated `radiance` stays valid for the final gather.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathState {
    pub ray: Ray,
    /// Radiance gathered so far along the path
    pub radiance: Color,
    /// Product of scattering weights since the camera
    pub throughput: Color,
    pub pixel_index: u32,
    pub remaining_bounces: u32,
    /// Bounces already taken
    pub depth: u32,
    /// Previous bounce sampled a delta lobe (mirror, refraction)
    pub prev_specular: bool,
    /// Solid-angle pdf of the previous BSDF sample, for MIS on emitter hits
    pub prev_bsdf_pdf: f32,
}

impl PathState {
    pub fn new(ray: Ray, pixel_index: u32, max_depth: u32) -> Self {
        Self {
            ray,
            radiance: Color::ZERO,
            throughput: Color::ONE,
            pixel_index,
            remaining_bounces: max_depth,
            depth: 0,
            prev_specular: false,
            prev_bsdf_pdf: 0.0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.remaining_bounces > 0
    }

    #[inline]
    pub fn terminate(&mut self) {
        self.remaining_bounces = 0;
    }

    /// Consume one bounce and continue along `ray`.
    #[inline]
    pub fn advance(&mut self, ray: Ray) {
        self.ray = ray;
        self.depth += 1;
        self.remaining_bounces = self.remaining_bounces.saturating_sub(1);
    }
}

/// What a path's ray hit this bounce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeableIntersection {
    /// Hit distance; `MAX_INTERSECT_DIST` when nothing was hit
    pub t: f32,
    pub surface_normal: Vec3,
    pub material_id: usize,
    /// Analytic geometry that was hit; `None` for triangles and misses
    pub geom_id: Option<usize>,
}

impl ShadeableIntersection {
    pub const MISS: ShadeableIntersection = ShadeableIntersection {
        t: MAX_INTERSECT_DIST,
        surface_normal: Vec3::ZERO,
        material_id: usize::MAX,
        geom_id: None,
    };

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.t < MAX_INTERSECT_DIST
    }
}
