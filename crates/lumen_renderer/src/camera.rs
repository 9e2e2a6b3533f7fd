//! Camera ray generation.

use lumen_core::CameraParams;
use lumen_math::{Ray, Vec3};
use rand::Rng;

use crate::sampling::{random_in_unit_disk, sample_square};

/// Camera with its viewport precomputed from `CameraParams`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
}

impl Camera {
    pub fn new(params: &CameraParams) -> Self {
        let image_width = params.resolution.x.max(1);
        let image_height = params.resolution.y.max(1);
        let focus_dist = if params.focal_distance > 0.0 {
            params.focal_distance
        } else {
            (params.look_at - params.position).length().max(1e-3)
        };

        // Viewport on the plane of perfect focus
        let theta = params.fovy.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * focus_dist;
        let viewport_width = viewport_height * (image_width as f32 / image_height as f32);

        // Camera basis
        let w = (params.position - params.look_at).normalize_or_zero();
        let u = params.up.cross(w).normalize_or_zero();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        let pixel_delta_u = viewport_u / image_width as f32;
        let pixel_delta_v = viewport_v / image_height as f32;

        let viewport_upper_left = params.position - focus_dist * w - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00_loc = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        Self {
            image_width,
            image_height,
            center: params.position,
            pixel00_loc,
            pixel_delta_u,
            pixel_delta_v,
            u,
            v,
            lens_radius: params.lens_radius.max(0.0),
        }
    }

    /// Ray through pixel `index` (row-major, row 0 at the top), jittered
    /// within the pixel and over the lens.
    pub fn generate_ray<R: Rng + ?Sized>(&self, index: u32, rng: &mut R) -> Ray {
        let i = index % self.image_width;
        let j = index / self.image_width;
        let offset = sample_square(rng);

        let pixel_sample = self.pixel00_loc
            + (i as f32 + offset.x) * self.pixel_delta_u
            + (j as f32 + offset.y) * self.pixel_delta_v;

        let origin = if self.lens_radius <= 0.0 {
            self.center
        } else {
            let p = random_in_unit_disk(rng) * self.lens_radius;
            self.center + p.x * self.u + p.y * self.v
        };

        Ray::new(origin, pixel_sample - origin)
    }

    pub fn pixel_count(&self) -> usize {
        self.image_width as usize * self.image_height as usize
    }
}
