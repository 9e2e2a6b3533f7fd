//! Camera parameters.
//!
//! Only the parameters live here; ray generation is part of the renderer.

use glam::{UVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Pinhole / thin-lens camera description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    /// Image resolution in pixels
    pub resolution: UVec2,
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fovy: f32,
    /// Distance from the lens to the plane of perfect focus
    pub focal_distance: f32,
    /// Thin-lens aperture radius; 0 disables depth of field
    pub lens_radius: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            resolution: UVec2::new(800, 800),
            position: Vec3::new(0.0, 0.0, 5.0),
            look_at: Vec3::ZERO,
            up: Vec3::Y,
            fovy: 45.0,
            focal_distance: 5.0,
            lens_radius: 0.0,
        }
    }
}

impl CameraParams {
    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = UVec2::new(width, height);
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, position: Vec3, look_at: Vec3, up: Vec3) -> Self {
        self.position = position;
        self.look_at = look_at;
        self.up = up;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, fovy: f32, lens_radius: f32, focal_distance: f32) -> Self {
        self.fovy = fovy;
        self.lens_radius = lens_radius;
        self.focal_distance = focal_distance;
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.resolution.x as f32 / self.resolution.y.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let cam = CameraParams::default()
            .with_resolution(640, 480)
            .with_lens(60.0, 0.1, 3.0);

        assert_eq!(cam.pixel_count(), 640 * 480);
        assert!((cam.aspect_ratio() - 4.0 / 3.0).abs() < 1e-6);
        assert_eq!(cam.lens_radius, 0.1);
    }
}
