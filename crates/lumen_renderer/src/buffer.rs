//! Per-pixel radiance accumulation.

use std::sync::atomic::{AtomicUsize, Ordering};

use lumen_core::material::Color;
use rayon::prelude::*;

use crate::path::PathState;

/// Running radiance sum per pixel, owned by the caller across iterations.
///
/// Pixels hold sums; divide by `iterations()` (or call `resolve`) to get
/// the estimate. Changing the resolution clears the buffer.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    iterations: u32,
}

impl AccumulationBuffer {
    /// Create a new buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
            iterations: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Iterations gathered since the last reset.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Zero all sums.
    pub fn reset(&mut self) {
        self.pixels.fill(Color::ZERO);
        self.iterations = 0;
    }

    /// Match a resolution, clearing the buffer if it changed.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width || height != self.height {
            log::debug!(
                "Accumulation buffer resized {}x{} -> {}x{}",
                self.width,
                self.height,
                width,
                height
            );
            *self = Self::new(width, height);
        }
    }

    /// Add one iteration's finished paths, one per pixel.
    ///
    /// Paths are sorted by pixel index so each pixel slot is written by
    /// exactly one path. Non-finite radiance is dropped with a warning.
    pub fn gather(&mut self, paths: &mut [PathState]) {
        debug_assert_eq!(paths.len(), self.pixels.len());
        paths.par_sort_unstable_by_key(|p| p.pixel_index);

        let discarded = AtomicUsize::new(0);
        self.pixels
            .par_iter_mut()
            .zip(paths.par_iter())
            .for_each(|(pixel, path)| {
                if path.radiance.is_finite() {
                    *pixel += path.radiance;
                } else {
                    discarded.fetch_add(1, Ordering::Relaxed);
                }
            });

        let discarded = discarded.into_inner();
        if discarded > 0 {
            log::warn!("Discarded {} non-finite path samples", discarded);
        }
        self.iterations += 1;
    }

    /// Averaged radiance per pixel.
    pub fn resolve(&self) -> Vec<Color> {
        let scale = 1.0 / self.iterations.max(1) as f32;
        self.pixels.iter().map(|&c| c * scale).collect()
    }

    /// Averaged image as 8-bit RGBA rows, gamma 2.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.resolve().into_iter().flat_map(color_to_rgba).collect()
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let to_byte = |x: f32| (255.0 * linear_to_gamma(x).clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::{Ray, Vec3};

    fn finished(pixel_index: u32, radiance: Color) -> PathState {
        let mut path = PathState::new(Ray::new(Vec3::ZERO, Vec3::Z), pixel_index, 1);
        path.radiance = radiance;
        path.terminate();
        path
    }

    #[test]
    fn test_gather_orders_by_pixel() {
        let mut buffer = AccumulationBuffer::new(3, 1);
        let mut paths = vec![
            finished(2, Color::splat(3.0)),
            finished(0, Color::splat(1.0)),
            finished(1, Color::splat(2.0)),
        ];

        buffer.gather(&mut paths);
        buffer.gather(&mut paths);

        assert_eq!(buffer.iterations(), 2);
        assert_eq!(buffer.pixels(), &[Color::splat(2.0), Color::splat(4.0), Color::splat(6.0)]);
        assert_eq!(buffer.resolve()[2], Color::splat(3.0));
    }

    #[test]
    fn test_gather_drops_non_finite() {
        let mut buffer = AccumulationBuffer::new(2, 1);
        let mut paths = vec![finished(0, Color::new(f32::NAN, 0.0, 0.0)), finished(1, Color::ONE)];

        buffer.gather(&mut paths);
        assert_eq!(buffer.pixels()[0], Color::ZERO);
        assert_eq!(buffer.pixels()[1], Color::ONE);
    }

    #[test]
    fn test_resize_resets() {
        let mut buffer = AccumulationBuffer::new(1, 1);
        buffer.gather(&mut [finished(0, Color::ONE)]);

        buffer.resize(1, 1);
        assert_eq!(buffer.iterations(), 1);

        buffer.resize(2, 2);
        assert_eq!(buffer.iterations(), 0);
        assert_eq!(buffer.pixels().len(), 4);
        assert!(buffer.pixels().iter().all(|&c| c == Color::ZERO));
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::splat(4.0)), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::splat(0.25))[0], 127);

        let mut buffer = AccumulationBuffer::new(2, 1);
        buffer.gather(&mut [finished(0, Color::ONE), finished(1, Color::ZERO)]);
        assert_eq!(buffer.to_rgba8(), vec![255, 255, 255, 255, 0, 0, 0, 255]);
    }
}
