//! Random sampling helpers shared by the camera, BSDFs and light sampling.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>()
}

/// Random offset in the unit square [-0.5, 0.5]^2 (pixel jitter).
#[inline]
pub fn sample_square<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::new(gen_f32(rng) - 0.5, gen_f32(rng) - 0.5)
}

/// Uniform point in the unit disk, by rejection.
pub fn random_in_unit_disk<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    loop {
        let p = Vec2::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Build an orthonormal basis from a unit normal (Duff et al. 2017).
pub fn build_orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}

/// Express a tangent-space direction (z up) in the frame around `n`.
#[inline]
pub fn to_world(local: Vec3, n: Vec3) -> Vec3 {
    let (tangent, bitangent) = build_orthonormal_basis(n);
    local.x * tangent + local.y * bitangent + local.z * n
}

/// Cosine-weighted direction in the hemisphere around `n`.
///
/// The pdf of the returned direction is `cos(theta) / pi`.
pub fn cosine_hemisphere<R: Rng + ?Sized>(n: Vec3, rng: &mut R) -> Vec3 {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let local = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt());
    to_world(local, n).normalize_or_zero()
}

/// Power heuristic with beta = 2 for the strategy with density `f`.
#[inline]
pub fn power_heuristic(f: f32, g: f32) -> f32 {
    let f2 = f * f;
    let g2 = g * g;
    if f2 + g2 > 0.0 && (f2 + g2).is_finite() {
        f2 / (f2 + g2)
    } else if f.is_infinite() {
        1.0
    } else {
        0.0
    }
}

/// SplitMix64 step.
#[inline]
fn splitmix(mut v: u64) -> u64 {
    v = v.wrapping_add(0x9e3779b97f4a7c15);
    v = (v ^ (v >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    v = (v ^ (v >> 27)).wrapping_mul(0x94d049bb133111eb);
    v ^ (v >> 31)
}

/// Mix a render seed with iteration, pixel and bounce into a stream seed.
///
/// Each field goes through its own SplitMix round, so no two fields share
/// bits and neighbouring pixels get unrelated streams.
pub fn hash_seed(seed: u64, iteration: u32, pixel: u32, depth: u32) -> u64 {
    let mut v = splitmix(seed);
    v = splitmix(v ^ iteration as u64);
    v = splitmix(v ^ pixel as u64);
    splitmix(v ^ depth as u64)
}

/// Deterministic generator for one path at one bounce.
///
/// Results never depend on which thread shades the path.
#[inline]
pub fn path_rng(seed: u64, iteration: u32, pixel: u32, depth: u32) -> StdRng {
    StdRng::seed_from_u64(hash_seed(seed, iteration, pixel, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthonormal_basis() {
        for n in [Vec3::Y, Vec3::NEG_Z, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let (t, b) = build_orthonormal_basis(n);

            assert!(t.dot(n).abs() < 1e-4);
            assert!(b.dot(n).abs() < 1e-4);
            assert!(t.dot(b).abs() < 1e-4);
            assert!((t.length() - 1.0).abs() < 1e-4);
            assert!((b.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cosine_hemisphere_stays_above_surface() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = Vec3::new(0.3, -0.4, 0.5).normalize();
        let mut mean_cos = 0.0;
        let samples = 4000;

        for _ in 0..samples {
            let d = cosine_hemisphere(n, &mut rng);
            assert!(d.dot(n) >= -1e-5);
            assert!((d.length() - 1.0).abs() < 1e-4);
            mean_cos += d.dot(n);
        }

        // E[cos] under cos/pi is 2/3
        mean_cos /= samples as f32;
        assert!((mean_cos - 2.0 / 3.0).abs() < 0.03);
    }

    #[test]
    fn test_power_heuristic() {
        assert!((power_heuristic(1.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((power_heuristic(3.0, 1.0) - 0.9).abs() < 1e-6);
        assert_eq!(power_heuristic(0.0, 0.0), 0.0);
        assert!((power_heuristic(2.0, 0.5) + power_heuristic(0.5, 2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unit_disk() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..256 {
            assert!(random_in_unit_disk(&mut rng).length() < 1.0);
        }
    }

    #[test]
    fn test_hash_seed_varies() {
        let a = hash_seed(1, 0, 10, 0);
        assert_eq!(a, hash_seed(1, 0, 10, 0));
        assert_ne!(a, hash_seed(1, 0, 11, 0));
        assert_ne!(a, hash_seed(1, 1, 10, 0));
        assert_ne!(a, hash_seed(1, 0, 10, 1));
        assert_ne!(a, hash_seed(2, 0, 10, 0));
    }

    #[test]
    fn test_hash_seed_camera_stream_is_distinct() {
        let mut seen = std::collections::HashSet::new();
        for iteration in 0..64 {
            for depth in (0..1024).chain([u32::MAX]) {
                assert!(seen.insert(hash_seed(0, iteration, 5, depth)), "iteration {iteration} depth {depth}");
            }
        }
    }
}
