//! BSDF sampling and evaluation.
//!
//! Directions follow the usual convention: `wo` points away from the surface
//! toward where the path came from, `wi` points away from the surface toward
//! the next vertex. `n` is the outward surface normal as reported by the
//! intersection (it may face away from `wo`).

use std::f32::consts::{FRAC_1_PI, PI};

use lumen_core::material::Color;
use lumen_core::Bsdf;
use lumen_math::Vec3;
use rand::Rng;

use crate::sampling::{cosine_hemisphere, gen_f32, to_world};

/// A sampled scattering direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub wi: Vec3,
    /// `f * |cos| / pdf`, the throughput multiplier
    pub weight: Color,
    /// Solid-angle pdf; 1 by convention for delta lobes
    pub pdf: f32,
    /// The sample came from a delta lobe
    pub is_specular: bool,
}

/// Sample an incident direction. `None` means the path is absorbed.
pub fn sample<R: Rng + ?Sized>(bsdf: &Bsdf, wo: Vec3, n: Vec3, rng: &mut R) -> Option<BsdfSample> {
    let n_f = face_forward(n, wo);

    match *bsdf {
        Bsdf::DiffuseReflection { reflectance } => {
            let wi = cosine_hemisphere(n_f, rng);
            let pdf = wi.dot(n_f) * FRAC_1_PI;
            (pdf > 0.0).then_some(BsdfSample {
                wi,
                weight: reflectance,
                pdf,
                is_specular: false,
            })
        }

        Bsdf::DiffuseTransmission { transmittance } => {
            let wi = cosine_hemisphere(-n_f, rng);
            let pdf = -wi.dot(n_f) * FRAC_1_PI;
            (pdf > 0.0).then_some(BsdfSample {
                wi,
                weight: transmittance,
                pdf,
                is_specular: false,
            })
        }

        Bsdf::SpecularReflection { reflectance } => Some(specular(reflect(-wo, n_f), reflectance)),

        Bsdf::SpecularTransmission { transmittance, ior } => {
            refract_through(wo, n, ior).map(|wi| specular(wi, transmittance))
        }

        Bsdf::Glass {
            reflectance,
            transmittance,
            ior,
        } => {
            let cos_o = wo.dot(n_f).clamp(0.0, 1.0);
            match refract_through(wo, n, ior) {
                Some(wi) if gen_f32(rng) >= schlick(cos_o, ior) => Some(specular(wi, transmittance)),
                // Reflect on the Fresnel pick or on total internal reflection.
                _ => Some(specular(reflect(-wo, n_f), reflectance)),
            }
        }

        Bsdf::Plastic { diffuse, specular: coat, ior } => {
            let fresnel = schlick(wo.dot(n_f).clamp(0.0, 1.0), ior);
            if gen_f32(rng) < fresnel {
                return Some(specular(reflect(-wo, n_f), coat));
            }
            let wi = cosine_hemisphere(n_f, rng);
            let pdf = (1.0 - fresnel) * wi.dot(n_f) * FRAC_1_PI;
            (pdf > 0.0).then_some(BsdfSample {
                wi,
                weight: diffuse,
                pdf,
                is_specular: false,
            })
        }

        Bsdf::Microfacet { roughness, .. } => {
            let alpha = ggx_alpha(roughness);
            let h = sample_ggx(n_f, alpha, rng);
            let wi = reflect(-wo, h);
            if wi.dot(n_f) <= 0.0 {
                return None;
            }
            let f = eval(bsdf, wo, wi, n);
            let pdf = pdf(bsdf, wo, wi, n);
            if pdf <= 0.0 {
                return None;
            }
            Some(BsdfSample {
                wi,
                weight: f * wi.dot(n_f) / pdf,
                pdf,
                is_specular: false,
            })
        }
    }
}

/// BSDF value for a pair of directions. Zero for delta lobes.
pub fn eval(bsdf: &Bsdf, wo: Vec3, wi: Vec3, n: Vec3) -> Color {
    let n_f = face_forward(n, wo);
    let cos_i = wi.dot(n_f);

    match *bsdf {
        Bsdf::DiffuseReflection { reflectance } if cos_i > 0.0 => reflectance * FRAC_1_PI,
        Bsdf::DiffuseTransmission { transmittance } if cos_i < 0.0 => transmittance * FRAC_1_PI,
        Bsdf::Plastic { diffuse, ior, .. } if cos_i > 0.0 => {
            let fresnel = schlick(wo.dot(n_f).clamp(0.0, 1.0), ior);
            (1.0 - fresnel) * diffuse * FRAC_1_PI
        }
        Bsdf::Microfacet { reflectance, roughness } if cos_i > 0.0 => {
            let cos_o = wo.dot(n_f);
            let h = (wo + wi).normalize_or_zero();
            if cos_o <= 0.0 || h == Vec3::ZERO {
                return Color::ZERO;
            }
            let alpha = ggx_alpha(roughness);
            let d = ggx_d(n_f.dot(h), alpha);
            let g = smith_g_ggx(cos_i, cos_o, alpha);
            let f = schlick_fresnel3(reflectance, wi.dot(h).clamp(0.0, 1.0));
            f * (d * g / (4.0 * cos_i * cos_o))
        }
        _ => Color::ZERO,
    }
}

/// Solid-angle pdf of sampling `wi` given `wo`. Zero for delta lobes.
pub fn pdf(bsdf: &Bsdf, wo: Vec3, wi: Vec3, n: Vec3) -> f32 {
    let n_f = face_forward(n, wo);
    let cos_i = wi.dot(n_f);

    match *bsdf {
        Bsdf::DiffuseReflection { .. } if cos_i > 0.0 => cos_i * FRAC_1_PI,
        Bsdf::DiffuseTransmission { .. } if cos_i < 0.0 => -cos_i * FRAC_1_PI,
        Bsdf::Plastic { ior, .. } if cos_i > 0.0 => {
            let fresnel = schlick(wo.dot(n_f).clamp(0.0, 1.0), ior);
            (1.0 - fresnel) * cos_i * FRAC_1_PI
        }
        Bsdf::Microfacet { roughness, .. } if cos_i > 0.0 => {
            let h = (wo + wi).normalize_or_zero();
            let wo_h = wo.dot(h).abs();
            if wo_h <= 0.0 {
                return 0.0;
            }
            let cos_h = n_f.dot(h);
            ggx_d(cos_h, ggx_alpha(roughness)) * cos_h.max(0.0) / (4.0 * wo_h)
        }
        _ => 0.0,
    }
}

#[inline]
fn specular(wi: Vec3, weight: Color) -> BsdfSample {
    BsdfSample {
        wi,
        weight,
        pdf: 1.0,
        is_specular: true,
    }
}

/// Normal flipped onto the side of `wo`.
#[inline]
fn face_forward(n: Vec3, wo: Vec3) -> Vec3 {
    if n.dot(wo) < 0.0 {
        -n
    } else {
        n
    }
}

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with relative index `eta`.
/// Returns `None` on total internal reflection.
#[inline]
fn refract(uv: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = eta * (uv + cos_theta * n);
    let k = 1.0 - r_out_perp.length_squared();
    if k < 0.0 {
        return None;
    }
    Some((r_out_perp - k.sqrt() * n).normalize_or_zero())
}

/// Refract `-wo` through a surface whose outward normal is `n`; entering
/// when `wo` is on the outside.
#[inline]
fn refract_through(wo: Vec3, n: Vec3, ior: f32) -> Option<Vec3> {
    let entering = wo.dot(n) > 0.0;
    let (n_side, eta) = if entering { (n, 1.0 / ior) } else { (-n, ior) };
    refract(-wo, n_side, eta)
}

/// Schlick weight for Fresnel.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x // (1 - cos_theta)^5
}

/// Schlick's approximation for a dielectric interface.
#[inline]
fn schlick(cos_theta: f32, ior: f32) -> f32 {
    let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
    r0 + (1.0 - r0) * schlick_weight(cos_theta)
}

/// Schlick Fresnel with a colored normal-incidence reflectance.
#[inline]
fn schlick_fresnel3(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

#[inline]
fn ggx_alpha(roughness: f32) -> f32 {
    (roughness * roughness).max(1e-3)
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    if n_dot_h <= 0.0 {
        return 0.0;
    }
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Smith G for GGX.
#[inline]
fn smith_g_ggx(n_dot_l: f32, n_dot_v: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let g1_l = 2.0 * n_dot_l / (n_dot_l + (a2 + (1.0 - a2) * n_dot_l * n_dot_l).sqrt());
    let g1_v = 2.0 * n_dot_v / (n_dot_v + (a2 + (1.0 - a2) * n_dot_v * n_dot_v).sqrt());
    g1_l * g1_v
}

/// Sample a GGX microfacet normal around `n` with density `D(h) cos(theta_h)`.
fn sample_ggx<R: Rng + ?Sized>(n: Vec3, alpha: f32, rng: &mut R) -> Vec3 {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);

    let theta = (alpha * (u1 / (1.0 - u1).max(1e-7)).sqrt()).atan();
    let phi = 2.0 * PI * u2;

    let local = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
    to_world(local, n).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn test_diffuse_sample_consistent_with_eval() {
        let bsdf = Bsdf::DiffuseReflection {
            reflectance: Color::new(0.5, 0.6, 0.7),
        };
        let wo = Vec3::new(0.3, 0.2, 1.0).normalize();
        let mut rng = rng();

        for _ in 0..64 {
            let s = sample(&bsdf, wo, Vec3::Z, &mut rng).unwrap();
            let cos = s.wi.z;
            let expected = eval(&bsdf, wo, s.wi, Vec3::Z) * cos / pdf(&bsdf, wo, s.wi, Vec3::Z);

            assert!(cos > 0.0);
            assert!((s.weight - expected).length() < 1e-4);
            assert!((s.pdf - pdf(&bsdf, wo, s.wi, Vec3::Z)).abs() < 1e-5);
            assert!(!s.is_specular);
        }
    }

    #[test]
    fn test_diffuse_from_back_side() {
        let bsdf = Bsdf::DiffuseReflection { reflectance: Color::ONE };
        let s = sample(&bsdf, Vec3::NEG_Z, Vec3::Z, &mut rng()).unwrap();
        assert!(s.wi.z < 0.0);
    }

    #[test]
    fn test_diffuse_transmission_crosses_surface() {
        let bsdf = Bsdf::DiffuseTransmission { transmittance: Color::ONE };
        let s = sample(&bsdf, Vec3::Z, Vec3::Z, &mut rng()).unwrap();

        assert!(s.wi.z < 0.0);
        assert!(eval(&bsdf, Vec3::Z, s.wi, Vec3::Z).x > 0.0);
        assert_eq!(eval(&bsdf, Vec3::Z, Vec3::Z, Vec3::Z), Color::ZERO);
    }

    #[test]
    fn test_mirror() {
        let bsdf = Bsdf::SpecularReflection {
            reflectance: Color::splat(0.9),
        };
        let wo = Vec3::new(1.0, 0.0, 1.0).normalize();
        let s = sample(&bsdf, wo, Vec3::Z, &mut rng()).unwrap();

        assert!((s.wi - Vec3::new(-1.0, 0.0, 1.0).normalize()).length() < 1e-5);
        assert!(s.is_specular);
        assert_eq!(s.weight, Color::splat(0.9));
        assert_eq!(eval(&bsdf, wo, s.wi, Vec3::Z), Color::ZERO);
        assert_eq!(pdf(&bsdf, wo, s.wi, Vec3::Z), 0.0);
    }

    #[test]
    fn test_specular_transmission_bends_toward_normal() {
        let bsdf = Bsdf::SpecularTransmission {
            transmittance: Color::ONE,
            ior: 1.5,
        };
        let wo = Vec3::new(1.0, 0.0, 1.0).normalize();
        let s = sample(&bsdf, wo, Vec3::Z, &mut rng()).unwrap();

        // sin(theta_t) = sin(45) / 1.5
        let sin_t = (s.wi.x * s.wi.x + s.wi.y * s.wi.y).sqrt();
        assert!(s.wi.z < 0.0);
        assert!((sin_t - std::f32::consts::FRAC_1_SQRT_2 / 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_total_internal_reflection_absorbs() {
        let bsdf = Bsdf::SpecularTransmission {
            transmittance: Color::ONE,
            ior: 1.5,
        };
        // Leaving the medium at a grazing angle: wo is inside (below the outward normal).
        let wo = Vec3::new(0.9, 0.0, -0.2).normalize();
        assert!(sample(&bsdf, wo, Vec3::Z, &mut rng()).is_none());
    }

    #[test]
    fn test_glass_splits_by_fresnel() {
        let bsdf = Bsdf::Glass {
            reflectance: Color::ONE,
            transmittance: Color::ONE,
            ior: 1.5,
        };
        let mut rng = rng();
        let mut reflected = 0;
        let trials = 4000;

        for _ in 0..trials {
            let s = sample(&bsdf, Vec3::Z, Vec3::Z, &mut rng).unwrap();
            assert!(s.is_specular);
            if s.wi.z > 0.0 {
                reflected += 1;
            }
        }

        // Normal incidence reflectance is 0.04
        let fraction = reflected as f32 / trials as f32;
        assert!((fraction - 0.04).abs() < 0.02);
    }

    #[test]
    fn test_plastic_diffuse_lobe_weight() {
        let bsdf = Bsdf::Plastic {
            diffuse: Color::new(0.2, 0.4, 0.6),
            specular: Color::ONE,
            ior: 1.5,
        };
        let mut rng = rng();
        let wo = Vec3::Z;

        for _ in 0..64 {
            let s = sample(&bsdf, wo, Vec3::Z, &mut rng).unwrap();
            if s.is_specular {
                assert!((s.wi - Vec3::Z).length() < 1e-5);
            } else {
                let expected = eval(&bsdf, wo, s.wi, Vec3::Z) * s.wi.z / pdf(&bsdf, wo, s.wi, Vec3::Z);
                assert!((s.weight - expected).length() < 1e-4);
            }
        }
    }

    #[test]
    fn test_microfacet_sample_matches_eval_and_pdf() {
        let bsdf = Bsdf::Microfacet {
            reflectance: Color::new(0.9, 0.7, 0.3),
            roughness: 0.4,
        };
        let wo = Vec3::new(0.2, -0.3, 1.0).normalize();
        let mut rng = rng();
        let mut sampled = 0;

        for _ in 0..256 {
            if let Some(s) = sample(&bsdf, wo, Vec3::Z, &mut rng) {
                sampled += 1;
                let f = eval(&bsdf, wo, s.wi, Vec3::Z);
                let p = pdf(&bsdf, wo, s.wi, Vec3::Z);
                assert!(p > 0.0);
                assert!((s.pdf - p).abs() / p < 1e-3);
                assert!((s.weight - f * s.wi.z / p).length() < 1e-3);
                assert!(s.weight.is_finite());
            }
        }
        assert!(sampled > 200);
    }

    #[test]
    fn test_microfacet_pdf_integrates_to_at_most_one() {
        let bsdf = Bsdf::Microfacet {
            reflectance: Color::ONE,
            roughness: 0.5,
        };
        let wo = Vec3::new(0.0, 0.3, 1.0).normalize();
        let mut rng = rng();

        // Uniform hemisphere estimate of the integral of the pdf
        let samples = 20000;
        let mut total = 0.0;
        for _ in 0..samples {
            let z = gen_f32(&mut rng);
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = 2.0 * PI * gen_f32(&mut rng);
            let wi = Vec3::new(r * phi.cos(), r * phi.sin(), z);
            total += pdf(&bsdf, wo, wi, Vec3::Z) * 2.0 * PI;
        }
        let integral = total / samples as f32;
        assert!(integral > 0.8 && integral < 1.05);
    }

    #[test]
    fn test_schlick_limits() {
        assert!((schlick(1.0, 1.5) - 0.04).abs() < 1e-4);
        assert!((schlick(0.0, 1.5) - 1.0).abs() < 1e-4);
        assert!((schlick_weight(1.0) - 0.0).abs() < 0.001);
    }
}
