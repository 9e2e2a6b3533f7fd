//! Light transport: one shading step per path per bounce.
//!
//! Each step handles emission at the hit point, next-event estimation
//! toward a sampled light, and BSDF sampling for the continuation ray.
//! Direct lighting is combined from both strategies with the power
//! heuristic:
//!
//! - The light-sampling half is weighted `pl^2 / (pl^2 + pb^2)` at the
//!   bounce that sends the shadow ray.
//! - The BSDF half is weighted `pb^2 / (pb^2 + pl^2)` when the continuation
//!   ray lands on a light, using the pdf stored in the path state.
//!
//! Emission seen directly from the camera or through a delta bounce has no
//! light-sampling counterpart and is added unweighted.

use lumen_core::material::Color;
use lumen_core::{Material, Scene};
use lumen_math::{Ray, Vec3};
use rand::Rng;

use crate::accel::SceneAccel;
use crate::bsdf;
use crate::config::RenderConfig;
use crate::light::LightSampler;
use crate::path::{PathState, ShadeableIntersection};
use crate::sampling::{gen_f32, path_rng, power_heuristic};

/// Offset applied along the normal when spawning rays from a surface.
pub const RAY_EPSILON: f32 = 1e-3;

/// Lowest Russian roulette survival probability.
const MIN_SURVIVAL: f32 = 0.05;

/// Read-only view of everything a shading step needs.
#[derive(Clone, Copy)]
pub struct Integrator<'a> {
    pub scene: &'a Scene,
    pub accel: &'a SceneAccel,
    pub lights: &'a LightSampler,
    pub config: &'a RenderConfig,
}

impl<'a> Integrator<'a> {
    pub fn new(scene: &'a Scene, accel: &'a SceneAccel, lights: &'a LightSampler, config: &'a RenderConfig) -> Self {
        Self {
            scene,
            accel,
            lights,
            config,
        }
    }

    /// Shade one bounce of `path` at `isect`, mutating only the path.
    ///
    /// Afterwards the path either carries its continuation ray with one
    /// fewer remaining bounce, or is terminated.
    pub fn shade<R: Rng + ?Sized>(&self, path: &mut PathState, isect: &ShadeableIntersection, rng: &mut R) {
        if !path.is_alive() {
            return;
        }

        if !isect.is_hit() {
            path.radiance += path.throughput * self.scene.background;
            path.terminate();
            return;
        }

        let Some(material) = self.scene.material(isect.material_id) else {
            path.terminate();
            return;
        };

        let wo = -path.ray.direction();
        let n = isect.surface_normal;
        let p = path.ray.at(isect.t);

        if material.is_emissive() {
            self.add_emission(path, isect, material, wo, p);
            path.terminate();
            return;
        }

        if !material.bsdf.is_delta() {
            path.radiance += path.throughput * self.sample_direct(material, p, n, wo, rng);
        }

        let Some(sample) = bsdf::sample(&material.bsdf, wo, n, rng) else {
            path.terminate();
            return;
        };
        if !(sample.pdf > 0.0 && sample.weight.is_finite()) || sample.weight.max_element() <= 0.0 {
            path.terminate();
            return;
        }

        path.throughput *= sample.weight;
        path.prev_specular = sample.is_specular;
        path.prev_bsdf_pdf = sample.pdf;
        path.advance(Ray::new(offset_origin(p, n, sample.wi), sample.wi));

        if path.is_alive() && path.depth >= self.config.russian_roulette_depth {
            let survival = path.throughput.max_element().clamp(MIN_SURVIVAL, 1.0);
            if gen_f32(rng) >= survival {
                path.terminate();
                return;
            }
            path.throughput /= survival;
        }
    }

    /// Trace a single path to completion and return its radiance.
    ///
    /// Uses the same per-bounce seeding as the wavefront renderer.
    pub fn trace(&self, ray: Ray, iteration: u32, pixel_index: u32) -> Color {
        let mut path = PathState::new(ray, pixel_index, self.config.max_depth);
        while path.is_alive() {
            let isect = self.accel.intersect(self.scene, &path.ray);
            let mut rng = path_rng(self.config.seed, iteration, pixel_index, path.depth);
            self.shade(&mut path, &isect, &mut rng);
        }
        path.radiance
    }

    /// Emission at the hit point, weighted against light sampling when the
    /// previous bounce could also have found this light.
    fn add_emission(&self, path: &mut PathState, isect: &ShadeableIntersection, material: &Material, wo: Vec3, p: Vec3) {
        let cos_light = isect.surface_normal.dot(wo);
        if cos_light <= 0.0 {
            // Emitters are one-sided.
            return;
        }
        let le = material.emitted();

        if path.depth == 0 || path.prev_specular {
            path.radiance += path.throughput * le;
            return;
        }

        let weight = match isect.geom_id.and_then(|g| self.lights.light_for_geom(g)) {
            Some(light) => {
                let pdf_light = self.lights.selection_pdf(light)
                    * self.lights.pdf_area_at(light, p)
                    * isect.t
                    * isect.t
                    / cos_light;
                if pdf_light.is_finite() {
                    power_heuristic(path.prev_bsdf_pdf, pdf_light)
                } else {
                    0.0
                }
            }
            // Not light-sampled, so BSDF sampling is the only strategy.
            None => 1.0,
        };
        path.radiance += path.throughput * le * weight;
    }

    /// Next-event estimation: one light sample, shadow-tested and MIS
    /// weighted. Returns radiance before the path throughput is applied.
    fn sample_direct<R: Rng + ?Sized>(&self, material: &Material, p: Vec3, n: Vec3, wo: Vec3, rng: &mut R) -> Color {
        let Some((light, selection_pdf)) = self.lights.pick(gen_f32(rng)) else {
            return Color::ZERO;
        };
        let Some(ls) = self.lights.sample_point(light, rng) else {
            return Color::ZERO;
        };

        let origin = offset_origin(p, n, ls.point - p);
        let to_light = ls.point - origin;
        let dist2 = to_light.length_squared();
        if dist2 <= 0.0 {
            return Color::ZERO;
        }
        let dist = dist2.sqrt();
        let wi = to_light / dist;

        let cos_light = ls.normal.dot(-wi);
        if cos_light <= 0.0 {
            return Color::ZERO;
        }

        let f = bsdf::eval(&material.bsdf, wo, wi, n);
        if f.max_element() <= 0.0 {
            return Color::ZERO;
        }

        let pdf_light = selection_pdf * ls.pdf_area * dist2 / cos_light;
        if !(pdf_light > 0.0 && pdf_light.is_finite()) {
            return Color::ZERO;
        }

        let shadow = Ray::new(origin, wi);
        if self.accel.occluded(self.scene, &shadow, dist * (1.0 - RAY_EPSILON)) {
            return Color::ZERO;
        }

        let pdf_bsdf = bsdf::pdf(&material.bsdf, wo, wi, n);
        let weight = power_heuristic(pdf_light, pdf_bsdf);
        f * ls.radiance * wi.dot(n).abs() * weight / pdf_light
    }
}

/// Surface point nudged to the side of `n` that `dir` leaves through.
#[inline]
pub fn offset_origin(p: Vec3, n: Vec3, dir: Vec3) -> Vec3 {
    if dir.dot(n) >= 0.0 {
        p + n * RAY_EPSILON
    } else {
        p - n * RAY_EPSILON
    }
}
