//! Area light sampling for next-event estimation.
//!
//! Every light is an emissive analytic instance. Points are sampled
//! uniformly over the canonical shape's surface and mapped to world space;
//! the world-area pdf divides out the transform's area Jacobian, so
//! non-uniformly scaled lights stay unbiased.

use std::f32::consts::PI;

use lumen_core::material::Color;
use lumen_core::{GeomKind, Scene};
use lumen_math::{luminance, Transform, Vec3};
use rand::Rng;

use crate::config::LightSelection;
use crate::sampling::gen_f32;

/// Samples used to estimate the world area of a non-uniformly scaled sphere.
const SPHERE_AREA_SAMPLES: usize = 64;

/// A point sampled on a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    pub point: Vec3,
    /// Outward unit normal at `point`
    pub normal: Vec3,
    /// Emitted radiance
    pub radiance: Color,
    /// Density of `point` per unit world area
    pub pdf_area: f32,
}

#[derive(Debug, Clone)]
struct LightEntry {
    kind: GeomKind,
    transform: Transform,
    radiance: Color,
}

/// Picks lights and points on them.
#[derive(Debug, Clone)]
pub struct LightSampler {
    entries: Vec<LightEntry>,
    /// Cumulative selection probabilities, last entry 1
    cdf: Vec<f32>,
    /// Light index for each geometry instance
    light_of_geom: Vec<Option<usize>>,
}

impl LightSampler {
    pub fn new(scene: &Scene, selection: LightSelection) -> Self {
        let mut light_of_geom = vec![None; scene.geoms().len()];
        let mut entries = Vec::with_capacity(scene.lights().len());

        for light in scene.lights() {
            let Some(geom) = scene.geoms().get(light.geom_id) else {
                continue;
            };
            let Some(material) = scene.material(geom.material_id) else {
                continue;
            };
            if !geom.kind.is_analytic() {
                continue;
            }
            light_of_geom[light.geom_id] = Some(entries.len());
            entries.push(LightEntry {
                kind: geom.kind,
                transform: geom.transform,
                radiance: material.emitted(),
            });
        }

        let weights: Vec<f32> = match selection {
            LightSelection::Uniform => vec![1.0; entries.len()],
            LightSelection::Power => entries
                .iter()
                .map(|e| luminance(e.radiance) * world_area(e.kind, &e.transform))
                .collect(),
        };
        let cdf = build_cdf(&weights);

        log::debug!("Light sampler: {} lights, {:?} selection", entries.len(), selection);

        Self {
            entries,
            cdf,
            light_of_geom,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Light index of a geometry instance, if it is a sampled light.
    #[inline]
    pub fn light_for_geom(&self, geom_id: usize) -> Option<usize> {
        self.light_of_geom.get(geom_id).copied().flatten()
    }

    /// Probability of picking light `index`.
    pub fn selection_pdf(&self, index: usize) -> f32 {
        match index {
            0 => self.cdf.first().copied().unwrap_or(0.0),
            i if i < self.cdf.len() => self.cdf[i] - self.cdf[i - 1],
            _ => 0.0,
        }
    }

    /// Pick a light from a uniform number in [0, 1).
    pub fn pick(&self, u: f32) -> Option<(usize, f32)> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self
            .cdf
            .partition_point(|&c| c <= u)
            .min(self.entries.len() - 1);
        let pdf = self.selection_pdf(index);
        (pdf > 0.0).then_some((index, pdf))
    }

    /// Sample a point on light `index`.
    pub fn sample_point<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Option<LightSample> {
        let entry = self.entries.get(index)?;
        let (local_point, local_normal) = sample_local(entry.kind, gen_f32(rng), gen_f32(rng), gen_f32(rng));

        let pdf_area = area_pdf(entry.kind, &entry.transform, local_normal);
        if !(pdf_area > 0.0 && pdf_area.is_finite()) {
            return None;
        }

        Some(LightSample {
            point: entry.transform.point_to_world(local_point),
            normal: entry.transform.normal_to_world(local_normal),
            radiance: entry.radiance,
            pdf_area,
        })
    }

    /// World-area density with which `sample_point` would produce `point`,
    /// a point on the surface of light `index`.
    pub fn pdf_area_at(&self, index: usize, point: Vec3) -> f32 {
        let Some(entry) = self.entries.get(index) else {
            return 0.0;
        };
        let local = entry.transform.point_to_local(point);
        area_pdf(entry.kind, &entry.transform, local_normal_at(entry.kind, local))
    }
}

/// Normalized cumulative distribution; falls back to uniform when every
/// weight is zero.
fn build_cdf(weights: &[f32]) -> Vec<f32> {
    let total: f32 = weights.iter().filter(|w| w.is_finite()).map(|w| w.max(0.0)).sum();
    if weights.is_empty() {
        return Vec::new();
    }
    if total <= 0.0 {
        let n = weights.len() as f32;
        return (1..=weights.len()).map(|i| i as f32 / n).collect();
    }

    let mut acc = 0.0;
    let mut cdf: Vec<f32> = weights
        .iter()
        .map(|w| {
            if w.is_finite() {
                acc += w.max(0.0);
            }
            acc / total
        })
        .collect();
    if let Some(last) = cdf.last_mut() {
        *last = 1.0;
    }
    cdf
}

/// Uniform point on a canonical shape's surface, with its local normal.
fn sample_local(kind: GeomKind, u1: f32, u2: f32, u3: f32) -> (Vec3, Vec3) {
    match kind {
        GeomKind::Sphere => {
            let z = 1.0 - 2.0 * u1;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let phi = 2.0 * PI * u2;
            let n = Vec3::new(r * phi.cos(), r * phi.sin(), z);
            (0.5 * n, n)
        }
        GeomKind::Cube => {
            let face = ((u3 * 6.0) as usize).min(5);
            let axis = face % 3;
            let side = if face < 3 { 1.0 } else { -1.0 };
            let mut p = Vec3::ZERO;
            let mut n = Vec3::ZERO;
            p[axis] = 0.5 * side;
            p[(axis + 1) % 3] = u1 - 0.5;
            p[(axis + 2) % 3] = u2 - 0.5;
            n[axis] = side;
            (p, n)
        }
        GeomKind::SquarePlane | GeomKind::Mesh { .. } => (Vec3::new(u1 - 0.5, u2 - 0.5, 0.0), Vec3::Z),
    }
}

/// Local normal of a point on a canonical shape's surface.
fn local_normal_at(kind: GeomKind, p: Vec3) -> Vec3 {
    match kind {
        GeomKind::Sphere => p.normalize_or_zero(),
        GeomKind::Cube => {
            let a = p.abs();
            let axis = if a.x >= a.y && a.x >= a.z {
                0
            } else if a.y >= a.z {
                1
            } else {
                2
            };
            let mut n = Vec3::ZERO;
            n[axis] = p[axis].signum();
            n
        }
        GeomKind::SquarePlane | GeomKind::Mesh { .. } => Vec3::Z,
    }
}

/// `1 / (local area * area Jacobian)` at a point with local normal `n`.
#[inline]
fn area_pdf(kind: GeomKind, transform: &Transform, local_normal: Vec3) -> f32 {
    let area = kind.local_area() * transform.area_scale(local_normal);
    if area > 0.0 {
        1.0 / area
    } else {
        0.0
    }
}

/// World surface area of a light.
fn world_area(kind: GeomKind, transform: &Transform) -> f32 {
    match kind {
        GeomKind::SquarePlane => transform.area_scale(Vec3::Z),
        GeomKind::Cube => [Vec3::X, Vec3::Y, Vec3::Z]
            .iter()
            .map(|&n| 2.0 * transform.area_scale(n))
            .sum(),
        GeomKind::Sphere => {
            // Average Jacobian over a Fibonacci sphere
            let golden = PI * (3.0 - 5.0f32.sqrt());
            let mean: f32 = (0..SPHERE_AREA_SAMPLES)
                .map(|i| {
                    let z = 1.0 - 2.0 * (i as f32 + 0.5) / SPHERE_AREA_SAMPLES as f32;
                    let r = (1.0 - z * z).max(0.0).sqrt();
                    let phi = golden * i as f32;
                    transform.area_scale(Vec3::new(r * phi.cos(), r * phi.sin(), z))
                })
                .sum::<f32>()
                / SPHERE_AREA_SAMPLES as f32;
            kind.local_area() * mean
        }
        GeomKind::Mesh { .. } => 0.0,
    }
}
