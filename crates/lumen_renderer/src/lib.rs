//! Lumen Renderer - BVH-accelerated Monte Carlo path tracing.
//!
//! Renders a `lumen_core::Scene` progressively, one sample per pixel per
//! iteration, into a caller-owned [`AccumulationBuffer`]:
//!
//! - Analytic sphere/box/plane intersection plus a flattened triangle BVH
//! - Next-event estimation with power-heuristic MIS
//! - Wavefront execution with rayon: intersect, shade, compact
//!
//! # Example
//!
//! ```ignore
//! use lumen_renderer::{RenderConfig, Renderer};
//!
//! let mut renderer = Renderer::new(scene, RenderConfig::default())?;
//! let mut accum = renderer.create_buffer();
//! renderer.render(&mut accum, |done, total| log::info!("{done}/{total}"))?;
//! let rgba = accum.to_rgba8();
//! ```

pub mod accel;
pub mod bsdf;
pub mod buffer;
pub mod bvh;
pub mod camera;
pub mod compaction;
pub mod config;
pub mod error;
pub mod integrator;
pub mod intersect;
pub mod light;
pub mod path;
pub mod renderer;
pub mod sampling;

pub use accel::SceneAccel;
pub use buffer::{color_to_rgba, AccumulationBuffer};
pub use bvh::{Bvh, BvhStats, FlatNode, TriangleHit};
pub use camera::Camera;
pub use config::{LightSelection, RenderConfig};
pub use error::RenderError;
pub use integrator::Integrator;
pub use intersect::{SurfaceHit, MAX_INTERSECT_DIST, MIN_INTERSECT_DIST};
pub use light::{LightSample, LightSampler};
pub use path::{PathState, ShadeableIntersection};
pub use renderer::Renderer;

/// Re-export the scene and math crates so callers need only this one.
pub use lumen_core;
pub use lumen_math;
