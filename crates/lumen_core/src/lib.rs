//! Lumen Core - scene description consumed by the path tracer.
//!
//! This crate provides the read-only inputs the renderer works on:
//!
//! - **Geometry**: analytic instances (`Geom`) and world-space `Triangle`s
//!   baked from `Mesh`es
//! - **Materials**: tagged `Bsdf` variants plus emission
//! - **Lights**: references to emissive analytic instances
//! - **Camera**: resolution, placement and lens parameters
//!
//! Scene loading lives outside this crate; everything here derives
//! `serde` traits so a loader can deserialize the tables directly.
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::{CameraParams, GeomKind, Material, Scene};
//! use lumen_math::{Transform, Vec3};
//!
//! let mut scene = Scene::new(CameraParams::default());
//! let white = scene.add_material(Material::diffuse(Vec3::splat(0.8)));
//! scene.add_geom(GeomKind::Sphere, Transform::default(), white)?;
//! scene.validate()?;
//! ```

pub mod camera;
pub mod error;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use camera::CameraParams;
pub use error::SceneError;
pub use geometry::{Geom, GeomKind};
pub use material::{Bsdf, Material};
pub use mesh::{Mesh, Triangle};
pub use scene::{Light, Scene};
