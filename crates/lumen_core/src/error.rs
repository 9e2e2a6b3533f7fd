//! Scene validation errors.

use thiserror::Error;

/// Problems detected while assembling or validating a [`Scene`](crate::Scene).
///
/// Index validity is checked once here so the render loop can index the
/// scene tables without further checks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Scene contains no geometry")]
    Empty,

    #[error("Geometry {geom} references missing material {material}")]
    MissingMaterial { geom: usize, material: usize },

    #[error("Triangle {triangle} references missing material {material}")]
    MissingTriangleMaterial { triangle: usize, material: usize },

    #[error("Geometry index {0} out of range")]
    NoSuchGeometry(usize),

    #[error("Light {light} references missing geometry {geom}")]
    MissingLightGeometry { light: usize, geom: usize },

    #[error("Light {light} (geometry {geom}) has a non-emissive material")]
    LightNotEmissive { light: usize, geom: usize },

    #[error("Light {light} uses mesh geometry {geom}, which cannot be light-sampled")]
    UnsupportedLightShape { light: usize, geom: usize },

    #[error("Mesh geometry {geom} references missing mesh {mesh}")]
    MissingMesh { geom: usize, mesh: usize },

    #[error("Material {material} has invalid index of refraction {ior}")]
    InvalidIor { material: usize, ior: f32 },

    #[error("Camera resolution must be non-zero, got {width}x{height}")]
    ZeroResolution { width: u32, height: u32 },
}
