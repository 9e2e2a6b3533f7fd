//! Error types for the renderer.

use lumen_core::SceneError;
use thiserror::Error;

/// Errors raised while setting up or driving a render.
///
/// Nothing on the per-ray hot path returns these; misses and zero-pdf
/// samples are handled with sentinel values instead.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("invalid render config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse render config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("cannot build a BVH over zero triangles")]
    EmptyBvh,
}
