//! Errors raised while preparing a scene.
//!
//! Everything here surfaces before rendering starts; a validated `Scene`
//! never produces an error during traversal.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene description parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load OBJ file {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("No geometry found in OBJ file {0}")]
    EmptyObj(PathBuf),

    #[error("Invalid material {index}: {reason}")]
    InvalidMaterial { index: usize, reason: String },

    #[error("Material index {index} out of range ({count} materials)")]
    MaterialOutOfRange { index: u32, count: usize },

    #[error("Mesh {mesh}: vertex index {index} out of range ({count} vertices)")]
    VertexOutOfRange { mesh: usize, index: u32, count: usize },

    #[error("Mesh {mesh}: index count {count} is not a multiple of 3")]
    IncompleteTriangle { mesh: usize, count: usize },

    #[error("Mesh {mesh}: {attribute} count {found} does not match {expected} positions")]
    AttributeMismatch {
        mesh: usize,
        attribute: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("Sphere {index} has non-positive radius {radius}")]
    InvalidRadius { index: usize, radius: f32 },

    #[error("Sphere {index} has a singular transform")]
    SingularTransform { index: usize },
}

pub type SceneResult<T> = Result<T, SceneError>;
