//! Lumen Core - Scene snapshot types for the Lumen ray tracer.
//!
//! This crate provides:
//!
//! - **Primitives**: `Sphere`, `Triangle` (with precomputed `TrianglePlanes`), `Mesh`
//! - **Shading data**: `Material`, `Light`
//! - **Scene preparation**: `SceneBuilder` validates input once and produces
//!   an immutable `Scene`
//! - **Scene files**: `SceneDescription` JSON format with OBJ mesh references
//!
//! # Example
//!
//! ```ignore
//! use lumen_core::SceneDescription;
//!
//! let desc = SceneDescription::from_file("scene.json")?;
//! let scene = desc.to_scene(std::path::Path::new("."))?;
//! println!("Loaded {} primitives", scene.primitive_count());
//! ```

pub mod description;
pub mod error;
pub mod material;
pub mod mesh;
pub mod primitive;
pub mod scene;

// Re-export commonly used types
pub use description::{CameraDescription, MeshDescription, MeshSource, SceneDescription, SphereDescription};
pub use error::{SceneError, SceneResult};
pub use material::{Light, Material, MaterialId};
pub use mesh::Mesh;
pub use primitive::{PrimitiveId, Sphere, Triangle, TrianglePlanes};
pub use scene::{Scene, SceneBuilder, Transform};
