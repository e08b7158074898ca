//! JSON scene description format.
//!
//! ```json
//! {
//!   "materials": [{ "diffuse": [0.8, 0.8, 0.8] }, { "transparency": 1.0, "ior": 1.5 }],
//!   "spheres": [{ "center": [0, 0, 5], "radius": 1, "material": 0 }],
//!   "meshes": [{ "obj": "bunny.obj", "material": 0 }],
//!   "lights": [{ "position": [0, 5, 5], "radiance": [20, 20, 20] }],
//!   "camera": { "look_from": [0, 0, 0], "look_at": [0, 0, 5] }
//! }
//! ```
//!
//! Relative OBJ paths resolve against the description file's directory.

use std::path::{Path, PathBuf};

use lumen_math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::SceneResult;
use crate::material::{Light, Material, MaterialId};
use crate::mesh::Mesh;
use crate::primitive::Sphere;
use crate::scene::{Scene, SceneBuilder, Transform};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub materials: Vec<Material>,
    pub spheres: Vec<SphereDescription>,
    pub meshes: Vec<MeshDescription>,
    pub lights: Vec<Light>,
    pub camera: Option<CameraDescription>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SphereDescription {
    #[serde(default)]
    pub center: Vec3,
    pub radius: f32,
    pub material: MaterialId,
    /// Applied after translating to `center`
    #[serde(default)]
    pub transform: Option<Transform>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshSource {
    Obj {
        obj: PathBuf,
    },
    Inline {
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        #[serde(default)]
        normals: Option<Vec<Vec3>>,
        #[serde(default)]
        uvs: Option<Vec<Vec2>>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshDescription {
    #[serde(flatten)]
    pub source: MeshSource,
    pub material: MaterialId,
    #[serde(default)]
    pub transform: Option<Transform>,
}

/// Pinhole camera placement. Field of view is vertical, in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    pub vfov: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::Z,
            vup: Vec3::Y,
            vfov: 60.0,
        }
    }
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Build and validate the scene. `base_dir` resolves relative OBJ paths.
    pub fn to_scene(&self, base_dir: &Path) -> SceneResult<Scene> {
        let mut builder = SceneBuilder::new();

        for material in &self.materials {
            builder.add_material(*material);
        }

        for desc in &self.spheres {
            let mut matrix = lumen_math::Mat4::from_translation(desc.center);
            if let Some(transform) = &desc.transform {
                matrix = matrix * transform.to_matrix();
            }
            builder.add_sphere(Sphere::with_transform(matrix, desc.radius, desc.material));
        }

        for desc in &self.meshes {
            let mut meshes = match &desc.source {
                MeshSource::Obj { obj } => {
                    let path = if obj.is_absolute() {
                        obj.clone()
                    } else {
                        base_dir.join(obj)
                    };
                    Mesh::from_obj(&path, desc.material)?
                }
                MeshSource::Inline {
                    positions,
                    indices,
                    normals,
                    uvs,
                } => {
                    let mut mesh =
                        Mesh::new(positions.clone(), indices.clone(), normals.clone(), desc.material);
                    mesh.uvs = uvs.clone();
                    vec![mesh]
                }
            };

            for mut mesh in meshes.drain(..) {
                if let Some(transform) = &desc.transform {
                    mesh.transform(&transform.to_matrix());
                }
                builder.add_mesh(mesh);
            }
        }

        for light in &self.lights {
            builder.add_light(*light);
        }

        builder.build()
    }
}
