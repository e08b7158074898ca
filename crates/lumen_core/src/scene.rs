//! Immutable scene snapshot consumed by the renderer.
//!
//! A [`Scene`] is produced once by [`SceneBuilder::build`], which validates
//! every index, and is read-only for the lifetime of a render.

use lumen_math::{Aabb, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::material::{Light, Material, MaterialId};
use crate::mesh::Mesh;
use crate::primitive::{PrimitiveId, Sphere, Triangle};

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: Vec3,
    /// Rotation (as quaternion, xyzw)
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Everything the intersectors and integrator read during a render.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
    triangles: Vec<Triangle>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    bounds: Aabb,
}

impl Scene {
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Bounds of all primitives.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn sphere(&self, index: u32) -> &Sphere {
        &self.spheres[index as usize]
    }

    #[inline]
    pub fn triangle(&self, index: u32) -> &Triangle {
        &self.triangles[index as usize]
    }

    #[inline]
    pub fn mesh(&self, index: u32) -> &Mesh {
        &self.meshes[index as usize]
    }

    #[inline]
    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.index()]
    }

    /// Material of a triangle, inherited from its mesh when unset.
    #[inline]
    pub fn triangle_material(&self, triangle: &Triangle) -> MaterialId {
        triangle
            .material
            .unwrap_or_else(|| self.mesh(triangle.mesh).material)
    }

    /// World positions of a triangle's vertices.
    #[inline]
    pub fn triangle_positions(&self, triangle: &Triangle) -> [Vec3; 3] {
        let mesh = self.mesh(triangle.mesh);
        triangle.vertices.map(|i| mesh.positions[i as usize])
    }

    pub fn primitive_count(&self) -> usize {
        self.spheres.len() + self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }

    /// All primitives: spheres first, then triangles.
    pub fn primitive_ids(&self) -> impl Iterator<Item = PrimitiveId> + '_ {
        (0..self.spheres.len() as u32)
            .map(PrimitiveId::Sphere)
            .chain((0..self.triangles.len() as u32).map(PrimitiveId::Triangle))
    }

    pub fn primitive_bounds(&self, id: PrimitiveId) -> Aabb {
        match id {
            PrimitiveId::Sphere(i) => self.sphere(i).bounds(),
            PrimitiveId::Triangle(i) => self.triangle(i).bounds,
        }
    }
}

/// Collects scene data and produces a validated [`Scene`].
#[derive(Debug, Default)]
pub struct SceneBuilder {
    spheres: Vec<Sphere>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    lights: Vec<Light>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() as u32 - 1)
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> PrimitiveId {
        self.spheres.push(sphere);
        PrimitiveId::Sphere(self.spheres.len() as u32 - 1)
    }

    /// Add a mesh; its triangles are generated by `build`. Returns the mesh index.
    pub fn add_mesh(&mut self, mesh: Mesh) -> u32 {
        self.meshes.push(mesh);
        self.meshes.len() as u32 - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    fn check_material(&self, id: MaterialId) -> SceneResult<()> {
        if id.index() >= self.materials.len() {
            return Err(SceneError::MaterialOutOfRange {
                index: id.0,
                count: self.materials.len(),
            });
        }
        Ok(())
    }

    /// Validate every reference and generate mesh triangles.
    pub fn build(mut self) -> SceneResult<Scene> {
        for (i, material) in self.materials.iter().enumerate() {
            material.validate(i)?;
        }

        for (i, sphere) in self.spheres.iter().enumerate() {
            self.check_material(sphere.material)?;
            if !(sphere.radius > 0.0) {
                return Err(SceneError::InvalidRadius {
                    index: i,
                    radius: sphere.radius,
                });
            }
            if sphere.transform.determinant().abs() < f32::EPSILON {
                return Err(SceneError::SingularTransform { index: i });
            }
        }

        for (i, mesh) in self.meshes.iter().enumerate() {
            mesh.validate(i)?;
            self.check_material(mesh.material)?;
            for id in mesh.face_materials.iter().flatten().flatten() {
                self.check_material(*id)?;
            }
        }

        for mesh in &mut self.meshes {
            mesh.ensure_normals();
        }

        let mut triangles = Vec::new();
        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            for (face, chunk) in mesh.indices.chunks_exact(3).enumerate() {
                let vertices = [chunk[0], chunk[1], chunk[2]];
                let positions = vertices.map(|v| mesh.positions[v as usize]);
                let mut triangle = Triangle::new(vertices, mesh_index as u32, positions);
                triangle.material = mesh
                    .face_materials
                    .as_ref()
                    .and_then(|faces| faces[face]);
                triangles.push(triangle);
            }
        }

        let bounds = self
            .spheres
            .iter()
            .map(Sphere::bounds)
            .chain(triangles.iter().map(|t| t.bounds))
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b));

        let degenerate = triangles.iter().filter(|t| t.planes.is_degenerate()).count();
        if degenerate > 0 {
            log::warn!("{} degenerate triangles will never be hit", degenerate);
        }

        log::info!(
            "Scene: {} spheres, {} triangles in {} meshes, {} materials, {} lights",
            self.spheres.len(),
            triangles.len(),
            self.meshes.len(),
            self.materials.len(),
            self.lights.len()
        );

        Ok(Scene {
            spheres: self.spheres,
            triangles,
            meshes: self.meshes,
            materials: self.materials,
            lights: self.lights,
            bounds,
        })
    }
}
