//! Triangle mesh vertex data.
//!
//! A mesh owns flat per-vertex arrays (position, normal, UV). A single index
//! addresses all three, so every triangle is three indices into the same
//! arrays. Triangles are generated from the mesh when it is added to a
//! [`crate::SceneBuilder`].

use std::path::Path;

use lumen_math::{Aabb, Mat4, Mat4Ext, Vec2, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::material::MaterialId;

/// A mesh consisting of vertex positions, optional normals/UVs, and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - computed by `ensure_normals` if absent)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one per vertex)
    pub uvs: Option<Vec<Vec2>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Fallback material for triangles without their own
    pub material: MaterialId,

    /// Optional per-triangle material overrides
    pub face_materials: Option<Vec<Option<MaterialId>>>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        material: MaterialId,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs: None,
            indices,
            material,
            face_materials: None,
            bounds,
        }
    }

    /// Attach per-vertex UV coordinates.
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach per-triangle material overrides.
    pub fn with_face_materials(mut self, face_materials: Vec<Option<MaterialId>>) -> Self {
        self.face_materials = Some(face_materials);
        self
    }

    /// An axis-aligned quad made of two triangles, counter-clockwise when
    /// viewed from the side `normal` points to.
    pub fn quad(corners: [Vec3; 4], material: MaterialId) -> Self {
        let normal = (corners[1] - corners[0]).cross(corners[2] - corners[0]).normalize_or_zero();
        Self::new(
            corners.to_vec(),
            vec![0, 1, 2, 0, 2, 3],
            Some(vec![normal; 4]),
            material,
        )
        .with_uvs(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ])
    }

    /// Load every model of a triangulated OBJ file as a separate mesh.
    pub fn from_obj(path: impl AsRef<Path>, material: MaterialId) -> SceneResult<Vec<Mesh>> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .map_err(|source| SceneError::Obj {
            path: path.to_path_buf(),
            source,
        })?;

        if models.is_empty() {
            return Err(SceneError::EmptyObj(path.to_path_buf()));
        }

        let meshes: Vec<Mesh> = models
            .into_iter()
            .filter(|model| !model.mesh.indices.is_empty())
            .map(|model| {
                let m = model.mesh;
                let positions: Vec<Vec3> = m
                    .positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2]))
                    .collect();
                let normals = (!m.normals.is_empty()).then(|| {
                    m.normals
                        .chunks_exact(3)
                        .map(|n| Vec3::new(n[0], n[1], n[2]))
                        .collect()
                });
                let mut mesh = Mesh::new(positions, m.indices, normals, material);
                if !m.texcoords.is_empty() {
                    mesh.uvs = Some(
                        m.texcoords
                            .chunks_exact(2)
                            .map(|uv| Vec2::new(uv[0], uv[1]))
                            .collect(),
                    );
                }
                log::debug!(
                    "OBJ model '{}': {} vertices, {} triangles",
                    model.name,
                    mesh.vertex_count(),
                    mesh.triangle_count()
                );
                mesh
            })
            .collect();

        if meshes.is_empty() {
            return Err(SceneError::EmptyObj(path.to_path_buf()));
        }
        Ok(meshes)
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        if positions.is_empty() {
            return Aabb::EMPTY;
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for pos in positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        Aabb::from_points(min, max)
    }

    /// Bake a transform into positions and normals.
    pub fn transform(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals {
                *n = matrix.transform_normal(*n);
            }
        }
        self.bounds = Self::compute_bounds(&self.positions);
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Each vertex normal is the normalized, area-weighted average of the
    /// counter-clockwise face normals of the faces sharing that vertex.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let edge1 = self.positions[i1] - p0;
            let edge2 = self.positions[i2] - p0;
            let face_normal = edge1.cross(edge2);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y; // Default up normal for degenerate cases
            }
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let should_compute = match &self.normals {
            None => true,
            Some(normals) => normals.len() != self.positions.len(),
        };

        if should_compute {
            if let Some(normals) = &self.normals {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    normals.len(),
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    /// Check index ranges and attribute array lengths.
    pub fn validate(&self, mesh: usize) -> SceneResult<()> {
        let count = self.positions.len();

        if self.indices.len() % 3 != 0 {
            return Err(SceneError::IncompleteTriangle {
                mesh,
                count: self.indices.len(),
            });
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(SceneError::VertexOutOfRange { mesh, index, count });
        }
        if let Some(normals) = &self.normals {
            if normals.len() != count {
                return Err(SceneError::AttributeMismatch {
                    mesh,
                    attribute: "normal",
                    found: normals.len(),
                    expected: count,
                });
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != count {
                return Err(SceneError::AttributeMismatch {
                    mesh,
                    attribute: "uv",
                    found: uvs.len(),
                    expected: count,
                });
            }
        }
        if let Some(faces) = &self.face_materials {
            if faces.len() != self.triangle_count() {
                return Err(SceneError::AttributeMismatch {
                    mesh,
                    attribute: "face material",
                    found: faces.len(),
                    expected: self.triangle_count(),
                });
            }
        }
        Ok(())
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex normal, falling back to +Y when the mesh has none.
    #[inline]
    pub fn normal(&self, index: u32) -> Vec3 {
        self.normals
            .as_ref()
            .map_or(Vec3::Y, |normals| normals[index as usize])
    }

    /// Vertex UV, zero when the mesh has none.
    #[inline]
    pub fn uv(&self, index: u32) -> Vec2 {
        self.uvs.as_ref().map_or(Vec2::ZERO, |uvs| uvs[index as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
            MaterialId(0),
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = unit_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.normals.is_none());
        assert!(mesh.validate(0).is_ok());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();

        // Counter-clockwise in the XY plane viewed from +Z
        for normal in mesh.normals.as_ref().unwrap() {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_bounds_computation() {
        let mesh = Mesh::new(
            vec![
                Vec3::new(-1.0, -2.0, -3.0),
                Vec3::new(4.0, 5.0, 6.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            vec![0, 1, 2],
            None,
            MaterialId(0),
        );

        assert!((mesh.bounds.x.min - (-1.0)).abs() < 0.001);
        assert!((mesh.bounds.x.max - 4.0).abs() < 0.001);
        assert!((mesh.bounds.z.min - (-3.0)).abs() < 0.001);
        assert!((mesh.bounds.z.max - 6.0).abs() < 0.001);
    }

    #[test]
    fn test_validate_vertex_out_of_range() {
        let mut mesh = unit_triangle();
        mesh.indices = vec![0, 1, 7];

        assert!(matches!(
            mesh.validate(2),
            Err(SceneError::VertexOutOfRange { mesh: 2, index: 7, count: 3 })
        ));
    }

    #[test]
    fn test_validate_incomplete_triangle() {
        let mut mesh = unit_triangle();
        mesh.indices.push(0);
        assert!(matches!(mesh.validate(0), Err(SceneError::IncompleteTriangle { .. })));
    }

    #[test]
    fn test_validate_attribute_mismatch() {
        let mesh = unit_triangle().with_uvs(vec![Vec2::ZERO]);
        assert!(matches!(
            mesh.validate(0),
            Err(SceneError::AttributeMismatch { attribute: "uv", .. })
        ));
    }

    #[test]
    fn test_transform_moves_bounds() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        mesh.transform(&Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));

        assert!((mesh.bounds.z.min - 5.0).abs() < 0.001);
        assert!((mesh.normal(0) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_quad_normals_face_ccw_side() {
        let quad = Mesh::quad(
            [
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, -1.0),
            ],
            MaterialId(0),
        );
        assert_eq!(quad.triangle_count(), 2);
        assert!((quad.normal(0) - Vec3::Y).length() < 1e-5);
    }
}
