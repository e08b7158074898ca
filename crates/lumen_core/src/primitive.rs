//! Sphere and triangle primitive records.
//!
//! These are plain data. The intersection routines live in the renderer.

use lumen_math::{Aabb, Mat4, Mat4Ext, Vec3};

use crate::material::MaterialId;

/// Identifies a primitive and its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveId {
    Sphere(u32),
    Triangle(u32),
}

impl PrimitiveId {
    pub fn is_sphere(self) -> bool {
        matches!(self, PrimitiveId::Sphere(_))
    }

    pub fn is_triangle(self) -> bool {
        matches!(self, PrimitiveId::Triangle(_))
    }
}

/// A sphere of `radius` around the origin of its object space.
#[derive(Clone, Debug)]
pub struct Sphere {
    /// Object to world
    pub transform: Mat4,
    /// World to object
    pub inverse: Mat4,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    /// Sphere centered at `center`.
    pub fn new(center: Vec3, radius: f32, material: MaterialId) -> Self {
        Self::with_transform(Mat4::from_translation(center), radius, material)
    }

    /// Sphere placed by an arbitrary affine transform.
    pub fn with_transform(transform: Mat4, radius: f32, material: MaterialId) -> Self {
        Self {
            transform,
            inverse: transform.inverse(),
            radius,
            material,
        }
    }

    /// World-space center.
    pub fn center(&self) -> Vec3 {
        self.transform.transform_point3(Vec3::ZERO)
    }

    pub fn bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        self.transform.transform_aabb(&Aabb::from_points(-r, r))
    }
}

/// Plane equations precomputed for a triangle.
///
/// `normal . p + offset = 0` is the supporting plane. The two barycentric
/// planes give the weights of vertex 1 and vertex 2 at a point `p` on the
/// plane: `v = v_plane . p + v_offset`, `w = w_plane . p + w_offset`.
/// A zero-area triangle has all-zero planes and never intersects.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TrianglePlanes {
    pub normal: Vec3,
    pub offset: f32,
    pub v_plane: Vec3,
    pub v_offset: f32,
    pub w_plane: Vec3,
    pub w_offset: f32,
}

impl TrianglePlanes {
    const DEGENERATE_AREA: f32 = 1e-12;

    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let n = e1.cross(e2);
        let area2 = n.length_squared();
        if !(area2 > Self::DEGENERATE_AREA) {
            return Self::default();
        }

        let normal = n / area2.sqrt();
        let v_plane = e2.cross(n) / area2;
        let w_plane = n.cross(e1) / area2;

        Self {
            normal,
            offset: -normal.dot(p0),
            v_plane,
            v_offset: -v_plane.dot(p0),
            w_plane,
            w_offset: -w_plane.dot(p0),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::ZERO
    }

    /// Barycentric weights `(u, v, w)` of a point on the plane.
    #[inline]
    pub fn barycentric(&self, p: Vec3) -> Vec3 {
        let v = self.v_plane.dot(p) + self.v_offset;
        let w = self.w_plane.dot(p) + self.w_offset;
        Vec3::new(1.0 - v - w, v, w)
    }
}

/// One triangle of a mesh.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// Indices into the owning mesh's vertex arrays
    pub vertices: [u32; 3],
    pub mesh: u32,
    /// Overrides the mesh material when set
    pub material: Option<MaterialId>,
    pub planes: TrianglePlanes,
    pub bounds: Aabb,
}

impl Triangle {
    pub fn new(vertices: [u32; 3], mesh: u32, positions: [Vec3; 3]) -> Self {
        let [p0, p1, p2] = positions;
        let bounds = Aabb::from_points(p0.min(p1).min(p2), p0.max(p1).max(p2));
        Self {
            vertices,
            mesh,
            material: None,
            planes: TrianglePlanes::new(p0, p1, p2),
            bounds,
        }
    }
}
