//! Primitive intersection tests and shading record construction.

use std::f32::consts::PI;

use lumen_core::{PrimitiveId, Scene, Sphere, Triangle};
use lumen_math::{Differential, Mat4Ext, Ray, Vec2, Vec3};

use crate::constants::PARALLEL_EPSILON;
use crate::differential;
use crate::hit::{Closest, PrimitiveHit, ShadingRecord};

/// A primitive that can report where a ray first hits it.
pub trait Intersect {
    /// Smallest `t` in `[ray.min_t, ray.max_t)` where the ray hits, if any.
    fn intersect(&self, ray: &Ray) -> Option<f32>;
}

impl Intersect for Sphere {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        // The object-space direction is not renormalized, so t stays world t
        let o = self.inverse.transform_point3(ray.origin);
        let d = self.inverse.transform_vector3(ray.direction);

        let a = d.length_squared();
        let h = o.dot(d);
        let c = o.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        let near = (-h - sqrtd) / a;
        if ray.t.contains_half_open(near) {
            return Some(near);
        }
        let far = (-h + sqrtd) / a;
        if ray.t.contains_half_open(far) {
            return Some(far);
        }
        None
    }
}

impl Intersect for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let planes = &self.planes;

        // Degenerate triangles have a zero normal and fail here too
        let n_dot_d = planes.normal.dot(ray.direction);
        if n_dot_d.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = -(planes.normal.dot(ray.origin) + planes.offset) / n_dot_d;
        if !ray.t.contains_half_open(t) {
            return None;
        }

        let p = ray.at(t);
        let v = planes.v_plane.dot(p) + planes.v_offset;
        let w = planes.w_plane.dot(p) + planes.w_offset;
        if v < 0.0 || w < 0.0 || v + w > 1.0 {
            return None;
        }

        Some(t)
    }
}

/// Intersect any primitive of the scene.
#[inline]
pub fn intersect_primitive(scene: &Scene, id: PrimitiveId, ray: &Ray) -> Option<PrimitiveHit> {
    let t = match id {
        PrimitiveId::Sphere(i) => scene.sphere(i).intersect(ray),
        PrimitiveId::Triangle(i) => scene.triangle(i).intersect(ray),
    }?;
    Some(PrimitiveHit { t, primitive: id })
}

/// Test a run of primitives for any hit inside the ray interval.
#[inline]
pub(crate) fn any_hit_in(scene: &Scene, ids: &[PrimitiveId], ray: &Ray) -> bool {
    ids.iter().any(|&id| intersect_primitive(scene, id, ray).is_some())
}

/// Offer every hit in a run of primitives to `closest`.
#[inline]
pub(crate) fn nearest_in(scene: &Scene, ids: &[PrimitiveId], ray: &Ray, closest: &mut Closest) {
    for &id in ids {
        if let Some(hit) = intersect_primitive(scene, id, ray) {
            closest.offer(hit);
        }
    }
}

/// Spherical UV of a unit object-space normal. Poles map to `v = 0` and `v = 1`.
fn sphere_uv(n: Vec3) -> Vec2 {
    let theta = (-n.y).clamp(-1.0, 1.0).acos();
    let phi = (-n.z).atan2(n.x) + PI;
    Vec2::new(phi / (2.0 * PI), theta / PI)
}

/// Build the full shading record for a hit found by traversal.
pub fn shade(scene: &Scene, ray: &Ray, hit: PrimitiveHit) -> ShadingRecord {
    match hit.primitive {
        PrimitiveId::Sphere(i) => shade_sphere(scene, scene.sphere(i), ray, hit),
        PrimitiveId::Triangle(i) => shade_triangle(scene, scene.triangle(i), ray, hit),
    }
}

fn shade_sphere(scene: &Scene, sphere: &Sphere, ray: &Ray, hit: PrimitiveHit) -> ShadingRecord {
    let o = sphere.inverse.transform_point3(ray.origin);
    let d = sphere.inverse.transform_vector3(ray.direction);
    let object_point = o + hit.t * d;
    let object_normal = object_point / sphere.radius;

    let position = ray.at(hit.t);
    let mut normal = sphere.transform.transform_normal(object_normal);
    let front_facing = ray.direction.dot(normal) < 0.0;
    if !front_facing {
        normal = -normal;
    }

    let d_position = differential::transfer(ray, hit.t, normal);
    let world_radius = (position - sphere.center()).length().max(f32::EPSILON);
    let sign = if front_facing { 1.0 } else { -1.0 };
    let d_normal = d_position.map(|dp| dp * (sign / world_radius));

    ShadingRecord {
        ray: *ray,
        material_id: sphere.material,
        material: *scene.material(sphere.material),
        position,
        normal,
        view: -ray.direction,
        uv: sphere_uv(object_normal.normalize_or_zero()),
        coords: object_point,
        t: hit.t,
        primitive: hit.primitive,
        front_facing,
        d_position,
        d_normal,
    }
}

fn shade_triangle(
    scene: &Scene,
    triangle: &Triangle,
    ray: &Ray,
    hit: PrimitiveHit,
) -> ShadingRecord {
    let mesh = scene.mesh(triangle.mesh);
    let [i0, i1, i2] = triangle.vertices;
    let position = ray.at(hit.t);
    let bary = triangle.planes.barycentric(position);

    let (n0, n1, n2) = (mesh.normal(i0), mesh.normal(i1), mesh.normal(i2));
    let mut normal = (bary.x * n0 + bary.y * n1 + bary.z * n2).normalize_or_zero();
    if normal == Vec3::ZERO {
        normal = triangle.planes.normal;
    }
    let front_facing = ray.direction.dot(normal) < 0.0;
    if !front_facing {
        normal = -normal;
    }

    let uv = bary.x * mesh.uv(i0) + bary.y * mesh.uv(i1) + bary.z * mesh.uv(i2);

    // Offsets slide along the flat face, not the interpolated normal's plane
    let d_position = differential::transfer(ray, hit.t, triangle.planes.normal);
    let sign = if front_facing { 1.0 } else { -1.0 };
    let d_normal_along = |dp: Vec3| {
        let dv = triangle.planes.v_plane.dot(dp);
        let dw = triangle.planes.w_plane.dot(dp);
        sign * (dv * (n1 - n0) + dw * (n2 - n0))
    };
    let d_normal = Differential::new(d_normal_along(d_position.dx), d_normal_along(d_position.dy));

    let material_id = scene.triangle_material(triangle);
    ShadingRecord {
        ray: *ray,
        material_id,
        material: *scene.material(material_id),
        position,
        normal,
        view: -ray.direction,
        uv,
        coords: bary,
        t: hit.t,
        primitive: hit.primitive,
        front_facing,
        d_position,
        d_normal,
    }
}
