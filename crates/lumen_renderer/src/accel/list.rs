//! Unpartitioned primitive list: spheres first, then triangles.

use lumen_core::{PrimitiveId, Scene};
use lumen_math::{Aabb, Ray};

use crate::hit::{Closest, PrimitiveHit};
use crate::intersect::{any_hit_in, nearest_in};

pub struct ListAccel {
    primitives: Vec<PrimitiveId>,
    bounds: Aabb,
}

impl ListAccel {
    pub fn new(scene: &Scene) -> Self {
        Self {
            primitives: scene.primitive_ids().collect(),
            bounds: scene.bounds(),
        }
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn any_hit(&self, scene: &Scene, ray: &Ray) -> bool {
        if !self.bounds.hit(ray, ray.t) {
            return false;
        }
        any_hit_in(scene, &self.primitives, ray)
    }

    pub fn nearest(&self, scene: &Scene, ray: &Ray) -> Option<PrimitiveHit> {
        if !self.bounds.hit(ray, ray.t) {
            return None;
        }
        let mut closest = Closest::new();
        nearest_in(scene, &self.primitives, ray, &mut closest);
        closest.get()
    }
}
