//! Intersection results: the lightweight hit found during traversal and
//! the full shading record built once for the nearest one.

use lumen_core::{Material, MaterialId, PrimitiveId};
use lumen_math::{Differential, Ray, Vec2, Vec3};

use crate::constants::TIE_EPSILON;

/// A primitive and the ray parameter where it was hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveHit {
    pub t: f32,
    pub primitive: PrimitiveId,
}

/// Everything the integrator needs at a surface interaction.
#[derive(Debug, Clone, Copy)]
pub struct ShadingRecord {
    /// The incoming ray
    pub ray: Ray,
    pub material_id: MaterialId,
    pub material: Material,
    /// World-space hit point
    pub position: Vec3,
    /// Unit shading normal, always facing the incoming ray
    pub normal: Vec3,
    /// Unit vector from the hit point back toward the ray origin
    pub view: Vec3,
    pub uv: Vec2,
    /// Barycentric weights `(u, v, w)` for triangles, object-space hit
    /// point for spheres
    pub coords: Vec3,
    pub t: f32,
    pub primitive: PrimitiveId,
    /// False when the ray arrived from inside the surface
    pub front_facing: bool,
    pub d_position: Differential,
    pub d_normal: Differential,
}

/// Running nearest-hit state shared by every acceleration structure.
///
/// A candidate only replaces the current best when it is closer by more than
/// [`TIE_EPSILON`], so the primitive visited first wins near-ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct Closest {
    best: Option<PrimitiveHit>,
}

impl Closest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate. Returns true if it became the new best.
    #[inline]
    pub fn offer(&mut self, candidate: PrimitiveHit) -> bool {
        match self.best {
            Some(best) if candidate.t >= best.t - TIE_EPSILON => false,
            _ => {
                self.best = Some(candidate);
                true
            }
        }
    }

    /// Parameter of the current best hit, or `max_t` when there is none.
    #[inline]
    pub fn limit(&self, max_t: f32) -> f32 {
        self.best.map_or(max_t, |best| best.t.min(max_t))
    }

    /// True once the best hit lies at or before `t`.
    #[inline]
    pub fn settled_before(&self, t: f32) -> bool {
        self.best.is_some_and(|best| best.t <= t)
    }

    #[inline]
    pub fn get(&self) -> Option<PrimitiveHit> {
        self.best
    }
}
