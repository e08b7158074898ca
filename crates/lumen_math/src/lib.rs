// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{Differential, Ray, RayDifferentials, RAY_EPSILON};
pub use transform::Mat4Ext;

/// RGB color with unbounded linear components.
pub type Color = Vec3;

/// Returns the component of `v` along `axis` (0=X, 1=Y, 2=Z).
#[inline]
pub fn axis_component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}
