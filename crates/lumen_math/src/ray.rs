use crate::{Interval, Vec3};

/// Default lower bound of the ray interval, keeps rays from re-hitting
/// the surface they start on.
pub const RAY_EPSILON: f32 = 0.001;

/// Screen-space derivative of a vector: change per one-pixel step in x and y.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Differential {
    pub dx: Vec3,
    pub dy: Vec3,
}

impl Differential {
    pub const ZERO: Differential = Differential {
        dx: Vec3::ZERO,
        dy: Vec3::ZERO,
    };

    #[inline]
    pub fn new(dx: Vec3, dy: Vec3) -> Self {
        Self { dx, dy }
    }

    /// Apply the same linear map to both derivatives.
    #[inline]
    pub fn map(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self {
            dx: f(self.dx),
            dy: f(self.dy),
        }
    }
}

/// Ray differentials tracking how origin and direction change per pixel.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RayDifferentials {
    pub d_position: Differential,
    pub d_direction: Differential,
}

impl RayDifferentials {
    pub const ZERO: RayDifferentials = RayDifferentials {
        d_position: Differential::ZERO,
        d_direction: Differential::ZERO,
    };
}

/// A ray in 3D space with a unit direction and a parametric range.
///
/// Rays are used for raytracing - they represent a line starting at `origin`
/// and traveling in `direction`. Only hits with `t` in `[t.min, t.max)` count.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Always unit length.
    pub direction: Vec3,
    pub t: Interval,
    pub differentials: RayDifferentials,
}

impl Ray {
    /// Create a new ray over `[RAY_EPSILON, inf)`. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_range(origin, direction, RAY_EPSILON, f32::INFINITY)
    }

    /// Create a ray with an explicit parametric range. The direction is normalized.
    pub fn with_range(origin: Vec3, direction: Vec3, min_t: f32, max_t: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            t: Interval::new(min_t, max_t),
            differentials: RayDifferentials::ZERO,
        }
    }

    /// Attach differentials to the ray.
    pub fn with_differentials(mut self, differentials: RayDifferentials) -> Self {
        self.differentials = differentials;
        self
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn min_t(&self) -> f32 {
        self.t.min
    }

    #[inline]
    pub fn max_t(&self) -> f32 {
        self.t.max
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
