use crate::{axis_component, Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box used by every acceleration structure.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));

        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box so it contains `p`.
    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            x: Interval::new(self.x.min.min(p.x), self.x.max.max(p.x)),
            y: Interval::new(self.y.min.min(p.y), self.y.max.max(p.y)),
            z: Interval::new(self.z.min.min(p.z), self.z.max.max(p.z)),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Minimum corner.
    #[inline]
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    #[inline]
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Edge lengths along each axis.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Returns true if `p` lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Returns true if the two boxes share any volume or boundary.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x.min <= other.x.max
            && other.x.min <= self.x.max
            && self.y.min <= other.y.max
            && other.y.min <= self.y.max
            && self.z.min <= other.z.max
            && other.z.min <= self.z.max
    }

    /// Slab test returning the clipped `(t_enter, t_exit)` range.
    ///
    /// `inv_direction` is the component-wise reciprocal of the ray direction;
    /// infinities for axis-parallel rays are handled by IEEE semantics.
    #[inline]
    pub fn intersect_with_inv(
        &self,
        origin: Vec3,
        inv_direction: Vec3,
        mut ray_t: Interval,
    ) -> Option<(f32, f32)> {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let o = axis_component(origin, axis);
            let adinv = axis_component(inv_direction, axis);

            let mut t0 = (slab.min - o) * adinv;
            let mut t1 = (slab.max - o) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // f32::max/min ignore NaN from 0 * inf, keeping the current bound
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max < ray_t.min {
                return None;
            }
        }

        Some((ray_t.min, ray_t.max))
    }

    /// Slab test against a ray within the given parametric interval.
    #[inline]
    pub fn intersect(&self, r: &Ray, ray_t: Interval) -> Option<(f32, f32)> {
        self.intersect_with_inv(r.origin, r.direction.recip(), ray_t)
    }

    /// Test if a ray intersects this AABB within the given interval.
    #[inline]
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        self.intersect(r, ray_t).is_some()
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    pub const UNIVERSE: Aabb = Aabb {
        x: Interval::UNIVERSE,
        y: Interval::UNIVERSE,
        z: Interval::UNIVERSE,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min(), Vec3::ZERO);
        assert_eq!(aabb.max(), Vec3::splat(10.0));
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.x.min, 0.0);
        assert_eq!(surrounding.x.max, 10.0);
    }

    #[test]
    fn test_aabb_surrounding_empty_is_identity() {
        let b = Aabb::from_points(Vec3::ONE, Vec3::splat(2.0));
        assert_eq!(Aabb::surrounding(&Aabb::EMPTY, &b), b);
    }

    #[test]
    fn test_aabb_hit() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert!(aabb.hit(&ray, Interval::new(0.0, 100.0)));

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));

        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(!aabb.hit(&ray, Interval::new(0.0, 100.0)));
    }

    #[test]
    fn test_aabb_intersect_distances() {
        let aabb = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);

        let (t0, t1) = aabb.intersect(&ray, Interval::new(0.0, f32::INFINITY)).unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);

        // Interval clipped by the ray range
        let (t0, t1) = aabb.intersect(&ray, Interval::new(0.0, 5.0)).unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_intersect_from_inside() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        let (t0, t1) = aabb.intersect(&ray, Interval::new(0.001, f32::INFINITY)).unwrap();
        assert!((t0 - 0.001).abs() < 1e-6);
        assert!((t1 - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_overlaps_and_contains() {
        let a = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_points(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = Aabb::from_points(Vec3::splat(3.0), Vec3::splat(4.0));

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains_point(Vec3::splat(0.5)));
        assert!(!a.contains_point(Vec3::splat(1.5)));
    }

    #[test]
    fn test_aabb_longest_axis() {
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0)).longest_axis(), 0);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0)).longest_axis(), 1);
        assert_eq!(Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0)).longest_axis(), 2);
    }

    #[test]
    fn test_aabb_centroid_and_volume() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0));
        assert_eq!(aabb.centroid(), Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(aabb.volume(), 1000.0);
        assert_eq!(Aabb::EMPTY.volume(), 0.0);
    }
}
