/// A closed or half-open range of ray parameters or coordinates.
///
/// Ray queries use the half-open form `[min, max)` through
/// [`Interval::contains_half_open`]; bounding boxes use the closed form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    #[inline]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    #[inline]
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Returns true if the interval contains no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    #[inline]
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Returns true if x is within [min, max).
    #[inline]
    pub fn contains_half_open(&self, x: f32) -> bool {
        self.min <= x && x < self.max
    }

    /// Expands the interval by delta/2 on each side.
    pub fn expand(&self, delta: f32) -> Interval {
        let padding = delta / 2.0;
        Interval::new(self.min - padding, self.max + padding)
    }

    /// The overlap of two intervals (may be empty).
    #[inline]
    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// Creates an interval that surrounds two other intervals.
    pub fn surrounding(a: &Interval, b: &Interval) -> Interval {
        Interval::new(a.min.min(b.min), a.max.max(b.max))
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// A universe interval (contains everything).
    pub const UNIVERSE: Interval = Interval {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
    };
}
