//! Numeric constants shared by the intersectors and the integrator.

pub use lumen_math::RAY_EPSILON;

/// Depth up to which diffuse paths always continue.
pub const MINIMUM_DEPTH: u32 = 4;

/// Absorption probability applied past [`MINIMUM_DEPTH`].
pub const P_ABSORPTION: f32 = 0.1;

/// Offset along the normal for shadow and bounce ray origins.
pub const SURFACE_BIAS: f32 = 0.001;

/// A candidate replaces the current nearest hit only if it is closer by more than this.
pub const TIE_EPSILON: f32 = 0.001;

/// Rays more parallel than this to a triangle plane are rejected.
pub const PARALLEL_EPSILON: f32 = 0.001;

/// Capacity of the octree and BVH traversal stacks.
pub const TRAVERSAL_STACK_CAPACITY: usize = 100;

/// Path depth treated as absorption. Also bounds the contribution stack.
pub const MAX_PATH_DEPTH: u32 = 500;
