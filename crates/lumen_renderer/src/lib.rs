//! Lumen renderer - acceleration structures and CPU path tracing.
//!
//! Traces rays against an immutable [`lumen_core::Scene`] through one of four
//! interchangeable acceleration structures, and estimates radiance with a
//! Russian-roulette path tracer that runs either recursively on rayon buckets
//! or iteratively per pixel.

pub mod accel;
mod bucket;
mod camera;
mod config;
pub mod constants;
pub mod differential;
mod hit;
mod integrator;
mod intersect;
mod renderer;
mod sampler;
mod stack;

pub use accel::{
    AccelError, AccelResult, AccelSettings, Accelerator, AcceleratorKind, BvhSettings, GridSettings,
    OctreeSettings,
};
pub use bucket::{generate_buckets, render_bucket, Bucket, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use config::{ConfigError, ConfigResult, Regime, RenderConfig};
pub use hit::{Closest, PrimitiveHit, ShadingRecord};
pub use integrator::{Contribution, PathResult, PathSettings, PathTracer};
pub use intersect::{intersect_primitive, shade, Intersect};
pub use renderer::{
    color_to_rgba, linear_to_gamma, progressive_average, render, render_device, render_host, sample_pixel,
    Accumulator, ImageBuffer,
};
pub use sampler::{cosine_sample_hemisphere, Onb, Sampler};
pub use stack::FixedStack;

/// Re-export common math types from lumen_math
pub use lumen_math::{Aabb, Color, Interval, Ray, Vec3};
