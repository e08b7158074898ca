//! Pinhole camera for ray generation.

use lumen_core::CameraDescription;
use lumen_math::{Differential, Ray, RayDifferentials, Vec2, Vec3};

use crate::sampler::Sampler;

/// Camera for generating primary rays with pixel-footprint differentials.
#[derive(Clone, Debug)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,

    // Cached computed values (set by initialize())
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    w: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        let mut camera = Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::Z,
            vup: Vec3::Y,
            vfov: 60.0,
            center: Vec3::ZERO,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            w: -Vec3::Z,
        };
        camera.initialize();
        camera
    }

    /// Camera placed by a scene description.
    pub fn from_description(desc: &CameraDescription, width: u32, height: u32) -> Self {
        Self::new()
            .with_resolution(width, height)
            .with_position(desc.look_from, desc.look_at, desc.vup)
            .with_fov(desc.vfov)
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width.max(1);
        self.image_height = height.max(1);
        self.initialize();
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialize();
        self
    }

    fn initialize(&mut self) {
        self.center = self.look_from;

        // Viewport one unit in front of the camera
        let theta = self.vfov.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height as f32);

        // Calculate camera basis vectors
        self.w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(self.w).normalize_or_zero();
        let v = self.w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width as f32;
        self.pixel_delta_v = viewport_v / self.image_height as f32;

        let viewport_upper_left = self.center - self.w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
    }

    /// Ray through pixel `(i, j)` offset by `offset` pixels from its center.
    pub fn pixel_ray(&self, i: u32, j: u32, offset: Vec2) -> Ray {
        let pixel_sample = self.pixel00_loc
            + (i as f32 + offset.x) * self.pixel_delta_u
            + (j as f32 + offset.y) * self.pixel_delta_v;
        let direction = pixel_sample - self.center;

        // Derivative of normalize(direction) for a one-pixel step
        let dd = direction.length_squared();
        let scale = dd.powf(1.5).recip();
        let d_normalized = |delta: Vec3| (dd * delta - direction.dot(delta) * direction) * scale;

        Ray::new(self.center, direction).with_differentials(RayDifferentials {
            d_position: Differential::ZERO,
            d_direction: Differential::new(
                d_normalized(self.pixel_delta_u),
                d_normalized(self.pixel_delta_v),
            ),
        })
    }

    /// Jittered ray for pixel `(i, j)`; consumes two numbers from `sampler`.
    pub fn get_ray(&self, i: u32, j: u32, sampler: &mut Sampler) -> Ray {
        let offset = sampler.next_2d() - Vec2::splat(0.5);
        self.pixel_ray(i, j, offset)
    }

    pub fn pixel_count(&self) -> usize {
        self.image_width as usize * self.image_height as usize
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
