//! Image rendering in the two execution regimes.
//!
//! - Host: rayon over spiral-ordered buckets, recursive integrator, finished
//!   pixels written into one `Mutex`-guarded [`Accumulator`]
//! - Device: one independent work item per pixel, iterative integrator,
//!   results gathered after the dispatch
//!
//! Both use the same per-pixel sample loop, so for a given seed they produce
//! bit-identical images.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use lumen_core::Scene;
use lumen_math::{Color, Ray};
use rayon::prelude::*;

use crate::accel::Accelerator;
use crate::bucket::{generate_buckets, render_bucket};
use crate::camera::Camera;
use crate::config::{ConfigResult, Regime, RenderConfig};
use crate::integrator::PathTracer;
use crate::sampler::Sampler;

/// Running mean after folding sample number `n` (zero-based) into `old`.
#[inline]
pub fn progressive_average(old: Color, n: u32, new: Color) -> Color {
    (old * n as f32 + new) / (n as f32 + 1.0)
}

/// Average `samples` jittered camera samples of pixel `(x, y)`.
///
/// Sample `s` of pixel `p` always draws from the stream `(seed, p, s)`.
pub fn sample_pixel(
    camera: &Camera,
    seed: u64,
    x: u32,
    y: u32,
    samples: u32,
    mut trace: impl FnMut(&Ray, &mut Sampler) -> Color,
) -> Color {
    let pixel = y as u64 * camera.image_width as u64 + x as u64;
    let mut color = Color::ZERO;
    for s in 0..samples {
        let mut sampler = Sampler::new(seed, pixel, s);
        let ray = camera.get_ray(x, y, &mut sampler);
        color = progressive_average(color, s, trace(&ray, &mut sampler));
    }
    color
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a float RGBA pixel to 8-bit, gamma-correcting the color channels.
pub fn color_to_rgba(pixel: [f32; 4]) -> [u8; 4] {
    let r = (255.0 * clamp_01(linear_to_gamma(pixel[0]))) as u8;
    let g = (255.0 * clamp_01(linear_to_gamma(pixel[1]))) as u8;
    let b = (255.0 * clamp_01(linear_to_gamma(pixel[2]))) as u8;
    let a = (255.0 * clamp_01(pixel[3])) as u8;
    [r, g, b, a]
}

/// Linear RGBA float image. Unrendered pixels have zero alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    /// Get the color at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        let [r, g, b, _] = self.pixels[(y * self.width + x) as usize];
        Color::new(r, g, b)
    }

    /// Set the pixel at (x, y) to an opaque color.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[(y * self.width + x) as usize] = opaque(color);
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*pixel));
        }
        bytes
    }
}

#[inline]
fn opaque(color: Color) -> [f32; 4] {
    [color.x, color.y, color.z, 1.0]
}

/// Shared output of the host regime.
#[derive(Debug)]
pub struct Accumulator {
    image: ImageBuffer,
    progress: usize,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: ImageBuffer::new(width, height),
            progress: 0,
        }
    }

    /// Write one finished pixel and count it.
    pub fn store(&mut self, index: usize, color: Color) {
        self.image.pixels[index] = opaque(color);
        self.progress += 1;
    }

    /// Pixels written so far.
    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn into_image(self) -> ImageBuffer {
        self.image
    }
}

/// Host regime: buckets on the rayon pool with the recursive integrator.
///
/// Once `cancel` is set no new bucket starts and running buckets stop at
/// the next pixel.
pub fn render_host(
    tracer: &PathTracer<'_>,
    camera: &Camera,
    config: &RenderConfig,
    cancel: &AtomicBool,
) -> ImageBuffer {
    let buckets = generate_buckets(camera.image_width, camera.image_height, config.bucket_size);
    log::debug!(
        "Host render: {} buckets of {}px, {} spp",
        buckets.len(),
        config.bucket_size,
        config.samples_per_pixel
    );

    let accumulator = Mutex::new(Accumulator::new(camera.image_width, camera.image_height));
    buckets.par_iter().for_each(|bucket| {
        if cancel.load(Ordering::Relaxed) {
            return;
        }
        render_bucket(
            bucket,
            camera,
            tracer,
            config.seed,
            config.samples_per_pixel,
            &accumulator,
            cancel,
        );
    });

    let accumulator = accumulator.into_inner().unwrap_or_else(|e| e.into_inner());
    log::debug!("Host render wrote {} of {} pixels", accumulator.progress(), camera.pixel_count());
    accumulator.into_image()
}

/// Device regime: one work item per pixel with the iterative integrator.
///
/// Work items share nothing mutable; cancelled pixels are left unrendered.
pub fn render_device(
    tracer: &PathTracer<'_>,
    camera: &Camera,
    config: &RenderConfig,
    cancel: &AtomicBool,
) -> ImageBuffer {
    let width = camera.image_width;
    log::debug!(
        "Device render: {} work items, {} spp",
        camera.pixel_count(),
        config.samples_per_pixel
    );

    let pixels: Vec<[f32; 4]> = (0..camera.pixel_count())
        .into_par_iter()
        .map(|index| {
            if cancel.load(Ordering::Relaxed) {
                return [0.0; 4];
            }
            let x = index as u32 % width;
            let y = index as u32 / width;
            let color = sample_pixel(camera, config.seed, x, y, config.samples_per_pixel, |ray, sampler| {
                tracer.trace_iterative(ray, sampler)
            });
            opaque(color)
        })
        .collect();

    ImageBuffer {
        width,
        height: camera.image_height,
        pixels,
    }
}

/// Build the configured accelerator and render `scene` through `camera`.
pub fn render(scene: &Scene, camera: &Camera, config: &RenderConfig, cancel: &AtomicBool) -> ConfigResult<ImageBuffer> {
    config.validate()?;
    let accel = Accelerator::build(scene, config.accelerator, &config.accel)?;
    let tracer = PathTracer::new(scene, &accel, config.path).with_background(config.background);

    let start = Instant::now();
    let image = match config.regime {
        Regime::Host => render_host(&tracer, camera, config, cancel),
        Regime::Device => render_device(&tracer, camera, config, cancel),
    };
    log::info!(
        "Rendered {}x{} @ {} spp ({} regime, {}) in {:?}",
        camera.image_width,
        camera.image_height,
        config.samples_per_pixel,
        config.regime,
        config.accelerator,
        start.elapsed()
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Light, Material, SceneBuilder, Sphere};
    use lumen_math::Vec3;

    fn small_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(Material::diffuse(Color::splat(0.7)));
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 4.0), 1.0, m));
        builder.add_light(Light::new(Vec3::new(0.0, 4.0, 0.0), Color::splat(30.0)));
        builder.build().unwrap()
    }

    fn small_camera() -> Camera {
        Camera::new()
            .with_resolution(12, 8)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0), Vec3::Y)
            .with_fov(40.0)
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_color_to_rgba_clamps() {
        assert_eq!(color_to_rgba([4.0, -1.0, 0.25, 1.0]), [255, 0, 127, 255]);
        assert_eq!(color_to_rgba([0.0; 4]), [0, 0, 0, 0]);
    }

    #[test]
    fn test_progressive_average_is_mean() {
        let samples = [1.0, 3.0, 5.0, 7.0];
        let mut avg = Color::ZERO;
        for (n, s) in samples.iter().enumerate() {
            avg = progressive_average(avg, n as u32, Color::splat(*s));
        }
        assert!((avg.x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_accumulator_counts_progress() {
        let mut acc = Accumulator::new(2, 2);
        acc.store(3, Color::new(0.5, 0.25, 1.0));
        assert_eq!(acc.progress(), 1);
        let image = acc.into_image();
        assert_eq!(image.get(1, 1), Color::new(0.5, 0.25, 1.0));
        assert_eq!(image.pixels[3][3], 1.0);
        assert_eq!(image.pixels[0], [0.0; 4]);
    }

    #[test]
    fn test_render_hits_center() {
        let scene = small_scene();
        let camera = small_camera();
        let config = RenderConfig {
            samples_per_pixel: 2,
            ..Default::default()
        };
        let image = render(&scene, &camera, &config, &AtomicBool::new(false)).unwrap();
        assert_eq!(image.pixels.len(), 12 * 8);
        assert!(image.pixels.iter().all(|p| p[3] == 1.0));
        assert!(image.get(6, 4).length() > 0.0);
        // Corner rays miss the sphere and see the black background
        assert_eq!(image.get(0, 0), Color::ZERO);
    }

    #[test]
    fn test_cancelled_render_is_empty() {
        let scene = small_scene();
        let camera = small_camera();
        let cancel = AtomicBool::new(true);
        for regime in [Regime::Host, Regime::Device] {
            let config = RenderConfig {
                regime,
                ..Default::default()
            };
            let image = render(&scene, &camera, &config, &cancel).unwrap();
            assert!(image.pixels.iter().all(|p| *p == [0.0; 4]));
        }
    }
}
