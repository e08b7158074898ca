//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that the host regime renders
//! independently and in parallel using rayon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::camera::Camera;
use crate::integrator::PathTracer;
use crate::renderer::{sample_pixel, Accumulator};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this bucket.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Image coordinates of every pixel, row-major within the bucket.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Buckets are rendered from the center outward so the middle of the frame
/// fills in first.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();
    let mut index = 0;

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, index));
            index += 1;
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    // Update indices after sorting
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center. The sort is stable so equally
/// distant buckets keep scanline order.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let distance = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| {
        distance(a)
            .partial_cmp(&distance(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Render one bucket with the recursive integrator, storing each finished
/// pixel in the shared accumulator.
///
/// The lock is taken once per pixel. Stops between pixels once `cancel` is
/// set; returns the number of pixels written.
pub fn render_bucket(
    bucket: &Bucket,
    camera: &Camera,
    tracer: &PathTracer<'_>,
    seed: u64,
    samples_per_pixel: u32,
    accumulator: &Mutex<Accumulator>,
    cancel: &AtomicBool,
) -> u32 {
    let mut written = 0;
    for (x, y) in bucket.pixels() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let color = sample_pixel(camera, seed, x, y, samples_per_pixel, |ray, sampler| {
            tracer.trace_recursive(ray, sampler)
        });
        let index = (y * camera.image_width + x) as usize;
        // A poisoned lock only means another worker panicked mid-write
        let mut guard = accumulator.lock().unwrap_or_else(|e| e.into_inner());
        guard.store(index, color);
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_buckets_exact_fit() {
        let buckets = generate_buckets(128, 128, 64);
        assert_eq!(buckets.len(), 4); // 2x2 grid

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_buckets_partial_fit() {
        let buckets = generate_buckets(100, 100, 64);
        assert_eq!(buckets.len(), 4); // 2x2 grid with partial buckets

        let total_pixels: u32 = buckets.iter().map(|b| b.pixel_count()).sum();
        assert_eq!(total_pixels, 100 * 100);
    }

    #[test]
    fn test_spiral_order() {
        let buckets = generate_buckets(192, 192, 64);
        assert_eq!(buckets.len(), 9); // 3x3 grid

        // First bucket should be the center one
        let first = &buckets[0];
        assert_eq!(first.x, 64);
        assert_eq!(first.y, 64);
        assert!(buckets.iter().enumerate().all(|(i, b)| b.index == i));
    }

    #[test]
    fn test_bucket_pixels_cover_image_once() {
        let (w, h) = (37, 23);
        let mut seen = vec![0u8; (w * h) as usize];
        for bucket in generate_buckets(w, h, 8) {
            for (x, y) in bucket.pixels() {
                seen[(y * w + x) as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }
}
