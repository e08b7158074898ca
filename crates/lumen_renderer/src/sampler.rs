//! Per-pixel, per-sample random streams and hemisphere sampling.

use std::f32::consts::PI;

use lumen_math::{Vec2, Vec3};
use rand::{distributions::Standard, Rng};
use rand_pcg::Pcg32;

/// Uniform random numbers for one camera sample.
///
/// Every (pixel, sample) pair gets its own PCG stream from the render seed,
/// so results do not depend on which thread runs the sample or in what
/// order.
#[derive(Clone, Debug)]
pub struct Sampler {
    rng: Pcg32,
}

impl Sampler {
    pub fn new(seed: u64, pixel: u64, sample: u32) -> Self {
        // Pcg has uncorrelated streams so let's leverage that
        let stream = (pixel << 32) | sample as u64;
        Self {
            rng: Pcg32::new(seed, stream),
        }
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.rng.sample(Standard)
    }

    #[inline]
    pub fn next_2d(&mut self) -> Vec2 {
        let x = self.next_f32();
        let y = self.next_f32();
        Vec2::new(x, y)
    }
}

/// Cosine-weighted direction around +Z.
pub fn cosine_sample_hemisphere(u: Vec2) -> Vec3 {
    let r = u.x.sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u.x).max(0.0).sqrt())
}

/// Orthonormal basis with `w` along a given normal.
#[derive(Clone, Copy, Debug)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    /// Basis around `normal`, built from world Y, or world X when the normal
    /// is too close to Y.
    pub fn from_normal(normal: Vec3) -> Self {
        let up = if normal.dot(Vec3::Y).abs() > 0.75 {
            Vec3::X
        } else {
            Vec3::Y
        };
        let u = up.cross(normal).normalize();
        let v = normal.cross(u);
        Self { u, v, w: normal }
    }

    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local.x * self.u + local.y * self.v + local.z * self.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_range_and_determinism() {
        let mut a = Sampler::new(7, 1234, 3);
        let mut b = Sampler::new(7, 1234, 3);
        for _ in 0..1000 {
            let x = a.next_f32();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x.to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn test_sampler_streams_differ() {
        let mut a = Sampler::new(7, 10, 0);
        let mut b = Sampler::new(7, 10, 1);
        let mut c = Sampler::new(7, 11, 0);
        let xa: Vec<f32> = (0..8).map(|_| a.next_f32()).collect();
        let xb: Vec<f32> = (0..8).map(|_| b.next_f32()).collect();
        let xc: Vec<f32> = (0..8).map(|_| c.next_f32()).collect();
        assert_ne!(xa, xb);
        assert_ne!(xa, xc);
    }

    #[test]
    fn test_sampler_mean() {
        let mut sampler = Sampler::new(1, 0, 0);
        let n = 20_000;
        let mean: f32 = (0..n).map(|_| sampler.next_f32()).sum::<f32>() / n as f32;
        assert!((mean - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_cosine_hemisphere_is_unit_and_upward() {
        let mut sampler = Sampler::new(3, 0, 0);
        let mut mean_cos = 0.0;
        let n = 20_000;
        for _ in 0..n {
            let d = cosine_sample_hemisphere(sampler.next_2d());
            assert!((d.length() - 1.0).abs() < 1e-4);
            assert!(d.z >= 0.0);
            mean_cos += d.z;
        }
        // E[cos] under a cosine-weighted pdf is 2/3
        mean_cos /= n as f32;
        assert!((mean_cos - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_onb_orthonormal() {
        for n in [
            Vec3::Y,
            -Vec3::Y,
            Vec3::X,
            Vec3::Z,
            Vec3::new(1.0, 2.0, 3.0).normalize(),
            Vec3::new(0.1, 0.99, 0.0).normalize(),
        ] {
            let onb = Onb::from_normal(n);
            assert!((onb.u.length() - 1.0).abs() < 1e-5);
            assert!((onb.v.length() - 1.0).abs() < 1e-5);
            assert!(onb.u.dot(onb.v).abs() < 1e-5);
            assert!(onb.u.dot(n).abs() < 1e-5);
            assert!(onb.v.dot(n).abs() < 1e-5);
            assert!((onb.to_world(Vec3::Z) - n).length() < 1e-6);
        }
    }
}
