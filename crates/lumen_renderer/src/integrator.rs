//! Path tracing integrator.
//!
//! Each surface interaction is handled by one shared step that picks a
//! scatter event (mirror, refraction or diffuse) and, for diffuse vertices,
//! gathers direct light from every point light and applies Russian roulette
//! past the minimum depth. The rest of the path is then continued either on
//! the call stack ([`PathTracer::trace_recursive`]) or through a bounded list
//! of deferred contributions ([`PathTracer::trace_iterative`]). Both forms draw
//! the same random numbers and do the same arithmetic in the same order, so
//! they return bit-identical colors.

use std::f32::consts::PI;

use lumen_core::Scene;
use lumen_math::{Color, Differential, Ray, RayDifferentials, RAY_EPSILON};
use serde::{Deserialize, Serialize};

use crate::accel::Accelerator;
use crate::constants::{MAX_PATH_DEPTH, MINIMUM_DEPTH, P_ABSORPTION, SURFACE_BIAS};
use crate::differential;
use crate::hit::ShadingRecord;
use crate::sampler::{cosine_sample_hemisphere, Onb, Sampler};
use crate::stack::FixedStack;

/// Path termination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Diffuse paths always continue up to this depth
    pub minimum_depth: u32,
    /// Russian roulette absorption probability past `minimum_depth`
    pub absorption: f32,
    /// Paths reaching this depth are treated as absorbed
    pub max_depth: u32,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            minimum_depth: MINIMUM_DEPTH,
            absorption: P_ABSORPTION,
            max_depth: MAX_PATH_DEPTH,
        }
    }
}

/// Light gathered at a diffuse vertex and the weight of everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Contribution {
    pub direct: Color,
    pub coefficient: Color,
}

impl Contribution {
    #[inline]
    fn apply(&self, tail: Color) -> Color {
        self.direct + self.coefficient * tail
    }
}

/// Outcome of one vertex.
enum Step {
    /// The path ends; the color seen from the previous vertex
    Terminate(Color),
    /// Trace `ray` next. Specular vertices carry no contribution.
    Continue {
        ray: Ray,
        contribution: Option<Contribution>,
    },
}

/// Result of an iterative trace with bookkeeping for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResult {
    pub color: Color,
    /// Diffuse vertices whose contribution was deferred
    pub contributions: usize,
    /// Depth at which the path ended
    pub depth: u32,
}

/// Radiance estimator over a scene and one of its acceleration structures.
pub struct PathTracer<'a> {
    scene: &'a Scene,
    accel: &'a Accelerator,
    settings: PathSettings,
    background: Color,
}

impl<'a> PathTracer<'a> {
    /// `settings.max_depth` is capped at [`MAX_PATH_DEPTH`].
    pub fn new(scene: &'a Scene, accel: &'a Accelerator, settings: PathSettings) -> Self {
        let settings = PathSettings {
            max_depth: settings.max_depth.min(MAX_PATH_DEPTH),
            ..settings
        };
        Self {
            scene,
            accel,
            settings,
            background: Color::ZERO,
        }
    }

    /// Radiance returned by rays that leave the scene.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn settings(&self) -> &PathSettings {
        &self.settings
    }

    /// Trace with the continuation on the call stack.
    pub fn trace_recursive(&self, ray: &Ray, sampler: &mut Sampler) -> Color {
        self.trace_from(ray, 0, sampler)
    }

    fn trace_from(&self, ray: &Ray, depth: u32, sampler: &mut Sampler) -> Color {
        match self.step(ray, depth, sampler) {
            Step::Terminate(color) => color,
            Step::Continue { ray, contribution } => {
                let tail = self.trace_from(&ray, depth + 1, sampler);
                match contribution {
                    Some(c) => c.apply(tail),
                    None => tail,
                }
            }
        }
    }

    /// Trace with the continuation in a fixed-capacity contribution list.
    pub fn trace_iterative(&self, ray: &Ray, sampler: &mut Sampler) -> Color {
        self.trace_path(ray, sampler).color
    }

    /// Iterative trace that also reports how the path unfolded.
    pub fn trace_path(&self, ray: &Ray, sampler: &mut Sampler) -> PathResult {
        let mut pending: FixedStack<Contribution, { MAX_PATH_DEPTH as usize }> = FixedStack::new();
        let mut ray = *ray;
        let mut depth = 0;

        let tail = loop {
            match self.step(&ray, depth, sampler) {
                Step::Terminate(color) => break color,
                Step::Continue {
                    ray: next,
                    contribution,
                } => {
                    if let Some(c) = contribution {
                        // One push per vertex and depth < max_depth <= capacity
                        if !pending.push(c) {
                            break Color::ZERO;
                        }
                    }
                    ray = next;
                    depth += 1;
                }
            }
        };

        let contributions = pending.len();
        let mut color = tail;
        while let Some(c) = pending.pop() {
            color = c.apply(color);
        }

        PathResult {
            color,
            contributions,
            depth,
        }
    }

    /// Shared per-vertex logic.
    fn step(&self, ray: &Ray, depth: u32, sampler: &mut Sampler) -> Step {
        if depth >= self.settings.max_depth {
            return Step::Terminate(Color::ZERO);
        }

        let Some(rec) = self.accel.nearest_hit(self.scene, ray) else {
            return Step::Terminate(self.background);
        };
        let material = &rec.material;

        let xi = sampler.next_f32();
        if material.reflectivity > 0.0 && xi <= material.reflectivity {
            return Step::Continue {
                ray: reflected_ray(&rec),
                contribution: None,
            };
        }
        if material.transparency > 0.0 && xi <= material.reflectivity + material.transparency {
            return Step::Continue {
                ray: refracted_ray(&rec),
                contribution: None,
            };
        }

        let direct = self.direct_lighting(&rec);
        let mut coefficient = material.diffuse;
        if depth > self.settings.minimum_depth {
            let p = self.settings.absorption;
            if sampler.next_f32() < p {
                return Step::Terminate(direct);
            }
            coefficient /= 1.0 - p;
        }

        // Cosine-weighted bounce: the albedo/pi BRDF times pi over the pdf
        let local = cosine_sample_hemisphere(sampler.next_2d());
        let direction = Onb::from_normal(rec.normal).to_world(local);
        let bounce = Ray::new(rec.position + rec.normal * SURFACE_BIAS, direction)
            .with_differentials(RayDifferentials {
                d_position: rec.d_position,
                d_direction: Differential::ZERO,
            });

        Step::Continue {
            ray: bounce,
            contribution: Some(Contribution {
                direct,
                coefficient,
            }),
        }
    }

    /// Unoccluded light from every point light at a diffuse vertex.
    pub fn direct_lighting(&self, rec: &ShadingRecord) -> Color {
        let origin = rec.position + rec.normal * SURFACE_BIAS;
        let brdf = rec.material.diffuse / PI;

        let mut total = Color::ZERO;
        for light in self.scene.lights() {
            let to_light = light.position - origin;
            let distance_squared = to_light.length_squared();
            if distance_squared <= 0.0 {
                continue;
            }
            let distance = distance_squared.sqrt();
            let l = to_light / distance;

            let cos_theta = rec.normal.dot(l);
            if cos_theta <= 0.0 {
                continue;
            }

            let shadow = Ray::with_range(origin, l, RAY_EPSILON, distance);
            if self.accel.any_hit(self.scene, &shadow) {
                continue;
            }

            total += light.radiance * brdf * cos_theta / distance_squared;
        }
        total
    }
}

/// Mirror bounce leaving on the incoming side.
fn reflected_ray(rec: &ShadingRecord) -> Ray {
    let d = rec.ray.direction;
    let n = rec.normal;
    let d_direction = differential::reflect(d, n, &rec.ray.differentials.d_direction, &rec.d_normal);
    Ray::new(rec.position + n * SURFACE_BIAS, differential::reflect_direction(d, n)).with_differentials(
        RayDifferentials {
            d_position: rec.d_position,
            d_direction,
        },
    )
}

/// Snell refraction, falling back to reflection on total internal reflection.
fn refracted_ray(rec: &ShadingRecord) -> Ray {
    let d = rec.ray.direction;
    let n = rec.normal;
    let eta = if rec.front_facing {
        1.0 / rec.material.ior
    } else {
        rec.material.ior
    };

    match differential::refract_direction(d, n, eta) {
        Some(t) => {
            let d_direction =
                differential::refract(d, n, t, eta, &rec.ray.differentials.d_direction, &rec.d_normal);
            Ray::new(rec.position - n * SURFACE_BIAS, t).with_differentials(RayDifferentials {
                d_position: rec.d_position,
                d_direction,
            })
        }
        None => reflected_ray(rec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{AccelSettings, AcceleratorKind};
    use lumen_core::{Light, Material, SceneBuilder, Sphere};
    use lumen_math::Vec3;

    fn lit_sphere(material: Material) -> Scene {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(material);
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, m));
        builder.add_light(Light::new(Vec3::new(0.0, 5.0, 0.0), Color::splat(50.0)));
        builder.build().unwrap()
    }

    fn bvh(scene: &Scene) -> Accelerator {
        Accelerator::build(scene, AcceleratorKind::Bvh, &AccelSettings::default()).unwrap()
    }

    #[test]
    fn test_direct_lighting_inverse_square() {
        let scene = lit_sphere(Material::diffuse(Color::ONE));
        let accel = bvh(&scene);
        let tracer = PathTracer::new(&scene, &accel, PathSettings::default());

        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let rec = accel.nearest_hit(&scene, &ray).unwrap();
        let direct = tracer.direct_lighting(&rec);

        let origin = rec.position + rec.normal * SURFACE_BIAS;
        let to_light = Vec3::new(0.0, 5.0, 0.0) - origin;
        let expected = 50.0 / PI * rec.normal.dot(to_light.normalize()) / to_light.length_squared();
        assert!((direct.x - expected).abs() < 1e-5);
        assert_eq!(direct.x, direct.y);
    }

    #[test]
    fn test_light_behind_surface_gives_nothing() {
        let mut builder = SceneBuilder::new();
        let m = builder.add_material(Material::diffuse(Color::ONE));
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, m));
        builder.add_light(Light::new(Vec3::new(0.0, 0.0, 10.0), Color::splat(50.0)));
        let scene = builder.build().unwrap();
        let accel = bvh(&scene);
        let tracer = PathTracer::new(&scene, &accel, PathSettings::default());

        let rec = accel.nearest_hit(&scene, &Ray::new(Vec3::ZERO, Vec3::Z)).unwrap();
        assert_eq!(tracer.direct_lighting(&rec), Color::ZERO);
    }

    #[test]
    fn test_recursive_matches_iterative_bitwise() {
        let scene = lit_sphere(Material::diffuse(Color::splat(0.8)));
        let accel = bvh(&scene);
        let tracer = PathTracer::new(&scene, &accel, PathSettings::default());

        for i in 0..64 {
            let dir = Vec3::new((i % 8) as f32 * 0.05 - 0.2, (i / 8) as f32 * 0.05 - 0.2, 1.0);
            let ray = Ray::new(Vec3::ZERO, dir);
            let a = tracer.trace_recursive(&ray, &mut Sampler::new(11, i, 0));
            let b = tracer.trace_iterative(&ray, &mut Sampler::new(11, i, 0));
            assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn test_mirror_sees_lit_sphere() {
        // A perfect mirror facing a diffuse sphere: the camera ray bounces
        // once and returns that sphere's direct light
        let mut builder = SceneBuilder::new();
        let mirror = builder.add_material(Material::mirror(Color::ZERO, 1.0));
        let white = builder.add_material(Material::diffuse(Color::ONE));
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, mirror));
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, white));
        builder.add_light(Light::new(Vec3::new(0.0, 0.0, 0.0), Color::splat(10.0)));
        let scene = builder.build().unwrap();
        let accel = bvh(&scene);
        let tracer = PathTracer::new(
            &scene,
            &accel,
            PathSettings {
                max_depth: 2,
                ..Default::default()
            },
        );

        let ray = Ray::new(Vec3::new(0.0, 0.0, 0.5), Vec3::Z);
        let result = tracer.trace_path(&ray, &mut Sampler::new(0, 0, 0));
        assert!(result.color.x > 0.0);
        assert_eq!(result.contributions, 1);
        assert_eq!(result.depth, 2);
    }

    #[test]
    fn test_max_depth_absorbs() {
        let scene = lit_sphere(Material::diffuse(Color::ONE));
        let accel = bvh(&scene);
        let tracer = PathTracer::new(
            &scene,
            &accel,
            PathSettings {
                max_depth: 0,
                ..Default::default()
            },
        );
        let result = tracer.trace_path(&Ray::new(Vec3::ZERO, Vec3::Z), &mut Sampler::new(0, 0, 0));
        assert_eq!(result.color, Color::ZERO);
        assert_eq!(result.contributions, 0);
    }

    #[test]
    fn test_max_depth_is_capped() {
        let scene = lit_sphere(Material::default());
        let accel = bvh(&scene);
        let tracer = PathTracer::new(
            &scene,
            &accel,
            PathSettings {
                max_depth: 10_000,
                ..Default::default()
            },
        );
        assert_eq!(tracer.settings().max_depth, MAX_PATH_DEPTH);
    }

    #[test]
    fn test_glass_sphere_transmits() {
        // Glass only: the path refracts in and out without deferring anything
        let mut builder = SceneBuilder::new();
        let glass = builder.add_material(Material::glass(1.5));
        builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, glass));
        let scene = builder.build().unwrap();
        let accel = bvh(&scene);
        let tracer = PathTracer::new(&scene, &accel, PathSettings::default())
            .with_background(Color::ONE);

        // Straight through the center: two refractions then out to the background
        let result = tracer.trace_path(&Ray::new(Vec3::ZERO, Vec3::Z), &mut Sampler::new(0, 0, 0));
        assert_eq!(result.color, Color::ONE);
        assert_eq!(result.depth, 2);
        assert_eq!(result.contributions, 0);
    }
}
