//! Built-in scene rendered when no description is given.

use anyhow::Result;
use lumen_core::{Light, Material, Mesh, Scene, SceneBuilder, Sphere};
use lumen_math::{Color, Vec3};
use lumen_renderer::Camera;

/// A room with colored walls, a diffuse, a mirror and a glass sphere.
pub fn scene() -> Result<Scene> {
    let mut builder = SceneBuilder::new();

    let white = builder.add_material(Material::diffuse(Color::splat(0.73)));
    let red = builder.add_material(Material::diffuse(Color::new(0.65, 0.05, 0.05)));
    let green = builder.add_material(Material::diffuse(Color::new(0.12, 0.45, 0.15)));
    let clay = builder.add_material(Material::diffuse(Color::new(0.8, 0.6, 0.3)));
    let mirror = builder.add_material(Material::mirror(Color::splat(0.9), 0.85));
    let glass = builder.add_material(Material::glass(1.5));

    let corner = |x: f32, y: f32, z: f32| Vec3::new(x * 2.0, y * 2.0 + 2.0, z * 2.0);

    // Floor, ceiling, back wall, left wall, right wall
    let walls = [
        ([(-1., -1., -1.), (1., -1., -1.), (1., -1., 1.), (-1., -1., 1.)], white),
        ([(-1., 1., -1.), (-1., 1., 1.), (1., 1., 1.), (1., 1., -1.)], white),
        ([(-1., -1., 1.), (1., -1., 1.), (1., 1., 1.), (-1., 1., 1.)], white),
        ([(-1., -1., -1.), (-1., -1., 1.), (-1., 1., 1.), (-1., 1., -1.)], red),
        ([(1., -1., -1.), (1., 1., -1.), (1., 1., 1.), (1., -1., 1.)], green),
    ];
    for (corners, material) in walls {
        builder.add_mesh(Mesh::quad(corners.map(|(x, y, z)| corner(x, y, z)), material));
    }

    builder.add_sphere(Sphere::new(Vec3::new(-0.9, 0.6, 0.8), 0.6, mirror));
    builder.add_sphere(Sphere::new(Vec3::new(0.9, 0.6, 0.1), 0.6, glass));
    builder.add_sphere(Sphere::new(Vec3::new(0.0, 0.35, -0.7), 0.35, clay));

    builder.add_light(Light::new(Vec3::new(0.0, 3.7, 0.0), Color::splat(12.0)));
    builder.add_light(Light::new(Vec3::new(0.0, 2.0, -3.5), Color::splat(3.0)));

    Ok(builder.build()?)
}

pub fn camera(width: u32, height: u32) -> Camera {
    Camera::new()
        .with_resolution(width, height)
        .with_position(Vec3::new(0.0, 2.0, -6.5), Vec3::new(0.0, 1.8, 0.0), Vec3::Y)
        .with_fov(40.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_builds() {
        let scene = scene().unwrap();
        assert_eq!(scene.spheres().len(), 3);
        assert_eq!(scene.triangles().len(), 10);
        assert_eq!(scene.lights().len(), 2);
    }
}
