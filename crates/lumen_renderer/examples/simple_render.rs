//! Simple path tracer example.
//!
//! Renders a box with a mirror ball and a glass ball and saves to PPM format.
//!
//! Run with: cargo run --release --example simple_render -- [list|grid|octree|bvh]

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::atomic::AtomicBool;

use lumen_core::{Light, Material, Mesh, Scene, SceneBuilder, SceneResult, Sphere};
use lumen_renderer::{render, Camera, Color, ImageBuffer, RenderConfig, Vec3};

fn main() {
    env_logger::init();

    println!("Lumen Path Tracer - Simple Example");
    println!("==================================");

    let start = std::time::Instant::now();
    let scene = match build_scene() {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("Failed to build scene: {}", e);
            std::process::exit(1);
        }
    };
    println!("Scene built in {:?} ({} primitives)", start.elapsed(), scene.primitive_count());

    let camera = Camera::new()
        .with_resolution(400, 400)
        .with_position(Vec3::new(0.0, 1.0, -3.4), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_fov(45.0);

    let mut config = RenderConfig {
        samples_per_pixel: 32,
        ..Default::default()
    };
    if let Some(arg) = env::args().nth(1) {
        match arg.parse() {
            Ok(kind) => config.accelerator = kind,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    println!(
        "Rendering {}x{} @ {} spp with {}...",
        camera.image_width, camera.image_height, config.samples_per_pixel, config.accelerator
    );

    let start = std::time::Instant::now();
    let image = match render(&scene, &camera, &config, &AtomicBool::new(false)) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Render failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("Rendered in {:?}", start.elapsed());

    let filename = "output.ppm";
    if let Err(e) = save_ppm(&image, filename) {
        eprintln!("Failed to save image: {}", e);
        std::process::exit(1);
    }
    println!("Saved to {}", filename);
}

fn build_scene() -> SceneResult<Scene> {
    let mut builder = SceneBuilder::new();

    let white = builder.add_material(Material::diffuse(Color::splat(0.73)));
    let red = builder.add_material(Material::diffuse(Color::new(0.65, 0.05, 0.05)));
    let green = builder.add_material(Material::diffuse(Color::new(0.12, 0.45, 0.15)));
    let mirror = builder.add_material(Material::mirror(Color::splat(0.8), 0.9));
    let glass = builder.add_material(Material::glass(1.5));

    let (lo, hi) = (-1.0, 1.0);
    let p = |x: f32, y: f32, z: f32| Vec3::new(x, y + 1.0, z);

    // Floor, ceiling, back, left and right walls
    builder.add_mesh(Mesh::quad([p(lo, lo, lo), p(hi, lo, lo), p(hi, lo, hi), p(lo, lo, hi)], white));
    builder.add_mesh(Mesh::quad([p(lo, hi, lo), p(lo, hi, hi), p(hi, hi, hi), p(hi, hi, lo)], white));
    builder.add_mesh(Mesh::quad([p(lo, lo, hi), p(hi, lo, hi), p(hi, hi, hi), p(lo, hi, hi)], white));
    builder.add_mesh(Mesh::quad([p(lo, lo, lo), p(lo, lo, hi), p(lo, hi, hi), p(lo, hi, lo)], red));
    builder.add_mesh(Mesh::quad([p(hi, lo, lo), p(hi, hi, lo), p(hi, hi, hi), p(hi, lo, hi)], green));

    builder.add_sphere(Sphere::new(Vec3::new(-0.45, 0.35, 0.4), 0.35, mirror));
    builder.add_sphere(Sphere::new(Vec3::new(0.45, 0.35, -0.1), 0.35, glass));

    builder.add_light(Light::new(Vec3::new(0.0, 1.85, 0.0), Color::splat(4.0)));

    builder.build()
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for rgba in image.to_rgba().chunks_exact(4) {
        writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
    }

    writer.flush()
}
