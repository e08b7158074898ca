//! Example: Load and inspect a JSON scene description.
//!
//! Run with: cargo run --example inspect_scene -- scenes/cornell.json

use std::env;
use std::path::Path;

use lumen_core::SceneDescription;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_scene <path-to-scene-json>");
        return;
    }

    let path = Path::new(&args[1]);
    println!("Loading scene description: {}", path.display());

    let desc = match SceneDescription::from_file(path) {
        Ok(desc) => desc,
        Err(e) => {
            eprintln!("Failed to read scene: {}", e);
            std::process::exit(1);
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    match desc.to_scene(base_dir) {
        Ok(scene) => {
            println!("\n=== Scene ===");
            println!("Spheres: {}", scene.spheres().len());
            println!("Triangles: {}", scene.triangles().len());
            println!("Materials: {}", scene.materials().len());
            println!("Lights: {}", scene.lights().len());

            let bounds = scene.bounds();
            println!(
                "Bounds: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                bounds.x.min, bounds.y.min, bounds.z.min, bounds.x.max, bounds.y.max, bounds.z.max
            );

            println!("\n--- Meshes ---");
            for (i, mesh) in scene.meshes().iter().enumerate() {
                println!(
                    "  [{}] {} vertices, {} triangles, material {}",
                    i,
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    mesh.material.0
                );
            }

            println!("\n--- Spheres ---");
            for (i, sphere) in scene.spheres().iter().enumerate() {
                let c = sphere.center();
                println!(
                    "  [{}] center ({:.2}, {:.2}, {:.2}) radius {:.2}",
                    i, c.x, c.y, c.z, sphere.radius
                );
            }

            if let Some(camera) = &desc.camera {
                println!("\nCamera: {:?}", camera);
            }
        }
        Err(e) => {
            eprintln!("Invalid scene: {}", e);
            std::process::exit(1);
        }
    }
}
