mod cli;
mod demo;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use lumen_core::SceneDescription;
use lumen_renderer::{render, Camera, ImageBuffer, RenderConfig};

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let mut config = match &args.config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("Failed to load render config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid render settings")?;

    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let start = Instant::now();
    let (scene, camera) = match &args.scene {
        Some(path) => {
            let desc = SceneDescription::from_file(path)
                .with_context(|| format!("Failed to read scene {}", path.display()))?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let scene = desc
                .to_scene(base_dir)
                .with_context(|| format!("Invalid scene {}", path.display()))?;
            let camera = Camera::from_description(&desc.camera.unwrap_or_default(), args.width, args.height);
            (scene, camera)
        }
        None => {
            log::info!("No scene given, rendering the built-in demo");
            (demo::scene()?, demo::camera(args.width, args.height))
        }
    };
    log::info!(
        "Scene ready in {:?}: {} spheres, {} triangles, {} lights",
        start.elapsed(),
        scene.spheres().len(),
        scene.triangles().len(),
        scene.lights().len()
    );

    let cancel = AtomicBool::new(false);
    let image = render(&scene, &camera, &config, &cancel).context("Render failed")?;

    save_png(&image, &args.output)?;
    log::info!("Saved {}", args.output.display());
    Ok(())
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level {
        builder.filter_level(level.into());
    }
    builder.init();
}

fn save_png(image: &ImageBuffer, path: &Path) -> Result<()> {
    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .context("Image buffer does not match its dimensions")?;
    rgba.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
