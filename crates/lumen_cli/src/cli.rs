use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lumen_renderer::{AcceleratorKind, Regime, RenderConfig};

/// Log levels selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Render a JSON scene (or the built-in demo) to a PNG.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "Path tracer with interchangeable acceleration structures")]
pub struct Args {
    /// JSON scene description; renders the built-in demo when omitted
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// JSON render config; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, default_value = "output.png")]
    pub output: PathBuf,

    /// Image width in pixels
    #[arg(long, default_value = "640")]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value = "480")]
    pub height: u32,

    /// Samples per pixel
    #[arg(short, long)]
    pub samples: Option<u32>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Acceleration structure: list, grid, octree or bvh
    #[arg(short, long)]
    pub accelerator: Option<AcceleratorKind>,

    /// Execution regime: host or device
    #[arg(short, long)]
    pub regime: Option<Regime>,

    /// Log level; falls back to RUST_LOG, then info
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Print the effective render config as JSON and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Args {
    /// Apply command line overrides on top of a loaded config.
    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(samples) = self.samples {
            config.samples_per_pixel = samples;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(kind) = self.accelerator {
            config.accelerator = kind;
        }
        if let Some(regime) = self.regime {
            config.regime = regime;
        }
    }
}
