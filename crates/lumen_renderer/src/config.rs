//! Render configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lumen_math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accel::{AccelError, AccelSettings, AcceleratorKind};
use crate::bucket::DEFAULT_BUCKET_SIZE;
use crate::integrator::PathSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("samples_per_pixel must be at least 1")]
    ZeroSamples,

    #[error("bucket_size must be at least 1")]
    ZeroBucketSize,

    #[error("Absorption probability {0} must lie in [0, 1)")]
    InvalidAbsorption(f32),

    #[error(transparent)]
    Accel(#[from] AccelError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// How pixels are dispatched to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    /// Buckets on the rayon pool, recursive integrator, shared accumulator
    #[default]
    Host,
    /// One work item per pixel, iterative integrator, no shared state
    Device,
}

impl Regime {
    pub fn name(self) -> &'static str {
        match self {
            Regime::Host => "host",
            Regime::Device => "device",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Regime::Host, Regime::Device]
            .into_iter()
            .find(|regime| regime.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown regime '{}' (expected host or device)", s))
    }
}

/// Everything a render needs besides the scene and camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    pub seed: u64,
    pub accelerator: AcceleratorKind,
    pub regime: Regime,
    /// Bucket edge in pixels (host regime only)
    pub bucket_size: u32,
    /// Radiance of rays that leave the scene
    pub background: Vec3,
    pub path: PathSettings,
    #[serde(flatten)]
    pub accel: AccelSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 16,
            seed: 0,
            accelerator: AcceleratorKind::default(),
            regime: Regime::default(),
            bucket_size: DEFAULT_BUCKET_SIZE,
            background: Vec3::ZERO,
            path: PathSettings::default(),
            accel: AccelSettings::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroBucketSize);
        }
        let p = self.path.absorption;
        if !(0.0..1.0).contains(&p) {
            return Err(ConfigError::InvalidAbsorption(p));
        }
        self.accel.validate()?;
        Ok(())
    }
}
