//! Startup configuration for tiling, evaluation and display.
//!
//! Everything here is decided once before the frame loop starts; nothing in
//! the core mutates it afterwards.

use crate::Bounds;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which compute backend renders tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Blocking escape-time loop on the host.
    Cpu,
    /// Non-blocking compute dispatch writing straight into tile textures.
    #[default]
    Gpu,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Rendering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Side length of every tile texture, in texels.
    pub texture_resolution: u32,
    /// A tile visible on screen splits once one of its texels covers more
    /// than this many screen pixels.
    pub split_threshold: f64,
    /// Iteration budget of the root tile, inherited by all descendants.
    pub max_iterations: f64,
    /// Fractal-space region covered by the root tile.
    pub initial_bounds: Bounds,
    /// Initial display cutoff; values above it draw as background.
    pub cutoff: f64,
    /// Escape values per full cycle of the colour ramp.
    pub color_period: f32,
    pub background: [u8; 3],
    pub backend: BackendKind,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            texture_resolution: 4096,
            split_threshold: 0.5,
            max_iterations: 1024.0,
            initial_bounds: Bounds {
                left: -2.0,
                right: 2.0,
                top: -2.0,
                bottom: 2.0,
                max_iterations: 1024.0,
            },
            cutoff: 1023.0,
            color_period: 32.0,
            background: [0, 0, 0],
            backend: BackendKind::Gpu,
        }
    }
}

impl RenderConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        log::debug!(
            "config: {0}x{0} textures, {1:?} backend, max_iterations {2}",
            config.texture_resolution,
            config.backend,
            config.max_iterations
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.texture_resolution == 0 {
            return Err(ConfigError::Invalid(
                "texture_resolution must be > 0".into(),
            ));
        }
        if !(self.split_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "split_threshold must be > 0, got {}",
                self.split_threshold
            )));
        }
        if !(self.max_iterations >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "max_iterations must be >= 1, got {}",
                self.max_iterations
            )));
        }
        if !self.initial_bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "initial_bounds must satisfy left < right and top < bottom, got {:?}",
                self.initial_bounds
            )));
        }
        if !(self.color_period > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "color_period must be > 0, got {}",
                self.color_period
            )));
        }
        Ok(())
    }

    /// Root tile bounds with the configured iteration budget applied.
    pub fn root_bounds(&self) -> Bounds {
        Bounds {
            max_iterations: self.max_iterations,
            ..self.initial_bounds
        }
    }
}
