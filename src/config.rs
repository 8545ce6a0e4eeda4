//! Configuration loading.
//!
//! Configuration is read from a TOML file. Resolution order:
//! 1. `--config <path>` (CLI flag, must exist)
//! 2. `parasite-detector.toml` in the working directory
//! 3. built-in defaults
//!
//! Every field has a default, so a partial file is fine.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classes::ClassSet;
use crate::error::{DetectorError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "parasite-detector.toml";

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080).
    #[serde(default = "default_address")]
    pub address: String,
    /// Largest accepted upload in bytes (default: 10 MB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Memory layout of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, height, width, 3]`
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Pixel / 255.
    #[default]
    Unit,
    /// Per-channel ImageNet mean and standard deviation.
    Imagenet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Nearest-neighbour resize straight to the input size.
    #[default]
    Stretch,
    /// Aspect-preserving resize, padded to a square.
    Letterbox,
}

/// Model file and input tensor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Set to false to always run in simulation mode.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Square input edge in pixels (default: 224).
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default)]
    pub layout: TensorLayout,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default)]
    pub resize: ResizeMode,
    /// Output index order, five labels.
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_model_path(),
            input_size: default_input_size(),
            layout: TensorLayout::default(),
            normalization: Normalization::default(),
            resize: ResizeMode::default(),
            classes: default_classes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/model.onnx")
}

fn default_input_size() -> u32 {
    224
}

fn default_classes() -> Vec<String> {
    ClassSet::default().names()
}

/// Simulation fallback settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Artificial latency before a simulated result (default: 1000 ms).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f32,
    /// Fixed RNG seed, mainly for reproducible demos.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            min_confidence: default_min_confidence(),
            max_confidence: default_max_confidence(),
            seed: None,
        }
    }
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_min_confidence() -> f32 {
    60.0
}

fn default_max_confidence() -> f32 {
    90.0
}

impl Config {
    /// Load configuration from an explicit path or the standard location.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                return Err(DetectorError::Configuration(format!(
                    "Config file not found: {path:?}"
                )));
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };

        let content = fs::read_to_string(&path).map_err(|e| {
            DetectorError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            DetectorError::Configuration(msg) => {
                DetectorError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DetectorError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(DetectorError::Configuration(
                "server.max_upload_bytes must be positive".into(),
            ));
        }
        if self.model.input_size == 0 {
            return Err(DetectorError::Configuration(
                "model.input_size must be positive".into(),
            ));
        }
        let sim = &self.simulation;
        if !(0.0..=100.0).contains(&sim.min_confidence)
            || !(0.0..=100.0).contains(&sim.max_confidence)
            || sim.min_confidence >= sim.max_confidence
        {
            return Err(DetectorError::Configuration(format!(
                "simulation confidence range [{}, {}) is invalid",
                sim.min_confidence, sim.max_confidence
            )));
        }
        self.class_set().map(|_| ())
    }

    pub fn class_set(&self) -> Result<ClassSet> {
        ClassSet::from_names(&self.model.classes)
    }
}
