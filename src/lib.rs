//! Parasite image classifier service.
//!
//! Uploaded microscopy images are classified into one of five parasite
//! categories by an ONNX model, or by a random simulator when no model
//! is available.

pub mod classes;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod models;
pub mod prediction;
pub mod preprocess;
pub mod render;
pub mod validation;

pub use classes::{ClassLabel, ClassSet};
pub use config::Config;
pub use error::{DetectorError, Result};
pub use handlers::{configure, AppState};
pub use inference::{load_classifier, Classifier, OnnxClassifier, Simulator};
pub use models::{InferenceMode, ModelStatus, PredictionResult};
