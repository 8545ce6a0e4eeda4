use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How predictions are being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceMode {
    Model,
    Simulation,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassScore {
    pub class_name: String,
    pub percent: f32,
}

/// Outcome of one analysis request.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub request_id: Uuid,
    pub predicted_class_index: usize,
    pub class_name: String,
    pub confidence_percent: f32,
    pub is_simulated: bool,
    pub timestamp: String,
    /// Per-class breakdown, empty for simulated results.
    #[serde(default)]
    pub scores: Vec<ClassScore>,
}

/// Reported by `GET /status`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub mode: InferenceMode,
    pub model_path: String,
    pub error: Option<String>,
    pub classes: Vec<String>,
}
