//! Classifiers: a tract-onnx model and the simulation fallback.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classes::{ClassSet, CLASS_COUNT};
use crate::config::{Config, SimulationConfig};
use crate::error::{DetectorError, Result};
use crate::models::{InferenceMode, ModelStatus, PredictionResult};
use crate::prediction::{self, round2};
use crate::preprocess::Preprocessor;
use crate::validation::ImageKind;

/// Produces a prediction for one decoded-and-validated upload.
///
/// Implementations are shared across workers and must not need `&mut self`.
pub trait Classifier: Send + Sync {
    fn mode(&self) -> InferenceMode;

    fn classify(&self, bytes: &[u8], kind: Option<ImageKind>) -> Result<PredictionResult>;

    /// Latency to wait before answering, awaited outside the blocking pool.
    fn delay(&self) -> Duration {
        Duration::ZERO
    }
}

type Plan = TypedRunnableModel<TypedModel>;

/// Real inference against an ONNX model.
pub struct OnnxClassifier {
    plan: Plan,
    preprocessor: Preprocessor,
    classes: ClassSet,
}

fn model_err(stage: &str) -> impl Fn(TractError) -> DetectorError + '_ {
    move |e| DetectorError::Model(format!("{stage}: {e}"))
}

impl OnnxClassifier {
    /// Load, optimise and warm up the model. Fails if the model does not
    /// produce exactly one score per class.
    pub fn load(path: &Path, preprocessor: Preprocessor, classes: ClassSet) -> Result<Self> {
        if !path.exists() {
            return Err(DetectorError::Model(format!("model file not found: {path:?}")));
        }
        let shape = preprocessor.input_shape();

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(model_err("parse"))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
            .map_err(model_err("input fact"))?
            .into_optimized()
            .map_err(model_err("optimize"))?
            .into_runnable()
            .map_err(model_err("runnable"))?;

        let classifier = Self {
            plan,
            preprocessor,
            classes,
        };
        classifier.warm_up()?;
        info!(path = %path.display(), input_shape = ?shape, "model loaded");
        Ok(classifier)
    }

    // One pass over an all-zeros tensor; checks the output width.
    fn warm_up(&self) -> Result<()> {
        let shape = self.preprocessor.input_shape();
        let zeros = Tensor::zero::<f32>(&shape).map_err(model_err("warm-up tensor"))?;
        let scores = self.run(zeros).map_err(|e| match e {
            DetectorError::Inference(msg) => DetectorError::Model(format!("warm-up: {msg}")),
            other => other,
        })?;
        debug!(outputs = scores.len(), "warm-up pass complete");
        if scores.len() != CLASS_COUNT {
            return Err(DetectorError::Model(format!(
                "model has {} outputs, expected {CLASS_COUNT}",
                scores.len()
            )));
        }
        Ok(())
    }

    fn run(&self, input: Tensor) -> Result<Vec<f32>> {
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let first = outputs
            .first()
            .ok_or_else(|| DetectorError::Inference("model produced no outputs".into()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

impl Classifier for OnnxClassifier {
    fn mode(&self) -> InferenceMode {
        InferenceMode::Model
    }

    fn classify(&self, bytes: &[u8], kind: Option<ImageKind>) -> Result<PredictionResult> {
        let input = self.preprocessor.prepare(bytes, kind)?;
        let shape = input.shape().to_vec();
        let data = input.into_raw_vec();
        let tensor = Tensor::from_shape(&shape, &data)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let scores = self.run(tensor)?;
        let result = prediction::from_scores(&scores, &self.classes)?;
        debug!(
            class = %result.class_name,
            confidence = result.confidence_percent,
            "model prediction"
        );
        Ok(result)
    }
}

/// Random but plausible results for when no model is available.
pub struct Simulator {
    rng: Mutex<SmallRng>,
    classes: ClassSet,
    min_confidence: f32,
    max_confidence: f32,
    delay: Duration,
}

impl Simulator {
    pub fn new(config: &SimulationConfig, classes: ClassSet) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
            classes,
            min_confidence: config.min_confidence,
            max_confidence: config.max_confidence,
            delay: Duration::from_millis(config.delay_ms),
        }
    }

    pub fn simulate(&self) -> Result<PredictionResult> {
        let (index, raw_confidence) = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| DetectorError::Inference("simulator RNG poisoned".into()))?;
            (
                rng.random_range(0..self.classes.len()),
                rng.random_range(self.min_confidence..self.max_confidence),
            )
        };
        let label = self
            .classes
            .label(index)
            .ok_or_else(|| DetectorError::Inference(format!("no label for class index {index}")))?;
        // Rounding may land exactly on the upper bound; keep the range half-open.
        let mut confidence = round2(raw_confidence);
        if confidence >= self.max_confidence {
            confidence = (self.max_confidence - 0.01).max(self.min_confidence);
        }

        Ok(PredictionResult {
            request_id: Uuid::new_v4(),
            predicted_class_index: index,
            class_name: label.name().to_string(),
            confidence_percent: confidence,
            is_simulated: true,
            timestamp: prediction::timestamp(),
            scores: Vec::new(),
        })
    }
}

impl Classifier for Simulator {
    fn mode(&self) -> InferenceMode {
        InferenceMode::Simulation
    }

    fn classify(&self, _bytes: &[u8], _kind: Option<ImageKind>) -> Result<PredictionResult> {
        self.simulate()
    }

    fn delay(&self) -> Duration {
        self.delay
    }
}

/// Try the configured model and fall back to simulation on any failure.
pub fn load_classifier(
    config: &Config,
    force_simulation: bool,
) -> Result<(Arc<dyn Classifier>, ModelStatus)> {
    let classes = config.class_set()?;
    let model_path = config.model.path.display().to_string();

    let attempt = if force_simulation || !config.model.enabled {
        Err(DetectorError::Model("model disabled, simulation forced".into()))
    } else {
        OnnxClassifier::load(
            &config.model.path,
            Preprocessor::from_config(&config.model),
            classes.clone(),
        )
    };

    let (classifier, error): (Arc<dyn Classifier>, Option<String>) = match attempt {
        Ok(model) => (Arc::new(model), None),
        Err(e) => {
            warn!(error = %e, "model unavailable, using simulation mode");
            (
                Arc::new(Simulator::new(&config.simulation, classes.clone())),
                Some(e.to_string()),
            )
        }
    };

    let status = ModelStatus {
        mode: classifier.mode(),
        model_path,
        error,
        classes: classes.names(),
    };
    Ok((classifier, status))
}
