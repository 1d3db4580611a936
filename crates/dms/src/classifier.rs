//! Eye-state classification strategies

use fallback::IntensityHeuristic;
use frame_decoder::GrayFrame;
use inference_engine::{BinaryClassifier, InputLayout, OnnxClassifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{DmsConfig, DmsError};

/// Default model decision boundary. Open iff score >= threshold (inclusive).
pub const OPEN_SCORE_THRESHOLD: f32 = 0.5;

/// Which strategy produced the eye votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Trained classifier
    Model,
    /// Mean-intensity fallback
    Heuristic,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierMode::Model => "model",
            ClassifierMode::Heuristic => "heuristic",
        }
    }
}

/// Open/closed vote for one eye region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeObservation {
    pub open: bool,
    /// Model probability in model mode, mean intensity in heuristic mode
    pub score: f32,
}

impl EyeObservation {
    pub fn open(score: f32) -> Self {
        Self { open: true, score }
    }

    pub fn closed(score: f32) -> Self {
        Self { open: false, score }
    }
}

/// Eye-state strategy, chosen once at startup
pub enum EyeStateClassifier {
    Model {
        model: Box<dyn BinaryClassifier>,
        open_threshold: f32,
    },
    Heuristic(IntensityHeuristic),
}

impl EyeStateClassifier {
    pub fn model(model: Box<dyn BinaryClassifier>, open_threshold: f32) -> Self {
        EyeStateClassifier::Model { model, open_threshold }
    }

    pub fn heuristic(rule: IntensityHeuristic) -> Self {
        EyeStateClassifier::Heuristic(rule)
    }

    /// Load the trained classifier, or fall back to the heuristic when the
    /// artifact is missing or cannot be loaded
    pub fn from_config(config: &DmsConfig) -> Self {
        match Self::load_model(config) {
            Ok(classifier) => {
                info!("Eye-state classifier mode: model");
                classifier
            }
            Err(e) => {
                let rule = IntensityHeuristic::new(config.heuristic_open_intensity);
                warn!(
                    "{}. Eye-state classifier mode: heuristic (mean intensity > {})",
                    e,
                    rule.threshold()
                );
                Self::heuristic(rule)
            }
        }
    }

    fn load_model(config: &DmsConfig) -> Result<Self, DmsError> {
        let path = config
            .eye_model_path
            .as_ref()
            .ok_or_else(|| DmsError::ClassifierUnavailable("no eye model path configured".into()))?;

        let size = config.eye_input_size;
        let model = OnnxClassifier::load(path, size, size, InputLayout::Nhwc)
            .map_err(|e| DmsError::ClassifierUnavailable(e.to_string()))?;

        Ok(Self::model(Box::new(model), config.open_score_threshold))
    }

    pub fn mode(&self) -> ClassifierMode {
        match self {
            EyeStateClassifier::Model { .. } => ClassifierMode::Model,
            EyeStateClassifier::Heuristic(_) => ClassifierMode::Heuristic,
        }
    }

    /// Classify one eye crop.
    ///
    /// Errors mean the eye has no vote; callers skip it rather than count it
    /// as closed.
    pub fn observe(&self, eye: &GrayFrame) -> Result<EyeObservation, DmsError> {
        match self {
            EyeStateClassifier::Model { model, open_threshold } => {
                let (w, h) = model.input_size();
                let input = eye.resize(w, h).ok_or_else(|| {
                    DmsError::Inference(format!(
                        "cannot resize {}x{} eye region",
                        eye.width, eye.height
                    ))
                })?;
                let result = model.predict(&input)?;
                debug!("Eye score {:.3} ({}us)", result.score, result.latency_us);

                Ok(EyeObservation {
                    open: result.score >= *open_threshold,
                    score: result.score,
                })
            }
            EyeStateClassifier::Heuristic(rule) => {
                let vote = rule
                    .evaluate(eye)
                    .ok_or_else(|| DmsError::Inference("empty eye region".into()))?;

                Ok(EyeObservation {
                    open: vote.open,
                    score: vote.mean_intensity as f32,
                })
            }
        }
    }
}
