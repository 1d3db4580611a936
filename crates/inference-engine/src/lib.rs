//! ONNX Inference Engine
//!
//! Runs single-output binary classifiers (eye open/closed, face/eye
//! window detectors) on grayscale frames using tract-onnx.

mod engine;

pub use engine::{BinaryClassifier, InferenceResult, InputLayout, OnnxClassifier};

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
}
