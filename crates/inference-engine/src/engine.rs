//! Inference Engine Implementation

use std::path::Path;
use std::time::Instant;

use frame_decoder::GrayFrame;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::InferenceError;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tensor layout expected by the model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, H, W, 1]` (Keras exports)
    Nhwc,
    /// `[1, 1, H, W]` (PyTorch exports)
    Nchw,
}

impl InputLayout {
    fn shape(&self, width: usize, height: usize) -> [usize; 4] {
        match self {
            InputLayout::Nhwc => [1, height, width, 1],
            InputLayout::Nchw => [1, 1, height, width],
        }
    }
}

/// Result of a single inference
#[derive(Debug, Clone, Copy)]
pub struct InferenceResult {
    /// Model output (probability of the positive class)
    pub score: f32,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

/// A model that maps a fixed-size grayscale frame to one score in [0, 1]
pub trait BinaryClassifier: Send + Sync {
    /// Required (width, height) of the input frame
    fn input_size(&self) -> (u32, u32);

    /// Score a frame that already has `input_size()` dimensions
    fn predict(&self, input: &GrayFrame) -> Result<InferenceResult, InferenceError>;
}

/// ONNX classifier with a single grayscale input and a single scalar output
pub struct OnnxClassifier {
    plan: Plan,
    width: u32,
    height: u32,
    layout: InputLayout,
    model_path: String,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX model for a fixed input size
    pub fn load(
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
        layout: InputLayout,
    ) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let model_path = path.display().to_string();
        if !path.is_file() {
            return Err(InferenceError::ModelNotFound(model_path));
        }

        info!("Loading ONNX model from {} ({}x{}, {:?})", model_path, width, height, layout);

        let shape = layout.shape(width as usize, height as usize);
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", model_path, e)))?;

        Ok(Self {
            plan,
            width,
            height,
            layout,
            model_path,
        })
    }

    /// Get model path
    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    fn input_tensor(&self, input: &GrayFrame) -> Result<Tensor, InferenceError> {
        let shape = self.layout.shape(self.width as usize, self.height as usize);
        tract_ndarray::Array4::from_shape_vec(shape, input.normalized())
            .map(Tensor::from)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))
    }
}

impl BinaryClassifier for OnnxClassifier {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn predict(&self, input: &GrayFrame) -> Result<InferenceResult, InferenceError> {
        if (input.width, input.height) != (self.width, self.height) {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{}x{}", self.width, self.height),
                actual: format!("{}x{}", input.width, input.height),
            });
        }

        let start = Instant::now();
        let tensor = self.input_tensor(input)?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::InferenceFailed("model produced no outputs".into()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let score = view
            .iter()
            .next()
            .copied()
            .ok_or_else(|| InferenceError::InferenceFailed("empty output tensor".into()))?;

        let latency_us = start.elapsed().as_micros() as u64;
        debug!("Inference completed in {}us (score={:.3})", latency_us, score);

        Ok(InferenceResult { score, latency_us })
    }
}
