//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness analysis for a stream of webcam frames:
//! - Face and eye localization (pluggable region locator)
//! - Eye open/closed classification (trained model or intensity fallback)
//! - Per-session consecutive-closed-frame tracking
//! - Edge-triggered drowsiness alarms with a cooldown

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod engine;
pub mod pipeline;
pub mod state;

pub use analysis::{FrameEvidence, FrameVerdict};
pub use classifier::{ClassifierMode, EyeObservation, EyeStateClassifier, OPEN_SCORE_THRESHOLD};
pub use config::{DetectorParams, DmsConfig};
pub use detector::{CascadeLocator, NullLocator, RegionLocator, WindowDetector};
pub use engine::{all_eyes_closed, DrowsinessEngine, DEFAULT_CLOSED_FRAMES_THRESHOLD};
pub use pipeline::DmsPipeline;
pub use state::SessionState;

use frame_decoder::DecodeError;
use inference_engine::InferenceError;
use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Frame decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Model error: {0}")]
    Model(#[from] InferenceError),

    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    #[error("Eye inference failed: {0}")]
    Inference(String),

    #[error("Region detection failed: {0}")]
    Detection(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
