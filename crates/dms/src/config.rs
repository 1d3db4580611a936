//! DMS configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Sliding-window detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Window classifier model path (ONNX, input `[1, 1, H, W]`)
    pub model_path: Option<PathBuf>,

    /// Model window width/height in pixels
    pub window_width: u32,
    pub window_height: u32,

    /// Growth factor between pyramid scales (> 1.0)
    pub scale_factor: f64,

    /// A grouped detection needs strictly more raw hits than this
    pub min_neighbors: u32,

    /// Smallest detectable object in frame pixels
    pub min_width: u32,
    pub min_height: u32,

    /// Window stride in pixels at each pyramid level
    pub step: u32,

    /// Window score needed for a raw hit (inclusive)
    pub score_threshold: f32,

    /// Windows flatter than this pixel standard deviation are skipped
    pub min_stddev: f64,
}

impl DetectorParams {
    /// Frontal face defaults (scale 1.1, 5 neighbours, 80x80)
    pub fn face() -> Self {
        Self {
            model_path: None,
            window_width: 24,
            window_height: 24,
            scale_factor: 1.1,
            min_neighbors: 5,
            min_width: 80,
            min_height: 80,
            step: 2,
            score_threshold: 0.5,
            min_stddev: 8.0,
        }
    }

    /// Eye defaults (scale 1.1, 3 neighbours, 20x20)
    pub fn eye() -> Self {
        Self {
            window_width: 20,
            window_height: 20,
            min_neighbors: 3,
            min_width: 20,
            min_height: 20,
            ..Self::face()
        }
    }

    fn validate(&self, name: &str) -> Result<(), DmsError> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 1.0) {
            return Err(DmsError::Config(format!(
                "{name}.scale_factor must be > 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(DmsError::Config(format!("{name} window size must be non-zero")));
        }
        if self.step == 0 {
            return Err(DmsError::Config(format!("{name}.step must be non-zero")));
        }
        Ok(())
    }
}

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmsConfig {
    /// Trained eye-state classifier (ONNX, input `[1, size, size, 1]`).
    /// Missing or unloadable means heuristic mode.
    pub eye_model_path: Option<PathBuf>,

    /// Side length eye crops are resized to before inference
    pub eye_input_size: u32,

    /// Model score at or above which an eye is open
    pub open_score_threshold: f32,

    /// Mean intensity above which an eye is open (heuristic mode)
    pub heuristic_open_intensity: f64,

    /// Consecutive closed-eye frames before the session is drowsy
    pub closed_frames_threshold: u32,

    /// Minimum seconds between two alarms of one session
    pub alarm_cooldown_secs: f64,

    /// Eye regions evaluated per face
    pub max_eyes: usize,

    pub face_detector: DetectorParams,
    pub eye_detector: DetectorParams,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            eye_model_path: Some(PathBuf::from("models/eye_classifier.onnx")),
            eye_input_size: 64,
            open_score_threshold: 0.5,
            heuristic_open_intensity: fallback::DEFAULT_OPEN_INTENSITY,
            closed_frames_threshold: crate::DEFAULT_CLOSED_FRAMES_THRESHOLD,
            alarm_cooldown_secs: 5.0,
            max_eyes: 2,
            face_detector: DetectorParams::face(),
            eye_detector: DetectorParams::eye(),
        }
    }
}

impl DmsConfig {
    /// Reject values the state machine cannot work with
    pub fn validate(&self) -> Result<(), DmsError> {
        if self.closed_frames_threshold == 0 {
            return Err(DmsError::Config("closed_frames_threshold must be at least 1".into()));
        }
        if Duration::try_from_secs_f64(self.alarm_cooldown_secs).is_err() {
            return Err(DmsError::Config(format!(
                "alarm_cooldown_secs must be a non-negative number of seconds, got {}",
                self.alarm_cooldown_secs
            )));
        }
        if self.eye_input_size == 0 {
            return Err(DmsError::Config("eye_input_size must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.open_score_threshold) {
            return Err(DmsError::Config(format!(
                "open_score_threshold must be within [0, 1], got {}",
                self.open_score_threshold
            )));
        }
        if self.max_eyes == 0 {
            return Err(DmsError::Config("max_eyes must be at least 1".into()));
        }
        self.face_detector.validate("face_detector")?;
        self.eye_detector.validate("eye_detector")?;
        Ok(())
    }
}
