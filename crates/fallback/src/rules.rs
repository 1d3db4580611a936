//! Intensity rule for open/closed eyes
//!
//! An eye crop counts as open when its mean luma exceeds the threshold.
//! Much less accurate than the trained classifier.

use frame_decoder::GrayFrame;
use tracing::trace;

/// Default mean-intensity threshold. Open iff mean > threshold (exclusive).
pub const DEFAULT_OPEN_INTENSITY: f64 = 60.0;

/// Outcome of the intensity rule for one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicVote {
    pub open: bool,
    pub mean_intensity: f64,
}

/// Mean-intensity eye-state rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityHeuristic {
    open_above: f64,
}

impl Default for IntensityHeuristic {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_INTENSITY)
    }
}

impl IntensityHeuristic {
    pub fn new(open_above: f64) -> Self {
        Self { open_above }
    }

    pub fn threshold(&self) -> f64 {
        self.open_above
    }

    /// Evaluate the unresized eye crop. Returns `None` for an empty crop.
    pub fn evaluate(&self, eye: &GrayFrame) -> Option<HeuristicVote> {
        let mean_intensity = eye.mean_intensity()?;
        let open = mean_intensity > self.open_above;
        trace!("Heuristic eye vote: mean={:.1} open={}", mean_intensity, open);
        Some(HeuristicVote { open, mean_intensity })
    }
}
