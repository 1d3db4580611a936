//! Per-frame evidence and verdicts

use frame_decoder::Region;
use serde::{Deserialize, Serialize};

use crate::classifier::EyeObservation;

/// Decision bundle sent to the client for each processed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameVerdict {
    /// Closed streak has reached the drowsiness threshold
    pub drowsy: bool,

    /// Current consecutive closed-eye frame count
    pub closed_frames: u32,

    /// An alarm fired on this frame
    pub alarm: bool,
}

/// What the eye-state pipeline saw in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameEvidence {
    /// The evaluated face, if any
    pub face: Option<Region>,

    /// Evaluated eye regions in frame coordinates
    pub eyes: Vec<Region>,

    /// One vote per eye that could be classified
    pub votes: Vec<EyeObservation>,
}

impl FrameEvidence {
    /// Frame with nothing to say about the eyes
    pub fn none() -> Self {
        Self::default()
    }

    pub fn face_detected(&self) -> bool {
        self.face.is_some()
    }

    pub fn has_votes(&self) -> bool {
        !self.votes.is_empty()
    }
}
