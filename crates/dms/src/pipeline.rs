//! Frame → eye votes pipeline

use frame_decoder::{decode_data_uri, GrayFrame};
use tracing::debug;

use crate::analysis::FrameEvidence;
use crate::classifier::{ClassifierMode, EyeStateClassifier};
use crate::config::DmsConfig;
use crate::detector::{CascadeLocator, RegionLocator};
use crate::DmsError;

/// Decoding, localization and eye classification for single frames.
///
/// Stateless across frames; session state lives with the decision engine.
pub struct DmsPipeline {
    locator: Box<dyn RegionLocator>,
    classifier: EyeStateClassifier,
    max_eyes: usize,
}

impl DmsPipeline {
    pub fn new(
        locator: Box<dyn RegionLocator>,
        classifier: EyeStateClassifier,
        max_eyes: usize,
    ) -> Self {
        Self {
            locator,
            classifier,
            max_eyes,
        }
    }

    /// Build the pipeline, degrading to the null locator and the heuristic
    /// classifier when model artifacts are unavailable
    pub fn from_config(config: &DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self::new(
            CascadeLocator::load_or_disabled(config),
            EyeStateClassifier::from_config(config),
            config.max_eyes,
        ))
    }

    pub fn classifier_mode(&self) -> ClassifierMode {
        self.classifier.mode()
    }

    pub fn locator_kind(&self) -> &'static str {
        self.locator.kind()
    }

    /// Decode a data-URI frame and analyze it
    pub fn analyze_payload(&self, payload: &str) -> Result<FrameEvidence, DmsError> {
        let frame = decode_data_uri(payload)?;
        self.analyze(&frame)
    }

    /// Collect eye votes for the first face and its first `max_eyes` eyes.
    ///
    /// Locator failures abort the frame. A face or eye that cannot be cropped
    /// or classified just contributes no vote.
    pub fn analyze(&self, frame: &GrayFrame) -> Result<FrameEvidence, DmsError> {
        let faces = self.locator.detect_faces(frame)?;
        let Some(face_region) = faces.first().copied() else {
            debug!("No face in {}x{} frame", frame.width, frame.height);
            return Ok(FrameEvidence::none());
        };

        let mut evidence = FrameEvidence {
            face: Some(face_region),
            ..Default::default()
        };

        let Some(face) = frame.crop(&face_region) else {
            debug!("Face region {:?} lies outside the frame", face_region);
            return Ok(evidence);
        };

        let eyes = self.locator.detect_eyes(&face)?;
        for eye_region in eyes.iter().take(self.max_eyes) {
            evidence.eyes.push(face_region.to_parent(eye_region));

            let Some(eye) = face.crop(eye_region) else {
                debug!("Eye region {:?} lies outside the face", eye_region);
                continue;
            };

            match self.classifier.observe(&eye) {
                Ok(vote) => evidence.votes.push(vote),
                Err(e) => debug!("Skipping eye vote: {}", e),
            }
        }

        debug!(
            "Face at {:?}: {} eye(s) found, {} vote(s) [{}]",
            face_region,
            eyes.len(),
            evidence.votes.len(),
            self.classifier.mode().as_str()
        );
        Ok(evidence)
    }
}
