//! Per-connection frame handling
//!
//! One `FrameSession` exists per WebSocket connection and processes that
//! connection's frames strictly in arrival order, which is what keeps each
//! session's state single-writer.

use std::sync::Arc;
use std::time::Instant;

use dms::FrameVerdict;
use metrics::{counter, gauge, histogram};
use session_store::{ConnectionId, StoreError};
use tracing::{debug, info, warn};

use crate::protocol::{ClientEvent, FramePayload, ServerEvent};
use crate::telemetry::{ACTIVE_SESSIONS, ALARMS_TOTAL, FRAMES_TOTAL, FRAME_SECONDS};
use crate::AppState;

/// Frame handler bound to one connection
pub struct FrameSession {
    id: ConnectionId,
    state: Arc<AppState>,
}

impl FrameSession {
    /// Register a new connection
    pub fn open(state: Arc<AppState>) -> Result<Self, StoreError> {
        let id = ConnectionId::new();
        state.sessions.open(id)?;
        gauge!(ACTIVE_SESSIONS).set(state.sessions.len()? as f64);
        info!("Client connected: {}", id);
        Ok(Self { id, state })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Handle one inbound text message. `None` means nothing to send back.
    pub async fn handle_text(&self, text: &str) -> Option<ServerEvent> {
        match ClientEvent::parse(text) {
            Ok(ClientEvent::Frame(payload)) => {
                self.handle_frame(payload).await.map(ServerEvent::Drowsiness)
            }
            Err(e) => {
                debug!("Ignoring message from {}: {}", self.id, e);
                None
            }
        }
    }

    /// Run one frame through the pipeline and the session state machine.
    ///
    /// Empty payloads, undecodable images and locator failures produce no
    /// verdict and leave the session untouched.
    pub async fn handle_frame(&self, payload: FramePayload) -> Option<FrameVerdict> {
        let arrived = Instant::now();

        let Some(image) = payload.image.filter(|image| !image.is_empty()) else {
            counter!(FRAMES_TOTAL, "outcome" => "ignored").increment(1);
            return None;
        };

        let pipeline = self.state.pipeline.clone();
        let task = tokio::task::spawn_blocking(move || pipeline.analyze_payload(&image));
        let evidence = match task.await {
            Ok(Ok(evidence)) => evidence,
            Ok(Err(e)) => {
                debug!("Dropping frame from {}: {}", self.id, e);
                counter!(FRAMES_TOTAL, "outcome" => "dropped").increment(1);
                return None;
            }
            Err(e) => {
                warn!("Frame task for {} failed: {}", self.id, e);
                counter!(FRAMES_TOTAL, "outcome" => "dropped").increment(1);
                return None;
            }
        };

        let engine = self.state.engine;
        let sessions = &self.state.sessions;
        let verdict = match sessions.update(self.id, |s| engine.step(s, &evidence.votes, arrived)) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Session {} unavailable: {}", self.id, e);
                return None;
            }
        };

        counter!(FRAMES_TOTAL, "outcome" => "processed").increment(1);
        histogram!(FRAME_SECONDS).record(arrived.elapsed().as_secs_f64());
        if verdict.alarm {
            counter!(ALARMS_TOTAL).increment(1);
            info!("Alarm for {} ({} closed frames)", self.id, verdict.closed_frames);
        }

        Some(verdict)
    }

    /// Discard the connection's state. Safe to call more than once.
    pub fn close(&self) {
        match self.state.sessions.close(self.id) {
            Ok(Some(session)) => info!(
                "Client disconnected: {} ({} frames, {} alarms)",
                self.id, session.frames_seen, session.alarms_fired
            ),
            Ok(None) => {}
            Err(e) => warn!("Failed to discard session {}: {}", self.id, e),
        }
        if let Ok(active) = self.state.sessions.len() {
            gauge!(ACTIVE_SESSIONS).set(active as f64);
        }
    }
}

impl Drop for FrameSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as B64, Engine};
    use dms::{DmsError, DmsPipeline, DrowsinessEngine, EyeStateClassifier, RegionLocator};
    use fallback::IntensityHeuristic;
    use frame_decoder::{GrayFrame, Region};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    /// Finds a face covering 64x64 frames, with two eyes; nothing in other sizes
    struct SquareFaceLocator;

    impl RegionLocator for SquareFaceLocator {
        fn detect_faces(&self, frame: &GrayFrame) -> Result<Vec<Region>, DmsError> {
            if frame.width == 64 && frame.height == 64 {
                Ok(vec![Region::new(0, 0, 64, 64)])
            } else {
                Ok(Vec::new())
            }
        }

        fn detect_eyes(&self, _face: &GrayFrame) -> Result<Vec<Region>, DmsError> {
            Ok(vec![Region::new(8, 16, 20, 12), Region::new(36, 16, 20, 12)])
        }

        fn kind(&self) -> &'static str {
            "square"
        }
    }

    fn app_state() -> Arc<AppState> {
        let pipeline = DmsPipeline::new(
            Box::new(SquareFaceLocator),
            EyeStateClassifier::heuristic(IntensityHeuristic::default()),
            2,
        );
        Arc::new(AppState::new(pipeline, DrowsinessEngine::default(), None))
    }

    fn payload(image: &str) -> FramePayload {
        FramePayload {
            image: Some(image.to_string()),
        }
    }

    fn outcome(drowsy: bool, closed_frames: u32, alarm: bool) -> FrameVerdict {
        FrameVerdict {
            drowsy,
            closed_frames,
            alarm,
        }
    }

    fn frame(side: u32, luma: u8) -> FramePayload {
        let img = GrayImage::from_pixel(side, side, Luma([luma]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img).write_to(&mut buf, ImageFormat::Png).unwrap();
        payload(&format!("data:image/png;base64,{}", B64.encode(buf.into_inner())))
    }

    #[tokio::test]
    async fn test_closed_streak_and_alarm() {
        let state = app_state();
        let session = FrameSession::open(state.clone()).unwrap();

        let mut verdicts = Vec::new();
        for _ in 0..20 {
            verdicts.push(session.handle_frame(frame(64, 20)).await.unwrap());
        }

        assert_eq!(verdicts[18], outcome(false, 19, false));
        assert_eq!(verdicts[19], outcome(true, 20, true));

        let next = session.handle_frame(frame(64, 20)).await.unwrap();
        assert_eq!(next, outcome(true, 21, false));
    }

    #[tokio::test]
    async fn test_empty_image_is_ignored() {
        let state = app_state();
        let session = FrameSession::open(state.clone()).unwrap();

        session.handle_frame(frame(64, 20)).await.unwrap();
        session.handle_frame(frame(64, 20)).await.unwrap();

        assert!(session.handle_frame(payload("")).await.is_none());
        assert!(session.handle_frame(FramePayload::default()).await.is_none());
        assert!(session.handle_frame(payload("data:,")).await.is_none());

        let snapshot = state.sessions.snapshot(session.id()).unwrap().unwrap();
        assert_eq!(snapshot.closed_count, 2);
    }

    #[tokio::test]
    async fn test_no_face_resets_streak() {
        let state = app_state();
        let session = FrameSession::open(state).unwrap();

        for _ in 0..5 {
            session.handle_frame(frame(64, 20)).await.unwrap();
        }
        let verdict = session.handle_frame(frame(32, 20)).await.unwrap();
        assert_eq!(verdict, outcome(false, 0, false));
    }

    #[tokio::test]
    async fn test_open_eyes_keep_count_at_zero() {
        let session = FrameSession::open(app_state()).unwrap();
        let verdict = session.handle_frame(frame(64, 200)).await.unwrap();
        assert_eq!(verdict.closed_frames, 0);
    }

    #[tokio::test]
    async fn test_handle_text_ignores_garbage() {
        let session = FrameSession::open(app_state()).unwrap();
        assert!(session.handle_text("{").await.is_none());
        assert!(session.handle_text(r#"{"event":"unknown","data":{}}"#).await.is_none());
    }

    #[tokio::test]
    async fn test_close_discards_state_and_reconnect_starts_fresh() {
        let state = app_state();

        let first = FrameSession::open(state.clone()).unwrap();
        for _ in 0..3 {
            first.handle_frame(frame(64, 20)).await.unwrap();
        }
        first.close();
        first.close();
        assert!(state.sessions.is_empty().unwrap());
        drop(first);

        let second = FrameSession::open(state.clone()).unwrap();
        let verdict = second.handle_frame(frame(64, 20)).await.unwrap();
        assert_eq!(verdict.closed_frames, 1);
    }
}
