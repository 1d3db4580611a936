//! Drowsiness decision engine
//!
//! The only durable state is the session's closed streak and last alarm
//! time. Each frame either extends the streak (every observed eye closed) or
//! resets it; a frame without any eye votes resets it too, so a dropped
//! detection breaks a drowsy streak immediately. Alarms are edge events gated
//! by the cooldown, not a state.

use std::time::Instant;

use alerting::AlarmPolicy;
use tracing::{debug, info};

use crate::analysis::FrameVerdict;
use crate::classifier::EyeObservation;
use crate::config::DmsConfig;
use crate::state::SessionState;

/// Default consecutive closed frames before a session counts as drowsy
pub const DEFAULT_CLOSED_FRAMES_THRESHOLD: u32 = 20;

/// True iff there is at least one vote and every vote is closed
pub fn all_eyes_closed(votes: &[EyeObservation]) -> bool {
    !votes.is_empty() && votes.iter().all(|v| !v.open)
}

/// Per-frame drowsiness state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrowsinessEngine {
    closed_frames_threshold: u32,
    alarm: AlarmPolicy,
}

impl Default for DrowsinessEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSED_FRAMES_THRESHOLD, AlarmPolicy::default())
    }
}

impl DrowsinessEngine {
    pub fn new(closed_frames_threshold: u32, alarm: AlarmPolicy) -> Self {
        Self {
            closed_frames_threshold,
            alarm,
        }
    }

    pub fn from_config(config: &DmsConfig) -> Self {
        Self::new(
            config.closed_frames_threshold,
            AlarmPolicy::from_secs_f64(config.alarm_cooldown_secs),
        )
    }

    pub fn closed_frames_threshold(&self) -> u32 {
        self.closed_frames_threshold
    }

    /// Advance `state` by one frame observed at `now`
    pub fn step(
        &self,
        state: &mut SessionState,
        votes: &[EyeObservation],
        now: Instant,
    ) -> FrameVerdict {
        state.frames_seen += 1;

        if all_eyes_closed(votes) {
            state.closed_count = state.closed_count.saturating_add(1);
        } else {
            state.closed_count = 0;
        }

        let drowsy = state.closed_count >= self.closed_frames_threshold;
        let alarm = drowsy && self.alarm.try_fire(&mut state.last_alert, now);

        if alarm {
            state.alarms_fired += 1;
            info!("Drowsiness alarm after {} closed frames", state.closed_count);
        } else {
            debug!("Frame verdict: closed_frames={} drowsy={}", state.closed_count, drowsy);
        }

        FrameVerdict {
            drowsy,
            closed_frames: state.closed_count,
            alarm,
        }
    }
}
