//! Per-session drowsiness state

use std::time::Instant;

/// State tracked for one connected client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Consecutive frames with every observed eye closed
    pub closed_count: u32,

    /// Time of the most recent alarm; `None` until the first one fires
    pub last_alert: Option<Instant>,

    /// Frames that reached the decision engine
    pub frames_seen: u64,

    /// Alarms fired over the session lifetime
    pub alarms_fired: u32,
}
