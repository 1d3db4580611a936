//! Alerting System
//!
//! Edge-triggered alarms with a minimum cooldown between firings.

mod manager;

pub use manager::{AlarmPolicy, DEFAULT_COOLDOWN};
