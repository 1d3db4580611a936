//! Session Store
//!
//! Per-connection state registry, keyed by connection id.

mod registry;

pub use registry::{ConnectionId, SessionRegistry};

use thiserror::Error;

/// Session store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session registry lock poisoned: {0}")]
    LockPoisoned(String),
}
