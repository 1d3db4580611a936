//! HTTP and WebSocket routes

pub mod metrics;
pub mod stream;
