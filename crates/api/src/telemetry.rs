//! Logging and metrics setup

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const FRAMES_TOTAL: &str = "dms_frames_total";
pub const ALARMS_TOTAL: &str = "dms_alarms_total";
pub const FRAME_SECONDS: &str = "dms_frame_seconds";
pub const ACTIVE_SESSIONS: &str = "dms_active_sessions";
pub const CLASSIFIER_MODE: &str = "dms_classifier_mode";

/// Initialize logging
pub fn init_logging(level: Level, json: bool) -> Result<(), SetGlobalDefaultError> {
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
