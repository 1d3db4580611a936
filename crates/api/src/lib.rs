//! Drowsiness Alert Server
//!
//! Serves the browser capture page, accepts webcam frames over a WebSocket
//! and pushes back per-frame drowsiness verdicts.

use axum::{extract::State, response::Html, routing::get, Json, Router};
use dms::{DmsPipeline, DrowsinessEngine, SessionState};
use metrics::gauge;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use session_store::SessionRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod protocol;
pub mod routes;
pub mod session;
pub mod settings;
pub mod telemetry;

pub use settings::{Settings, SettingsError};
pub use telemetry::{init_logging, install_metrics};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Application state shared across handlers
pub struct AppState {
    /// Frame analysis, shared by every connection
    pub pipeline: Arc<DmsPipeline>,
    /// Streak and alarm rules
    pub engine: DrowsinessEngine,
    /// Per-connection state
    pub sessions: SessionRegistry<SessionState>,
    /// Prometheus handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        pipeline: DmsPipeline,
        engine: DrowsinessEngine,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            engine,
            sessions: SessionRegistry::new(),
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub classifier_mode: String,
    pub locator: String,
    pub active_sessions: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(routes::stream::ws_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(routes::metrics::get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let (status, active_sessions) = match state.sessions.len() {
        Ok(active) => ("healthy", active),
        Err(_) => ("degraded", 0),
    };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        classifier_mode: state.pipeline.classifier_mode().as_str().to_string(),
        locator: state.pipeline.locator_kind().to_string(),
        active_sessions,
    })
}

/// Serve the application on an already bound listener until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let mode = state.pipeline.classifier_mode();
    gauge!(telemetry::CLASSIFIER_MODE, "mode" => mode.as_str()).set(1.0);

    let app = create_router(state);
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}

/// Build the pipeline from settings and run the server until Ctrl-C
pub async fn run_server(
    settings: Settings,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    let pipeline = DmsPipeline::from_config(&settings.dms)?;
    let engine = DrowsinessEngine::from_config(&settings.dms);
    let state = Arc::new(AppState::new(pipeline, engine, metrics));

    info!(
        "Starting drowsiness server on {} (classifier: {}, locator: {}, drowsy after {} frames)",
        settings.server.bind_addr,
        state.pipeline.classifier_mode().as_str(),
        state.pipeline.locator_kind(),
        state.engine.closed_frames_threshold()
    );

    let listener = TcpListener::bind(&settings.server.bind_addr).await?;
    serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
