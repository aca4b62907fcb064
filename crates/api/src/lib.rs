//! Emotion Monitor API Server
//!
//! HTTP facade over the [`EmotionMonitor`]: health, camera start/stop, the
//! latest snapshot, pushed-frame analysis, and a once-per-second stream.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use camera_capture::ConfiguredCamera;
use chrono::{DateTime, Local};
use emotion::EmotionClassifier;
use gaze::{FaceMeshModel, GazeEstimator, LandmarkModel};
use metrics_exporter_prometheus::PrometheusHandle;
use monitor::{Analyzer, EmotionMonitor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod routes;
mod settings;

pub use error::ApiError;
pub use settings::{ServerSettings, Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};

/// Application state shared across handlers
pub struct AppState {
    /// Camera loop, analyzer and snapshot
    pub monitor: Arc<EmotionMonitor>,
    /// Prometheus handle, when a recorder is installed
    pub prometheus: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Create new application state
    pub fn new(monitor: EmotionMonitor, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            monitor: Arc::new(monitor),
            prometheus,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub camera_active: bool,
    pub model_loaded: bool,
    pub landmarks_loaded: bool,
    pub policy: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Local>,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/start_camera", post(routes::camera::start_camera))
        .route("/stop_camera", post(routes::camera::stop_camera))
        .route("/cameras", get(routes::camera::get_cameras))
        .route("/emotion_data", get(routes::emotion::get_emotion_data))
        .route("/analyze_frame", post(routes::emotion::analyze_frame))
        .route("/emotion_stream", get(routes::emotion::emotion_stream))
        .route("/emotion_stats", get(routes::emotion::get_emotion_stats))
        .route("/metrics", get(routes::emotion::get_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let monitor = &state.monitor;
    Json(HealthResponse {
        status: "healthy".to_string(),
        camera_active: monitor.is_active(),
        model_loaded: monitor.model_loaded(),
        landmarks_loaded: monitor.landmarks_loaded(),
        policy: monitor.policy_name().to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: Local::now(),
    })
}

/// Build the monitor from settings.
///
/// Models that fail to load are logged and left unloaded; the server still
/// starts and reports them through `/health`.
pub fn build_monitor(settings: &Settings) -> EmotionMonitor {
    let landmarks: Box<dyn LandmarkModel> = match FaceMeshModel::new(&settings.gaze) {
        Ok(model) => Box::new(model),
        Err(e) => {
            error!("Face mesh model unavailable: {}", e);
            Box::new(FaceMeshModel::unloaded())
        }
    };

    let analyzer = Analyzer::new(
        landmarks,
        GazeEstimator::new(&settings.gaze),
        EmotionClassifier::new(&settings.emotion),
    );
    let camera = ConfiguredCamera::new(settings.camera.clone());

    EmotionMonitor::new(Arc::new(camera), analyzer, settings.monitor.clone())
}

/// Initialize logging.
///
/// Unknown levels fall back to `info`. Calling it again is a no-op.
pub fn init_logging(level: &str, json: bool) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if installed.is_err() {
        debug!("Tracing subscriber already installed");
    }
}

/// Run the server until the listener fails or the process is interrupted
pub async fn run_server(settings: Settings, prometheus: Option<PrometheusHandle>) -> anyhow::Result<()> {
    let monitor = build_monitor(&settings);
    let state = Arc::new(AppState::new(monitor, prometheus));
    let app = create_router(state.clone());

    let addr = settings.bind_addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if state.monitor.stop().await {
        info!("Camera released on shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
