//! Emotion Monitor Server - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    init_logging(&settings.server.log_level, settings.server.log_json);

    info!("=== Emotion Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        policy = ?settings.emotion.policy,
        camera = %settings.camera.device_path(),
        "Starting emotion and gaze monitor..."
    );

    let prometheus = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    };

    run_server(settings, prometheus).await
}
