//! Camera Routes

use axum::{extract::State, Json};
use camera_capture::{list_devices, DeviceInfo};
use serde::Serialize;

use crate::{ApiError, SharedState};

/// Response for start/stop
#[derive(Debug, Serialize)]
pub struct CameraResponse {
    pub success: bool,
    pub message: String,
}

/// Response for the device listing
#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

/// Start the camera sampling loop
pub async fn start_camera(
    State(state): State<SharedState>,
) -> Result<Json<CameraResponse>, ApiError> {
    state.monitor.start().await?;
    Ok(Json(CameraResponse {
        success: true,
        message: "Camera started".to_string(),
    }))
}

/// Stop the camera sampling loop (no-op when idle)
pub async fn stop_camera(State(state): State<SharedState>) -> Json<CameraResponse> {
    let message = if state.monitor.stop().await {
        "Camera stopped"
    } else {
        "Camera was not running"
    };
    Json(CameraResponse {
        success: true,
        message: message.to_string(),
    })
}

/// List capture devices present on this machine
pub async fn get_cameras() -> Result<Json<DevicesResponse>, ApiError> {
    let devices = tokio::task::spawn_blocking(list_devices)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(DevicesResponse { devices }))
}
