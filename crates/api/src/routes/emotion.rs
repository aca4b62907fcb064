//! Emotion Routes

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use camera_capture::decode_base64_frame;
use futures::stream;
use monitor::{EmotionSnapshot, StatsSummary};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ApiError, SharedState};

/// Gap between two stream events
pub const STREAM_INTERVAL: Duration = Duration::from_secs(1);

/// Body of `POST /analyze_frame`
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 image, optionally as a `data:` URL
    pub frame: Option<String>,
}

/// Latest snapshot
pub async fn get_emotion_data(State(state): State<SharedState>) -> Json<EmotionSnapshot> {
    Json(state.monitor.snapshot())
}

/// Analyse a pushed frame and return the updated snapshot
pub async fn analyze_frame(
    State(state): State<SharedState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<EmotionSnapshot>, ApiError> {
    metrics::counter!("api_analyze_frame_requests_total").increment(1);

    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let payload = request
        .frame
        .ok_or_else(|| ApiError::BadRequest("No frame data provided".to_string()))?;

    let frame = decode_base64_frame(&payload).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    debug!(width = frame.width, height = frame.height, "analyzing pushed frame");

    let snapshot = state.monitor.analyze_frame(frame).await?;
    Ok(Json(snapshot))
}

/// `data: <snapshot>\n\n` once per second while the camera is active.
///
/// The body ends as soon as the monitor is idle, immediately if it already is.
pub async fn emotion_stream(State(state): State<SharedState>) -> Response {
    let events = stream::unfold((state, true), |(state, first)| async move {
        if !first {
            tokio::time::sleep(STREAM_INTERVAL).await;
        }
        if !state.monitor.is_active() {
            return None;
        }

        let event = match serde_json::to_string(&state.monitor.snapshot()) {
            Ok(json) => format!("data: {}\n\n", json),
            Err(e) => {
                warn!("Failed to encode snapshot: {}", e);
                return None;
            }
        };
        Some((Ok::<_, Infallible>(event), (state, false)))
    });

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(events),
    )
        .into_response()
}

/// Report of the current or most recent camera session
pub async fn get_emotion_stats(
    State(state): State<SharedState>,
) -> Result<Json<StatsSummary>, ApiError> {
    state
        .monitor
        .stats_summary()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No camera session yet".to_string()))
}

/// Prometheus text exposition (empty without a recorder)
pub async fn get_metrics(State(state): State<SharedState>) -> String {
    state
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
