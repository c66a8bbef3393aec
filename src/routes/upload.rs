use crate::{
    response::Detection, routes::ApiError, server::SharedState, session::UploadStatus,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub endpoint: usize,
    pub interval_secs: Option<f32>,
}

#[derive(Serialize)]
pub struct LogLines {
    lines: Vec<String>,
}

pub async fn list_endpoints(State(state): State<SharedState>) -> Json<Vec<String>> {
    state.metrics.record_request("endpoints");
    Json(state.session.endpoints().to_vec())
}

pub async fn upload_status(State(state): State<SharedState>) -> Json<UploadStatus> {
    state.metrics.record_request("upload");
    Json(state.session.status())
}

#[instrument(skip(state))]
pub async fn toggle_upload(
    State(state): State<SharedState>,
    request: Option<Json<ToggleRequest>>,
) -> Result<Json<UploadStatus>, ApiError> {
    state.metrics.record_request("upload_toggle");
    let Json(request) = request.unwrap_or_default();
    let interval_secs = request
        .interval_secs
        .unwrap_or(state.default_interval_secs);

    let status = state.session.toggle(request.endpoint, interval_secs)?;
    Ok(Json(status))
}

pub async fn activity_log(State(state): State<SharedState>) -> Json<LogLines> {
    state.metrics.record_request("log");
    Json(LogLines {
        lines: state.session.log().lines(),
    })
}

pub async fn latest_detections(State(state): State<SharedState>) -> Json<Vec<Detection>> {
    state.metrics.record_request("detections");
    Json(state.detections.lock().clone())
}
