use crate::{
    camera::CameraDevice, device_selector::DeviceOptions, routes::ApiError, server::SharedState,
};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

pub async fn list_devices(State(state): State<SharedState>) -> Json<DeviceOptions> {
    state.metrics.record_request("devices");
    Json(state.selector.options())
}

#[instrument(skip(state))]
pub async fn refresh_devices(State(state): State<SharedState>) -> Json<DeviceOptions> {
    state.metrics.record_request("devices_refresh");
    let active = state.camera.active_device().await;
    Json(state.selector.refresh(active).await)
}

#[instrument(skip(state))]
pub async fn select_device(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<CameraDevice>, ApiError> {
    state.metrics.record_request("devices_select");
    state
        .selector
        .select(index)
        .map(Json)
        .ok_or(ApiError::UnknownDevice(index))
}
