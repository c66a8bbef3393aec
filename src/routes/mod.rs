mod devices;
mod error;
mod health;
mod metrics;
mod upload;
mod video_feed;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub use error::ApiError;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/video_feed", get(video_feed::video_feed))
        .route("/devices", get(devices::list_devices))
        .route("/devices/refresh", post(devices::refresh_devices))
        .route("/devices/{index}/select", post(devices::select_device))
        .route("/endpoints", get(upload::list_endpoints))
        .route("/upload", get(upload::upload_status))
        .route("/upload/toggle", post(upload::toggle_upload))
        .route("/log", get(upload::activity_log))
        .route("/detections", get(upload::latest_detections))
}
