use crate::{routes::ApiError, server::SharedState, stream::FRAME_BOUNDARY};
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn video_feed(State(state): State<SharedState>) -> Result<Response, ApiError> {
    state.metrics.record_request("video_feed");
    let stream = state.video_stream.generate_stream();

    let body = Body::from_stream(stream);

    let response = Response::builder()
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", FRAME_BOUNDARY),
        )
        .body(body)
        .map_err(|e| ApiError::HttpBuilder(e.to_string()))?;

    Ok(response)
}
