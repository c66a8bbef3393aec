use crate::session::SessionError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("No camera device at index {0}")]
    UnknownDevice(usize),
    #[error("Metrics encoding failed: {0}")]
    Metrics(String),
    #[error("HTTP builder failed: {0}")]
    HttpBuilder(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Session(_) => StatusCode::BAD_REQUEST,
            ApiError::UnknownDevice(_) => StatusCode::NOT_FOUND,
            ApiError::Metrics(_) | ApiError::HttpBuilder(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
