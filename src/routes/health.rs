use crate::server::SharedState;
use axum::{extract::State, response::Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    uploading: bool,
}

pub async fn healthcheck(State(state): State<SharedState>) -> Json<Health> {
    state.metrics.record_request("health");
    Json(Health {
        status: "Available",
        uploading: state.session.status().uploading,
    })
}
