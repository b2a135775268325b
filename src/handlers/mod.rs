use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::engine::Engine;
use crate::transport::Update;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> impl IntoResponse {
    Json(HealthPayload {
        status: "ok",
        service: "botteghino",
    })
}

/// Transport-bridge webhook. Always acknowledges with 200: a handled error
/// is logged here, and a non-2xx would only make the gateway redeliver the
/// same update.
pub async fn receive_update(
    State(state): State<AppState>,
    Json(update): Json<Update>,
) -> StatusCode {
    if let Err(err) = state.engine.handle_update(update).await {
        err.log();
    }
    StatusCode::OK
}
