//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::types::HealthResponse;

/// Liveness check; never touches the backend or creates a session.
pub async fn health(State(state): State<Arc<crate::AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        mode: "gateway".into(),
        session_backend: state.config.session_backend.as_str().into(),
    })
}
