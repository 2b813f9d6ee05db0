//! `{GET,POST,PUT,DELETE} /api/proxy/{*path}`
//!
//! Generic pass-through for client-side scripts. The caller's session token
//! is attached; the backend decides whether the path is allowed.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::AppState;
use crate::auth::AuthBridge;
use crate::backend::{ForwardedRequest, Method};
use crate::error::AppError;
use crate::session::middleware::SessionHandle;

pub const PROXY_PREFIX: &str = "/api/proxy";

pub async fn proxy(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    method: axum::http::Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let method = Method::try_from(&method)?;

    // Raw, still percent-encoded
    let path = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or(uri.path());

    let payload = if method.has_json_body() {
        serde_json::from_slice::<Value>(&body).ok()
    } else if query.is_empty() {
        None
    } else {
        serde_json::to_value(query).ok()
    };

    let mut request = ForwardedRequest::new(method, path);
    request.payload = payload;

    let response = AuthBridge::new(&state.backend, &session)
        .forward(request)
        .await;
    let status = response.status.unwrap_or(StatusCode::BAD_GATEWAY);

    Ok((status, Json(response.body)).into_response())
}
