//! Gateway error types with Axum response mapping.
//!
//! Bodies use the same `{success, error}` envelope the backend speaks, so
//! client scripts handle gateway and backend failures identically.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::backend::ForwardError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("CSRF validation failed")]
    CsrfFailed,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::CsrfFailed => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ForwardError> for AppError {
    fn from(err: ForwardError) -> Self {
        match err {
            ForwardError::UnsupportedMethod(m) => AppError::UnsupportedMethod(m),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::CsrfFailed => json!({
                "success": false,
                "error": "CSRF validation failed",
                "message": "Missing or invalid CSRF token"
            }),
            other => json!({"success": false, "error": other.to_string()}),
        };

        (self.status(), axum::Json(body)).into_response()
    }
}
