//! Responses for requests no handler produced.

use std::any::Any;

use axum::http::Method;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Known paths hit with a method they do not serve.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::UnsupportedMethod(method.to_string())
}

/// Turns a handler panic into a 500 envelope; the payload is only logged.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };
    tracing::error!(detail = %detail, "Handler panicked");
    AppError::Internal("unexpected failure".into()).into_response()
}
