//! CSRF validation for state-changing requests.
//!
//! The expected value is the per-session token handed out in every page
//! context. It may arrive in the `X-CSRF-Token` header or as the
//! `csrf_token` field of a urlencoded form body. Tokens older than
//! `CSRF_TIME_LIMIT` count as missing.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{Method, header};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

/// Forms are tiny; anything bigger is not a login or registration.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Axum middleware rejecting unsafe requests without a matching token.
pub async fn require_csrf(
    session: SessionHandle,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if is_safe(req.method()) {
        return Ok(next.run(req).await);
    }

    let expected = session.csrf_token().await.ok_or(AppError::CsrfFailed)?;

    if let Some(submitted) = req.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok()) {
        if !tokens_match(&expected, submitted) {
            return Err(AppError::CsrfFailed);
        }
        return Ok(next.run(req).await);
    }

    if !is_form(&req) {
        return Err(AppError::CsrfFailed);
    }

    // Buffer the form to read the field, then hand the same bytes on
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("Request body too large".into()))?;

    match form_token(&bytes) {
        Some(submitted) if tokens_match(&expected, &submitted) => {
            let req = Request::from_parts(parts, Body::from(bytes));
            Ok(next.run(req).await)
        }
        _ => Err(AppError::CsrfFailed),
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn form_token(body: &[u8]) -> Option<String> {
    let fields: Vec<(String, String)> = serde_urlencoded::from_bytes(body).ok()?;
    fields
        .into_iter()
        .find(|(k, _)| k == CSRF_FIELD)
        .map(|(_, v)| v)
}

fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}
