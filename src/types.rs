//! Shared request/response DTOs.

use serde::{Deserialize, Serialize};

/// POST /login form body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `?next=` on the login routes.
#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    pub next: Option<String>,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
    pub session_backend: String,
}
