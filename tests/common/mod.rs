//! Test utilities: app builder, seeded sessions, cookie and body helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use itsm_gateway::config::Config;
use itsm_gateway::session::cookie::CookieSigner;
use itsm_gateway::session::memory::InMemoryBackend;
use itsm_gateway::session::middleware::COOKIE_NAME;
use itsm_gateway::session::{AnyBackend, SessionBackend, SessionData};
use itsm_gateway::{AppState, create_app};
use serde_json::{Value, json};
use std::sync::Arc;

pub const CSRF: &str = "test-csrf-token";

/// Build a test app with an in-memory session store, forwarding to `backend_url`.
pub fn build_test_app(backend_url: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default(backend_url);
    let state = Arc::new(AppState::new(
        config,
        reqwest::Client::new(),
        AnyBackend::Memory(InMemoryBackend::new()),
    ));
    (create_app(state.clone()), state)
}

pub fn ana() -> Value {
    json!({
        "id": "u1",
        "email": "ana@example.com",
        "firstName": "Ana",
        "lastName": "Lee",
        "role": "AGENT"
    })
}

/// Store an authenticated session directly and return its cookie value.
pub async fn seed_login(
    state: &AppState,
    session_id: &str,
    access_token: &str,
    refresh_token: Option<&str>,
) -> String {
    let mut data = SessionData::new();
    data.set("user_data", ana());
    data.set("access_token", json!(access_token));
    if let Some(rt) = refresh_token {
        data.set("refresh_token", json!(rt));
    }
    data.set("permanent", json!(true));
    data.set("csrf_token", json!(CSRF));
    data.set("csrf_issued_at", json!(now_secs()));
    state.session_layer.backend.save(session_id, &data).await;
    signed_cookie(state, session_id)
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn signed_cookie(state: &AppState, session_id: &str) -> String {
    CookieSigner::new(&state.config.session_secret).sign(session_id)
}

/// The session cookie value set by a response, `None` if absent or cleared.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|s| {
            s.split(';')
                .next()
                .and_then(|c| c.strip_prefix(&format!("{COOKIE_NAME}=")))
                .filter(|v| !v.is_empty())
                .map(String::from)
        })
}

pub fn is_cookie_cleared(response: &Response) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|s| s.starts_with(&format!("{COOKIE_NAME}=;")) && s.contains("Max-Age=0"))
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, format!("{COOKIE_NAME}={c}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// A urlencoded form POST, as a browser would send it.
pub fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, format!("{COOKIE_NAME}={c}"));
    }
    let body = serde_urlencoded::to_string(fields).unwrap();
    builder.body(Body::from(body)).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        builder = builder.header(header::COOKIE, format!("{COOKIE_NAME}={c}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
