//! Axum session middleware layer.
//!
//! Extracts the signed session id from the cookie, loads the record from the
//! backend and exposes it to handlers as a `SessionHandle`. After the
//! handler returns, changed data is persisted and the cookie re-issued.
//!
//! A handler may *rotate* the session (login, logout): the old record is
//! deleted, and whatever data remains is stored under a fresh id with a
//! fresh creation time. Rotating into empty data just clears the cookie.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::cookie::CookieSigner;
use super::{SESSION_MAX_AGE, SessionBackend, SessionData};

pub const COOKIE_NAME: &str = "itsm_session";

/// Shared handle to session state, inserted into request extensions.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: String,
    pub data: Arc<Mutex<SessionData>>,
    pub rotated: Arc<Mutex<bool>>,
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = crate::error::AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(crate::error::AppError::Internal(
                "Session middleware not configured".into(),
            ))
    }
}

impl SessionHandle {
    pub fn new(id: String, data: SessionData) -> Self {
        Self {
            id,
            data: Arc::new(Mutex::new(data)),
            rotated: Arc::new(Mutex::new(false)),
        }
    }

    /// Detach from the current record; see the module docs.
    pub async fn rotate(&self) {
        *self.rotated.lock().await = true;
    }
}

/// Session middleware configuration.
pub struct SessionLayer<B: SessionBackend> {
    pub backend: Arc<B>,
    pub signer: CookieSigner,
    pub https_only: bool,
}

impl<B: SessionBackend> SessionLayer<B> {
    pub fn new(backend: B, secret: &str, https_only: bool) -> Self {
        Self {
            backend: Arc::new(backend),
            signer: CookieSigner::new(secret),
            https_only,
        }
    }
}

/// Axum middleware function for session handling.
pub async fn session_middleware<B: SessionBackend + 'static>(
    layer: Arc<SessionLayer<B>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| parse_cookie(h, COOKIE_NAME))
        .and_then(|v| layer.signer.verify(v));

    let loaded = match &session_id {
        Some(id) => layer.backend.load(id).await.map(|data| (id.clone(), data)),
        None => None,
    };
    // Unknown or expired ids are never reused
    let (id, initial_data) =
        loaded.unwrap_or_else(|| (generate_session_id(), SessionData::new()));

    let handle = SessionHandle::new(id.clone(), initial_data.clone());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let rotated = *handle.rotated.lock().await;
    let current_data = handle.data.lock().await.clone();

    let cookie = if rotated {
        layer.backend.delete(&id).await;
        if current_data.is_empty() {
            Some(make_delete_cookie(layer.https_only))
        } else {
            let new_id = generate_session_id();
            layer.backend.save(&new_id, &current_data).await;
            Some(make_set_cookie(&layer.signer, &new_id, layer.https_only))
        }
    } else if current_data != initial_data {
        // Only persist when the handler changed something, so anonymous
        // health checks and static hits never create sessions.
        layer.backend.save(&id, &current_data).await;
        Some(make_set_cookie(&layer.signer, &id, layer.https_only))
    } else {
        None
    };

    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Invalid Set-Cookie header: {}", e),
        }
    }

    response
}

pub(crate) fn generate_session_id() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn make_set_cookie(signer: &CookieSigner, session_id: &str, https_only: bool) -> String {
    cookie_attributes(
        format!("{}={}", COOKIE_NAME, signer.sign(session_id)),
        SESSION_MAX_AGE.as_secs(),
        https_only,
    )
}

fn make_delete_cookie(https_only: bool) -> String {
    cookie_attributes(format!("{}=", COOKIE_NAME), 0, https_only)
}

fn cookie_attributes(pair: String, max_age: u64, https_only: bool) -> String {
    let mut parts = vec![
        pair,
        format!("Max-Age={}", max_age),
        "Path=/".into(),
        "HttpOnly".into(),
        "SameSite=Lax".into(),
    ];
    if https_only {
        parts.push("Secure".into());
    }
    parts.join("; ")
}

/// Parse a specific cookie from a Cookie header value.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie() {
        assert_eq!(
            parse_cookie("theme=dark; itsm_session=abc.def", COOKIE_NAME),
            Some("abc.def")
        );
        assert_eq!(parse_cookie("itsm_session_old=x", COOKIE_NAME), None);
        assert_eq!(parse_cookie("", COOKIE_NAME), None);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let signer = CookieSigner::new("secret");
        let cookie = make_set_cookie(&signer, "sid", false);
        assert!(cookie.starts_with("itsm_session="));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));

        let value = cookie
            .split(';')
            .next()
            .and_then(|c| c.strip_prefix("itsm_session="))
            .unwrap();
        assert_eq!(signer.verify(value).as_deref(), Some("sid"));
    }

    #[test]
    fn test_secure_only_when_https() {
        let signer = CookieSigner::new("secret");
        assert!(make_set_cookie(&signer, "sid", true).ends_with("; Secure"));
        assert!(make_delete_cookie(true).contains("Secure"));
    }

    #[test]
    fn test_delete_cookie() {
        let cookie = make_delete_cookie(false);
        assert!(cookie.starts_with("itsm_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }
}
