//! Typed access to the session record: credentials, flashes, CSRF token.
//!
//! Record layout inside `SessionData`:
//! - `user_data`: the backend's raw `user` object
//! - `access_token`, `refresh_token`
//! - `permanent`: always `true` for logged-in sessions
//! - `_flashes`: pending notifications
//! - `csrf_token`, `csrf_issued_at`: form token and its Unix issue time

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::SessionData;
use super::middleware::SessionHandle;
use crate::auth::principal::Principal;

const USER_DATA: &str = "user_data";
const ACCESS_TOKEN: &str = "access_token";
const REFRESH_TOKEN: &str = "refresh_token";
const PERMANENT: &str = "permanent";
const FLASHES: &str = "_flashes";
const CSRF_TOKEN: &str = "csrf_token";
const CSRF_ISSUED_AT: &str = "csrf_issued_at";

/// How long a form token stays valid after it was issued.
pub const CSRF_TIME_LIMIT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Error,
}

/// A transient, dismissible notification shown by the next rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl SessionHandle {
    /// Replace the session wholesale with a freshly authenticated one.
    ///
    /// Rotates the session id, so the 24-hour lifetime starts now.
    pub async fn save_principal(
        &self,
        profile: &Value,
        access_token: &str,
        refresh_token: Option<&str>,
    ) {
        {
            let mut data = self.data.lock().await;
            data.clear();
            data.set(USER_DATA, profile.clone());
            data.set(ACCESS_TOKEN, json!(access_token));
            if let Some(rt) = refresh_token {
                data.set(REFRESH_TOKEN, json!(rt));
            }
            data.set(PERMANENT, json!(true));
        }
        self.rotate().await;
    }

    /// The current principal, or `None` for anonymous or half-written sessions.
    pub async fn principal(&self) -> Option<Principal> {
        let data = self.data.lock().await;
        let profile = data.get(USER_DATA)?;
        let token = data.get(ACCESS_TOKEN)?.as_str().filter(|t| !t.is_empty())?;
        Principal::from_profile(profile, token)
    }

    /// Drop everything. Clearing an empty session is a no-op.
    pub async fn clear(&self) {
        self.data.lock().await.clear();
        self.rotate().await;
    }

    pub async fn refresh_token(&self) -> Option<String> {
        let data = self.data.lock().await;
        data.get(REFRESH_TOKEN)?.as_str().map(String::from)
    }

    /// Swap in renewed credentials, keeping the profile and the record's age.
    pub async fn update_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        let mut data = self.data.lock().await;
        data.set(ACCESS_TOKEN, json!(access_token));
        if let Some(rt) = refresh_token {
            data.set(REFRESH_TOKEN, json!(rt));
        }
    }

    pub async fn flash(&self, category: FlashCategory, message: impl Into<String>) {
        let mut data = self.data.lock().await;
        let mut flashes: Vec<Flash> = data
            .get(FLASHES)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        flashes.push(Flash {
            category,
            message: message.into(),
        });
        match serde_json::to_value(&flashes) {
            Ok(v) => data.set(FLASHES, v),
            Err(e) => tracing::error!("Failed to store flash message: {}", e),
        }
    }

    /// Remove and return pending flashes.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        let mut data = self.data.lock().await;
        data.remove(FLASHES)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    /// The current CSRF token, `None` if never issued or past its time limit.
    pub async fn csrf_token(&self) -> Option<String> {
        let data = self.data.lock().await;
        live_csrf_token(&data)
    }

    /// The session's CSRF token, minting a new one when missing or stale.
    pub async fn ensure_csrf_token(&self) -> String {
        let mut data = self.data.lock().await;
        if let Some(existing) = live_csrf_token(&data) {
            return existing;
        }
        let token = new_csrf_token();
        data.set(CSRF_TOKEN, json!(token));
        data.set(CSRF_ISSUED_AT, json!(now_secs()));
        token
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn live_csrf_token(data: &SessionData) -> Option<String> {
    let token = data.get(CSRF_TOKEN)?.as_str()?;
    let issued_at = data.get(CSRF_ISSUED_AT)?.as_u64()?;
    if now_secs().saturating_sub(issued_at) >= CSRF_TIME_LIMIT.as_secs() {
        return None;
    }
    Some(token.to_string())
}

fn new_csrf_token() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
