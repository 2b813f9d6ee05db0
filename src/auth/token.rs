//! Unverified JWT claim reading for backend access tokens.
//!
//! The gateway does not verify backend tokens (the backend does); it only
//! peeks at `exp` to refresh before sending a token it knows is stale.
//! Opaque tokens are never considered expired.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: Option<u64>,
}

/// `exp` of a JWT, or `None` if the token is not a readable JWT.
pub fn expires_at(token: &str) -> Option<u64> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    // Tolerate padded encoders
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<ExpiryClaims>(&bytes).ok()?.exp
}

/// Whether the token is a JWT whose `exp` has passed.
pub fn is_expired(token: &str) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    expires_at(token).is_some_and(|exp| now >= exp)
}
