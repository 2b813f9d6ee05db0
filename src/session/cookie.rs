//! Signed session cookie values.
//!
//! Cookie value: `base64url(session_id).base64url(hmac_sha256(key, session_id))`.
//! The signing key is derived from the configured secret with a fixed salt,
//! so the raw `SECRET_KEY` is never used directly as a MAC key. The cookie
//! carries only the id; the session itself lives in the backend.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &[u8] = b"itsm-gateway.session-cookie";

/// Signs and verifies session ids with a key derived from the app secret.
#[derive(Clone)]
pub struct CookieSigner {
    key: [u8; 32],
}

impl CookieSigner {
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(KEY_SALT)
            .chain_update(secret.as_bytes())
            .finalize();
        Self { key: digest.into() }
    }

    fn mac(&self, session_id: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC key length is always valid");
        mac.update(session_id.as_bytes());
        mac
    }

    /// Produce the cookie value for a session id.
    pub fn sign(&self, session_id: &str) -> String {
        let signature = self.mac(session_id).finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(session_id.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Recover the session id from a cookie value, or `None` if forged or malformed.
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id_part, sig_part) = cookie_value.split_once('.')?;
        let session_id = String::from_utf8(URL_SAFE_NO_PAD.decode(id_part).ok()?).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(sig_part).ok()?;

        self.mac(&session_id).verify_slice(&signature).ok()?;
        Some(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_then_verify() {
        let signer = CookieSigner::new("secret");
        let cookie = signer.sign("sid-42");
        assert_eq!(signer.verify(&cookie).as_deref(), Some("sid-42"));
    }

    #[test]
    fn test_other_secret_rejects() {
        let cookie = CookieSigner::new("a").sign("sid");
        assert!(CookieSigner::new("b").verify(&cookie).is_none());
    }

    #[test]
    fn test_swapped_id_rejects() {
        let signer = CookieSigner::new("secret");
        let cookie = signer.sign("victim");
        let (_, sig) = cookie.split_once('.').unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(b"attacker"), sig);
        assert!(signer.verify(&forged).is_none());
    }

    #[test]
    fn test_malformed_values() {
        let signer = CookieSigner::new("secret");
        assert!(signer.verify("").is_none());
        assert!(signer.verify("no-separator").is_none());
        assert!(signer.verify("%%%.%%%").is_none());
        assert!(signer.verify(&format!("{}.", URL_SAFE_NO_PAD.encode(b"sid"))).is_none());
    }

    #[test]
    fn test_key_is_not_raw_secret() {
        // A MAC computed with the raw secret must not verify.
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(b"sid");
        let raw = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(b"sid"),
            URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
        );
        assert!(CookieSigner::new("secret").verify(&raw).is_none());
    }
}
