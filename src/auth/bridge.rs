//! Login, registration, logout and token refresh against the backend.
//!
//! Session states: Anonymous → Authenticating → Authenticated → Anonymous.
//! Login replaces the session wholesale; nothing is written to the session
//! unless the backend returned both a profile and an access token.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::principal::Principal;
use super::token;
use crate::backend::{BackendClient, CONNECTION_FAILED, ForwardedRequest, ForwardedResponse};
use crate::ocsf;
use crate::session::middleware::SessionHandle;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// Message suitable for showing to the user as-is.
    #[error("{0}")]
    Rejected(String),

    #[error("No refresh token")]
    NoRefreshToken,
}

/// Registration fields: snake_case from the form, camelCase to the backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Registration {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
}

/// Auth operations bound to one request's session.
pub struct AuthBridge<'a> {
    backend: &'a BackendClient,
    session: &'a SessionHandle,
}

impl<'a> AuthBridge<'a> {
    pub fn new(backend: &'a BackendClient, session: &'a SessionHandle) -> Self {
        Self { backend, session }
    }

    /// Exchange credentials for tokens and start an authenticated session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let request = ForwardedRequest::post(LOGIN_PATH)
            .with_payload(json!({"email": email, "password": password}));
        let response = self.backend.send(&request).await;

        if let Some(message) = response.error_or("Login failed") {
            ocsf::authentication_event(
                ocsf::ACTIVITY_LOGON,
                ocsf::STATUS_FAILURE,
                ocsf::SEVERITY_MEDIUM,
                Some(email),
                &format!("Login failed: {message}"),
            );
            return Err(AuthError::Rejected(message));
        }

        let data = response.body.get("data");
        let profile = data.and_then(|d| d.get("user"));
        let access_token = data
            .and_then(|d| d.get("accessToken"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        let refresh_token = data
            .and_then(|d| d.get("refreshToken"))
            .and_then(Value::as_str);

        let (Some(profile), Some(access_token)) = (profile, access_token) else {
            tracing::warn!("Backend reported login success without user or accessToken");
            return Err(AuthError::Rejected("Login failed".into()));
        };
        let principal = Principal::from_profile(profile, access_token)
            .ok_or_else(|| AuthError::Rejected("Login failed".into()))?;

        self.session
            .save_principal(profile, access_token, refresh_token)
            .await;

        ocsf::authentication_event(
            ocsf::ACTIVITY_LOGON,
            ocsf::STATUS_SUCCESS,
            ocsf::SEVERITY_INFORMATIONAL,
            principal.profile.email.as_deref().or(Some(email)),
            "Login succeeded",
        );

        Ok(principal)
    }

    /// Create an account; the result is pending approval, never a session.
    pub async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        let payload = serde_json::to_value(registration)
            .map_err(|e| AuthError::Rejected(format!("Registration failed: {e}")))?;
        let response = self
            .backend
            .send(&ForwardedRequest::post(REGISTER_PATH).with_payload(payload))
            .await;

        let email = registration.email.as_deref();
        match response.error_or("Registration failed") {
            None => {
                ocsf::authentication_event(
                    ocsf::ACTIVITY_OTHER,
                    ocsf::STATUS_SUCCESS,
                    ocsf::SEVERITY_INFORMATIONAL,
                    email,
                    "Registration submitted",
                );
                Ok(())
            }
            Some(message) => {
                ocsf::authentication_event(
                    ocsf::ACTIVITY_OTHER,
                    ocsf::STATUS_FAILURE,
                    ocsf::SEVERITY_LOW,
                    email,
                    &format!("Registration failed: {message}"),
                );
                Err(AuthError::Rejected(message))
            }
        }
    }

    /// Tell the backend (best effort), then always clear the local session.
    pub async fn logout(&self) {
        if let Some(principal) = self.session.principal().await {
            let request = ForwardedRequest::post(LOGOUT_PATH).with_token(principal.token.as_str());
            let response = self.backend.send(&request).await;
            if let Some(message) = response.error_or("unknown error") {
                tracing::warn!("Backend logout notification failed: {}", message);
            }

            ocsf::authentication_event(
                ocsf::ACTIVITY_LOGOFF,
                ocsf::STATUS_SUCCESS,
                ocsf::SEVERITY_INFORMATIONAL,
                principal.profile.email.as_deref(),
                "User logged out",
            );
        }

        self.session.clear().await;
    }

    /// Renew the access token with the session's refresh token.
    ///
    /// A backend rejection ends the session; an unreachable backend does not.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let refresh_token = self
            .session
            .refresh_token()
            .await
            .ok_or(AuthError::NoRefreshToken)?;
        let email = self
            .session
            .principal()
            .await
            .and_then(|p| p.profile.email);

        let request = ForwardedRequest::post(REFRESH_PATH)
            .with_payload(json!({"refreshToken": refresh_token}));
        let response = self.backend.send(&request).await;

        if response.is_transport_failure() {
            return Err(AuthError::Rejected(CONNECTION_FAILED.into()));
        }

        let data = response.body.get("data");
        let renewed = data
            .and_then(|d| d.get("accessToken"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());

        match (response.is_success(), renewed) {
            (true, Some(access_token)) => {
                let rotated = data
                    .and_then(|d| d.get("refreshToken"))
                    .and_then(Value::as_str);
                self.session.update_tokens(access_token, rotated).await;

                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    ocsf::STATUS_SUCCESS,
                    ocsf::SEVERITY_INFORMATIONAL,
                    email.as_deref(),
                    "Token refresh succeeded",
                );
                Ok(access_token.to_string())
            }
            _ => {
                let message = response
                    .error_or("Session expired")
                    .unwrap_or_else(|| "Session expired".into());

                ocsf::authentication_event(
                    ocsf::ACTIVITY_SERVICE_TICKET,
                    ocsf::STATUS_FAILURE,
                    ocsf::SEVERITY_MEDIUM,
                    email.as_deref(),
                    &format!("Token refresh failed: {message}"),
                );

                self.session.clear().await;
                Err(AuthError::Rejected(message))
            }
        }
    }

    /// Forward a call with the session's credentials.
    ///
    /// An explicit token on the request wins. Otherwise the principal's token
    /// is used, refreshed first if it is a JWT past its `exp`, and refreshed
    /// once more followed by a single retry if the backend answers 401.
    pub async fn forward(&self, mut request: ForwardedRequest) -> ForwardedResponse {
        if request.token.is_some() {
            return self.backend.send(&request).await;
        }
        let Some(principal) = self.session.principal().await else {
            return self.backend.send(&request).await;
        };

        let mut token = principal.token;
        let mut refreshed = false;
        if token::is_expired(&token) {
            refreshed = true;
            if let Ok(renewed) = self.refresh().await {
                token = renewed;
            }
        }

        request.token = Some(token);
        let response = self.backend.send(&request).await;

        if response.status == Some(StatusCode::UNAUTHORIZED) && !refreshed {
            match self.refresh().await {
                Ok(renewed) => {
                    request.token = Some(renewed);
                    return self.backend.send(&request).await;
                }
                Err(AuthError::NoRefreshToken) => {}
                Err(e) => tracing::warn!("Token refresh after 401 failed: {}", e),
            }
        }

        response
    }
}
