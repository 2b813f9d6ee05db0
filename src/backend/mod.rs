//! Outbound calls to the ITSM backend.
//!
//! `ForwardedRequest` describes one call, `BackendClient` executes it and
//! always answers with a `ForwardedResponse`: either the backend's JSON body
//! verbatim or the synthetic connection failure.

pub mod client;

use axum::http::StatusCode;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

pub use client::BackendClient;

/// Error message of the synthetic transport-failure body.
pub const CONNECTION_FAILED: &str = "API connection failed";

/// Methods the gateway forwards. Anything else is a caller error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// POST and PUT carry the payload as a JSON body.
    pub fn has_json_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ForwardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            other => Err(ForwardError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = ForwardError;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
}

/// One outbound backend call.
#[derive(Debug, Clone)]
pub struct ForwardedRequest {
    pub method: Method,
    /// Backend-relative path, appended verbatim to the base URL.
    pub path: String,
    /// Query parameters for GET, JSON body for POST/PUT, ignored for DELETE.
    pub payload: Option<Value>,
    /// Overrides the session's bearer token when set.
    pub token: Option<String>,
}

impl ForwardedRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
            token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Normalized result of a backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardedResponse {
    /// HTTP status of the backend reply; `None` for the synthetic failure.
    pub status: Option<StatusCode>,
    /// The backend's body, untouched.
    pub body: Value,
}

/// Exhaustive view of a backend envelope.
#[derive(Debug, PartialEq)]
pub enum Outcome<'a> {
    Success {
        data: Option<&'a Value>,
        pagination: Option<&'a Value>,
    },
    Failure {
        error: Option<&'a str>,
    },
}

impl ForwardedResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// The `{success: false, error: "API connection failed"}` stand-in.
    pub fn connection_failed() -> Self {
        Self {
            status: None,
            body: json!({"success": false, "error": CONNECTION_FAILED}),
        }
    }

    /// Only `success: true` counts as success; anything else is a failure.
    pub fn outcome(&self) -> Outcome<'_> {
        if self.body.get("success").and_then(Value::as_bool) == Some(true) {
            Outcome::Success {
                data: self.body.get("data").filter(|v| !v.is_null()),
                pagination: self.body.get("pagination").filter(|v| !v.is_null()),
            }
        } else {
            Outcome::Failure {
                error: self.body.get("error").and_then(Value::as_str),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome(), Outcome::Success { .. })
    }

    /// Whether the backend was never reached (or answered garbage).
    pub fn is_transport_failure(&self) -> bool {
        self.status.is_none()
    }

    /// Failure message, falling back to `default` when the backend gave none.
    pub fn error_or(&self, default: &str) -> Option<String> {
        match self.outcome() {
            Outcome::Success { .. } => None,
            Outcome::Failure { error } => Some(error.unwrap_or(default).to_string()),
        }
    }

    /// `data` on success, otherwise the provided substitute.
    pub fn data_or(&self, substitute: Value) -> Value {
        match self.outcome() {
            Outcome::Success {
                data: Some(data), ..
            } => data.clone(),
            _ => substitute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!(
            "PATCH".parse::<Method>(),
            Err(ForwardError::UnsupportedMethod(m)) if m == "PATCH"
        ));
        // Case matters, like on the wire
        assert!("get".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_from_http() {
        assert_eq!(
            Method::try_from(&axum::http::Method::PUT).unwrap(),
            Method::Put
        );
        assert!(Method::try_from(&axum::http::Method::OPTIONS).is_err());
    }

    #[test]
    fn test_json_body_methods() {
        assert!(Method::Post.has_json_body());
        assert!(Method::Put.has_json_body());
        assert!(!Method::Get.has_json_body());
        assert!(!Method::Delete.has_json_body());
    }

    #[test]
    fn test_connection_failed_shape() {
        let resp = ForwardedResponse::connection_failed();
        assert_eq!(
            resp.body,
            json!({"success": false, "error": "API connection failed"})
        );
        assert!(resp.is_transport_failure());
        assert_eq!(
            resp.outcome(),
            Outcome::Failure {
                error: Some("API connection failed")
            }
        );
    }

    #[test]
    fn test_outcome_success() {
        let resp = ForwardedResponse::new(
            StatusCode::OK,
            json!({"success": true, "data": [1, 2], "pagination": {"page": 1}}),
        );
        match resp.outcome() {
            Outcome::Success { data, pagination } => {
                assert_eq!(data, Some(&json!([1, 2])));
                assert_eq!(pagination, Some(&json!({"page": 1})));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_outcome_without_success_flag_is_failure() {
        let resp = ForwardedResponse::new(StatusCode::OK, json!({"data": {}}));
        assert_eq!(resp.outcome(), Outcome::Failure { error: None });

        let resp = ForwardedResponse::new(StatusCode::OK, json!([1, 2, 3]));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_error_or_fallback() {
        let resp = ForwardedResponse::new(StatusCode::BAD_REQUEST, json!({"success": false}));
        assert_eq!(resp.error_or("Login failed").as_deref(), Some("Login failed"));

        let resp = ForwardedResponse::new(
            StatusCode::UNAUTHORIZED,
            json!({"success": false, "error": "Invalid credentials"}),
        );
        assert_eq!(
            resp.error_or("Login failed").as_deref(),
            Some("Invalid credentials")
        );

        let resp = ForwardedResponse::new(StatusCode::OK, json!({"success": true}));
        assert!(resp.error_or("Login failed").is_none());
    }

    #[test]
    fn test_data_or_substitutes_on_failure() {
        let empty = json!({});
        assert_eq!(
            ForwardedResponse::connection_failed().data_or(empty.clone()),
            empty
        );
        let ok = ForwardedResponse::new(StatusCode::OK, json!({"success": true, "data": {"open": 3}}));
        assert_eq!(ok.data_or(empty.clone()), json!({"open": 3}));
        let no_data = ForwardedResponse::new(StatusCode::OK, json!({"success": true, "data": null}));
        assert_eq!(no_data.data_or(empty.clone()), empty);
    }
}
