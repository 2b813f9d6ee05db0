//! Backend HTTP client: executes `ForwardedRequest`s.
//!
//! Never returns an error. Transport failures (connect, timeout, DNS, a body
//! that is not JSON) are logged and turned into the synthetic
//! `{success: false, error: "API connection failed"}` response.

use axum::http::header;
use serde_json::Value;
use std::time::Duration;

use super::{ForwardedRequest, ForwardedResponse, Method};

/// Fixed timeout for every backend call.
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self::with_timeout(http, base_url, BACKEND_TIMEOUT)
    }

    pub fn with_timeout(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Base URL and path concatenated as-is; the path is never interpreted.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute one call against the backend.
    pub async fn send(&self, request: &ForwardedRequest) -> ForwardedResponse {
        let url = self.url(&request.path);

        // `.json()` sets the content type itself
        let json_body = request.method.has_json_body() && request.payload.is_some();

        let mut builder = match request.method {
            Method::Get => {
                let builder = self.http.get(&url);
                match &request.payload {
                    Some(params @ Value::Object(_)) => builder.query(params),
                    _ => builder,
                }
            }
            Method::Delete => self.http.delete(&url),
            Method::Post | Method::Put => {
                let builder = if request.method == Method::Post {
                    self.http.post(&url)
                } else {
                    self.http.put(&url)
                };
                match &request.payload {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        if !json_body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        builder = builder.timeout(self.timeout);

        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(
                    "API request failed: {} {}: {}",
                    request.method,
                    request.path,
                    e
                );
                return ForwardedResponse::connection_failed();
            }
        };

        // Capture status before consuming the body
        let status = resp.status();

        match resp.json::<Value>().await {
            Ok(body) => {
                tracing::debug!(
                    "API request {} {} -> {}",
                    request.method,
                    request.path,
                    status
                );
                ForwardedResponse::new(status, body)
            }
            Err(e) => {
                tracing::error!(
                    "API request failed: {} {} returned {} with unreadable body: {}",
                    request.method,
                    request.path,
                    status,
                    e
                );
                ForwardedResponse::connection_failed()
            }
        }
    }
}
