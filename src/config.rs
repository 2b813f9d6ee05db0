//! Application configuration via environment variables.

use std::env;

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
const API_VERSION_SUFFIX: &str = "/api/v1";

/// Session signing secret used when `SECRET_KEY` is unset.
pub const DEV_SECRET: &str = "itsm-gateway-secret-key-change-me";

/// Which `SessionBackend` the gateway runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackendKind {
    Memory,
    File,
    DynamoDb,
}

impl SessionBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBackendKind::Memory => "memory",
            SessionBackendKind::File => "file",
            SessionBackendKind::DynamoDb => "dynamodb",
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend REST base URL, including the API version prefix.
    pub api_base_url: String,
    /// Realtime base URL handed to client-rendered pages.
    pub backend_ws_url: String,
    pub session_secret: String,
    pub port: u16,
    pub production: bool,
    pub session_https_only: bool,
    pub session_backend: SessionBackendKind,
    pub session_file_dir: String,
    pub dynamodb_table: String,
    pub dynamodb_endpoint: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Every variable is optional; only malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = match non_empty(lookup("API_BASE_URL")) {
            Some(url) => url,
            None => format!(
                "{}{}",
                non_empty(lookup("BACKEND_API_URL")).unwrap_or_else(|| DEFAULT_BACKEND_URL.into()),
                API_VERSION_SUFFIX
            ),
        };
        let backend_ws_url = non_empty(lookup("BACKEND_WS_URL"))
            .unwrap_or_else(|| derive_ws_url(&api_base_url).to_string());

        let production = lookup("APP_ENV").is_some_and(|v| v == "production");
        let session_https_only = match lookup("SESSION_HTTPS_ONLY") {
            Some(v) => v == "true" || v == "1" || v == "True",
            None => production,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT".into(), raw))?,
            None => 8000,
        };

        let session_backend = match lookup("SESSION_BACKEND").as_deref() {
            None | Some("file") => SessionBackendKind::File,
            Some("memory") => SessionBackendKind::Memory,
            Some("dynamodb") => SessionBackendKind::DynamoDb,
            Some(other) => {
                return Err(ConfigError::Invalid(
                    "SESSION_BACKEND".into(),
                    other.to_string(),
                ));
            }
        };

        Ok(Self {
            api_base_url,
            backend_ws_url,
            session_secret: non_empty(lookup("SECRET_KEY")).unwrap_or_else(|| DEV_SECRET.into()),
            port,
            production,
            session_https_only,
            session_backend,
            session_file_dir: lookup("SESSION_FILE_DIR").unwrap_or_else(|| "./sessions".into()),
            dynamodb_table: lookup("DYNAMODB_TABLE").unwrap_or_else(|| "itsm_sessions".into()),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").unwrap_or_default(),
        })
    }

    /// Configuration for tests, pointed at the given backend API base URL.
    pub fn test_default(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            backend_ws_url: derive_ws_url(api_base_url).to_string(),
            session_secret: "test-secret-key".into(),
            port: 8000,
            production: false,
            session_https_only: false,
            session_backend: SessionBackendKind::Memory,
            session_file_dir: "./sessions".into(),
            dynamodb_table: "itsm_sessions".into(),
            dynamodb_endpoint: String::new(),
        }
    }
}

/// Strip everything from the last `/api` onward.
///
/// `http://host:5000/api/v1` becomes `http://host:5000`; a URL without
/// `/api` is returned unchanged.
pub fn derive_ws_url(api_base_url: &str) -> &str {
    api_base_url
        .rsplit_once("/api")
        .map(|(base, _)| base)
        .unwrap_or(api_base_url)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?}")]
    Invalid(String, String),
}
