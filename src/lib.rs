//! ITSM gateway: session-backed auth bridge and request forwarder.
//!
//! Same Axum router runs in both Lambda and local server contexts.
//! Detection via `AWS_LAMBDA_RUNTIME_API` env var.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod ocsf;
pub mod routes;
pub mod session;
pub mod types;

use axum::Router;
use axum::middleware::from_fn;
use axum::routing::{any, get};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::backend::BackendClient;
use crate::config::Config;
use crate::middleware::csrf::require_csrf;
use crate::middleware::login::require_login;
use crate::session::AnyBackend;
use crate::session::middleware::{SessionLayer, session_middleware};

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub backend: BackendClient,
    pub session_layer: Arc<SessionLayer<AnyBackend>>,
}

impl AppState {
    pub fn new(config: Config, http_client: reqwest::Client, sessions: AnyBackend) -> Self {
        let backend = BackendClient::new(http_client, config.api_base_url.clone());
        let session_layer = Arc::new(SessionLayer::new(
            sessions,
            &config.session_secret,
            config.session_https_only,
        ));
        Self {
            config,
            backend,
            session_layer,
        }
    }
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let session_layer = state.session_layer.clone();

    let protected_pages = Router::new()
        .route("/", get(routes::dashboard::dashboard))
        .route("/dashboard", get(routes::dashboard::dashboard))
        .layer(from_fn(require_login));

    // Everything a browser form can reach is CSRF-checked
    let csrf_routes = Router::new()
        .route(
            "/login",
            get(routes::login::login_page).post(routes::login::login),
        )
        .route(
            "/register",
            get(routes::register::register_page).post(routes::register::register),
        )
        .route(
            "/logout",
            get(routes::logout::logout).post(routes::logout::logout),
        )
        .merge(protected_pages)
        .layer(from_fn(require_csrf));

    // Exempt from CSRF: unreachable without a logged-in session
    let proxy_routes = Router::new()
        .route(
            &format!("{}/{{*path}}", routes::proxy::PROXY_PREFIX),
            any(routes::proxy::proxy),
        )
        .layer(from_fn(require_login));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(csrf_routes)
        .merge(proxy_routes)
        .method_not_allowed_fallback(routes::fallback::method_not_allowed)
        .fallback(routes::fallback::not_found)
        .layer(from_fn(move |req, next| {
            let layer = session_layer.clone();
            session_middleware(layer, req, next)
        }))
        .layer(CatchPanicLayer::custom(routes::fallback::panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
