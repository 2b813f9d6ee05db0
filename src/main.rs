//! Dual-mode entrypoint: Lambda or local server.
//!
//! Detects Lambda runtime via `AWS_LAMBDA_RUNTIME_API` env var.
//! - Lambda: `lambda_http::run(app)`, API Gateway v2 to HTTP
//! - Local: `axum::serve(listener, app)`, plain TCP

use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use itsm_gateway::config::{Config, SessionBackendKind};
use itsm_gateway::session::{AnyBackend, PURGE_INTERVAL, spawn_purge_task};
use itsm_gateway::session::dynamodb::DynamoDbBackend;
use itsm_gateway::session::file::FileBackend;
use itsm_gateway::session::memory::InMemoryBackend;
use itsm_gateway::{AppState, create_app};

#[tokio::main]
async fn main() {
    let is_lambda = env::var("AWS_LAMBDA_RUNTIME_API").is_ok();

    // Init tracing: JSON for Lambda, pretty for local
    if is_lambda {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        let _ = dotenvy::dotenv();
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let config = Config::from_env().expect("Failed to load configuration");
    if !config.production && config.session_secret == itsm_gateway::config::DEV_SECRET {
        tracing::warn!("SECRET_KEY not set, using the development secret");
    }

    let sessions = match config.session_backend {
        SessionBackendKind::DynamoDb => {
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let dynamo_client = if config.dynamodb_endpoint.is_empty() {
                aws_sdk_dynamodb::Client::new(&sdk_config)
            } else {
                let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                    .endpoint_url(&config.dynamodb_endpoint)
                    .build();
                aws_sdk_dynamodb::Client::from_conf(dynamo_config)
            };
            tracing::info!(
                "Using DynamoDB session backend (table: {})",
                config.dynamodb_table
            );
            AnyBackend::DynamoDb(DynamoDbBackend::new(
                dynamo_client,
                config.dynamodb_table.clone(),
            ))
        }
        SessionBackendKind::File => {
            let backend = FileBackend::open(&config.session_file_dir)
                .expect("Failed to open session directory");
            tracing::info!(
                "Using file session backend (dir: {})",
                config.session_file_dir
            );
            AnyBackend::File(backend)
        }
        SessionBackendKind::Memory => {
            tracing::info!("Using in-memory session backend");
            AnyBackend::Memory(InMemoryBackend::new())
        }
    };

    tracing::info!("Forwarding to backend at {}", config.api_base_url);

    let state = Arc::new(AppState::new(
        config.clone(),
        reqwest::Client::new(),
        sessions,
    ));
    spawn_purge_task(state.session_layer.backend.clone(), PURGE_INTERVAL);

    let app = create_app(state);

    if is_lambda {
        tracing::info!("Starting in Lambda mode");
        lambda_http::run(app).await.expect("Lambda runtime error");
    } else {
        let addr = format!("0.0.0.0:{}", config.port);
        tracing::info!("Starting local server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind");
        axum::serve(listener, app).await.expect("Server error");
    }
}
