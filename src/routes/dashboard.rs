//! GET / and GET /dashboard

use axum::extract::State;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use super::page::PageContext;
use crate::AppState;
use crate::auth::AuthBridge;
use crate::backend::ForwardedRequest;
use crate::session::middleware::SessionHandle;
use crate::session::store::FlashCategory;

/// Context key and backend path of each dashboard panel.
const PANELS: [(&str, &str); 3] = [
    ("dashboard_data", "/dashboard"),
    ("kpis", "/dashboard/kpis"),
    ("quick_stats", "/dashboard/quick-stats"),
];

/// Operations dashboard. Renders even when every backend call fails.
pub async fn dashboard(State(state): State<Arc<AppState>>, session: SessionHandle) -> PageContext {
    let bridge = AuthBridge::new(&state.backend, &session);

    let mut data = Map::new();
    let mut first_error = None;
    for (key, path) in PANELS {
        let response = bridge.forward(ForwardedRequest::get(path)).await;
        if let Some(error) = response.error_or("Failed to load dashboard data") {
            tracing::warn!("Dashboard panel {} unavailable: {}", key, error);
            first_error.get_or_insert(error);
        }
        data.insert(key.into(), response.data_or(json!({})));
    }

    if let Some(error) = first_error {
        session.flash(FlashCategory::Warning, error).await;
    }

    PageContext::build(&state, &session, "dashboard/index.html", Value::Object(data)).await
}
