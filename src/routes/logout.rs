//! GET|POST /logout

use axum::extract::State;
use axum::response::Redirect;
use std::sync::Arc;

use crate::AppState;
use crate::auth::AuthBridge;
use crate::session::middleware::SessionHandle;
use crate::session::store::FlashCategory;

/// End the session. Safe to call when already logged out.
pub async fn logout(State(state): State<Arc<AppState>>, session: SessionHandle) -> Redirect {
    AuthBridge::new(&state.backend, &session).logout().await;

    // Lands in a fresh anonymous record, the old one is gone
    session
        .flash(FlashCategory::Info, "You have been logged out.")
        .await;

    Redirect::to("/login")
}
