//! GET/POST /register

use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::Value;
use std::sync::Arc;

use super::page::PageContext;
use crate::AppState;
use crate::auth::{AuthBridge, Registration};
use crate::session::middleware::SessionHandle;
use crate::session::store::FlashCategory;

pub async fn register_page(State(state): State<Arc<AppState>>, session: SessionHandle) -> Response {
    if session.principal().await.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    PageContext::build(&state, &session, "auth/register.html", Value::Null)
        .await
        .into_response()
}

/// Submit a registration. Accounts start pending approval, so no login follows.
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    Form(registration): Form<Registration>,
) -> Redirect {
    if session.principal().await.is_some() {
        return Redirect::to("/dashboard");
    }

    match AuthBridge::new(&state.backend, &session)
        .register(&registration)
        .await
    {
        Ok(()) => {
            session
                .flash(
                    FlashCategory::Success,
                    "Registration successful! Your account is pending approval.",
                )
                .await;
            Redirect::to("/login")
        }
        Err(e) => {
            session.flash(FlashCategory::Error, e.to_string()).await;
            Redirect::to("/register")
        }
    }
}
