//! GET/POST /login

use axum::Form;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;
use std::sync::Arc;

use super::page::PageContext;
use crate::AppState;
use crate::auth::AuthBridge;
use crate::middleware::login::{login_url, safe_next};
use crate::session::middleware::SessionHandle;
use crate::session::store::FlashCategory;
use crate::types::{LoginForm, NextParams};

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    Query(params): Query<NextParams>,
) -> Response {
    if session.principal().await.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    PageContext::build(
        &state,
        &session,
        "auth/login.html",
        json!({"next": params.next}),
    )
    .await
    .into_response()
}

/// Authenticate, then send the user where they were going.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    Query(params): Query<NextParams>,
    Form(form): Form<LoginForm>,
) -> Redirect {
    if session.principal().await.is_some() {
        return Redirect::to("/dashboard");
    }

    match AuthBridge::new(&state.backend, &session)
        .login(&form.email, &form.password)
        .await
    {
        Ok(principal) => {
            session
                .flash(
                    FlashCategory::Success,
                    format!("Welcome back, {}!", principal.first_name()),
                )
                .await;
            Redirect::to(safe_next(params.next.as_deref()))
        }
        Err(e) => {
            session.flash(FlashCategory::Error, e.to_string()).await;
            match params.next.as_deref() {
                Some(next) => Redirect::to(&login_url(next)),
                None => Redirect::to("/login"),
            }
        }
    }
}
