//! Page contexts: the JSON a template would be rendered with.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::AppState;
use crate::auth::Principal;
use crate::session::middleware::SessionHandle;
use crate::session::store::Flash;

pub const APP_NAME: &str = "LinkedEye-FinSpot";
pub const APP_TAGLINE: &str = "Run. Operate. Transform Infrastructure, Intelligently.";

/// What a page may show about the signed-in user. Never carries tokens.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Option<String>,
    pub email: Option<String>,
    pub first_name: String,
    pub full_name: String,
    pub initials: String,
    pub role: Option<Value>,
    pub department: Option<Value>,
    pub job_title: Option<Value>,
    pub avatar: Option<Value>,
}

impl From<&Principal> for UserSummary {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.profile.id.clone(),
            email: p.profile.email.clone(),
            first_name: p.first_name().to_string(),
            full_name: p.full_name(),
            initials: p.initials(),
            role: p.profile.role.clone(),
            department: p.profile.department.clone(),
            job_title: p.profile.job_title.clone(),
            avatar: p.profile.avatar.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageContext {
    pub template: &'static str,
    pub app_name: &'static str,
    pub app_tagline: &'static str,
    pub backend_ws_url: String,
    pub user: Option<UserSummary>,
    pub flashes: Vec<Flash>,
    pub csrf_token: String,
    pub data: Value,
}

impl PageContext {
    /// Assemble the context, draining pending flashes.
    pub async fn build(
        state: &AppState,
        session: &SessionHandle,
        template: &'static str,
        data: Value,
    ) -> Self {
        let user = session.principal().await.as_ref().map(UserSummary::from);
        Self {
            template,
            app_name: APP_NAME,
            app_tagline: APP_TAGLINE,
            backend_ws_url: state.config.backend_ws_url.clone(),
            user,
            flashes: session.take_flashes().await,
            csrf_token: session.ensure_csrf_token().await,
            data,
        }
    }
}

impl IntoResponse for PageContext {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_summary_has_no_token() {
        let principal = Principal::from_profile(
            &json!({"id": 7, "firstName": "ana", "lastName": "lee", "role": "ADMIN"}),
            "secret-token",
        )
        .unwrap();
        let summary = serde_json::to_value(UserSummary::from(&principal)).unwrap();

        assert_eq!(summary["id"], "7");
        assert_eq!(summary["full_name"], "ana lee");
        assert_eq!(summary["initials"], "AL");
        assert_eq!(summary["role"], "ADMIN");
        assert!(!summary.to_string().contains("secret-token"));
    }
}
