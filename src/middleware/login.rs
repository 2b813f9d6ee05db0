//! Login guard for protected pages and the proxy.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::session::middleware::SessionHandle;
use crate::session::store::FlashCategory;

/// Redirect anonymous callers to `/login?next=<original path>`.
pub async fn require_login(session: SessionHandle, req: Request, next: Next) -> Response {
    if session.principal().await.is_some() {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    session
        .flash(FlashCategory::Info, "Please log in to access this page.")
        .await;

    Redirect::to(&login_url(target)).into_response()
}

pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

/// `next` is honored only for local absolute paths.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/dashboard",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use axum::{Extension, Router};
    use serde_json::json;
    use tower::ServiceExt;

    fn app(session: SessionHandle) -> Router {
        Router::new()
            .route("/dashboard", get(|| async { "secret" }))
            .layer(axum::middleware::from_fn(require_login))
            .layer(Extension(session))
    }

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(
            login_url("/incidents?status=open"),
            "/login?next=%2Fincidents%3Fstatus%3Dopen"
        );
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/incidents/7")), "/incidents/7");
        assert_eq!(safe_next(Some("//evil.example")), "/dashboard");
        assert_eq!(safe_next(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_next(None), "/dashboard");
    }

    #[tokio::test]
    async fn test_anonymous_redirected() {
        let session = SessionHandle::new("sid".into(), SessionData::new());
        let req = Request::builder()
            .uri("/dashboard?tab=kpis")
            .body(Body::empty())
            .unwrap();
        let resp = app(session.clone()).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login?next=%2Fdashboard%3Ftab%3Dkpis"
        );
        assert_eq!(session.take_flashes().await.len(), 1);
    }

    #[tokio::test]
    async fn test_authenticated_passes() {
        let session = SessionHandle::new("sid".into(), SessionData::new());
        session
            .save_principal(&json!({"id": 1, "firstName": "Ana"}), "tok1", None)
            .await;
        let req = Request::builder().uri("/dashboard").body(Body::empty()).unwrap();
        let resp = app(session).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
