mod middleware;
mod session;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::service::AuthService;

pub use middleware::auth_middleware;

/// Shared application state.
pub type AppState = Arc<AuthService>;

/// Build the auth API router.
///
/// Routes are relative; the server nests them under `/auth` and applies
/// [`auth_middleware`] to the whole application.
pub fn build_router(svc: AppState) -> Router {
    Router::new()
        .merge(session::routes())
        .merge(users::routes())
        .with_state(svc)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::testutil;

    fn app(svc: AppState) -> Router {
        Router::new()
            .nest("/auth", build_router(svc.clone()))
            .layer(axum::middleware::from_fn_with_state(svc, auth_middleware))
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("authorization", format!("Bearer {}", t));
        }
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn token(router: &Router, username: &str, password: &str) -> String {
        let (status, body) = call(
            router,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_login_me_logout() {
        let router = app(testutil::service());

        let (status, _) = call(
            &router,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "sari",
                "password": "gudang123",
                "password_confirm": "gudang123",
                "role": "Warehouse Manager"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let t = token(&router, "sari", "gudang123").await;
        let (status, me) = call(&router, "GET", "/auth/me", Some(&t), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "sari");
        assert_eq!(me["primary_role"], "Warehouse Manager");

        let (status, _) = call(&router, "POST", "/auth/logout", Some(&t), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = call(&router, "GET", "/auth/me", Some(&t), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let router = app(testutil::service());
        let (status, _) = call(&router, "GET", "/auth/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_admin_needs_master_role() {
        let svc = testutil::service();
        let router = app(svc.clone());
        svc.register(crate::model::RegisterUser {
            username: "tono".into(),
            password: "teknisi123".into(),
            password_confirm: "teknisi123".into(),
            role: "Technician".into(),
        })
        .unwrap();

        let tech = token(&router, "tono", "teknisi123").await;
        let (status, body) = call(&router, "GET", "/auth/users", Some(&tech), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let root = token(&router, "root", "rootpass123").await;
        let (status, body) = call(&router, "GET", "/auth/users?status=Technician", Some(&root), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let id = body["items"][0]["id"].as_str().unwrap().to_string();
        let (status, body) = call(
            &router,
            "PUT",
            &format!("/auth/users/{}/groups", id),
            Some(&root),
            Some(json!({"groups": ["Technician", "Master Role"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups"], json!(["Master Role", "Technician"]));
    }
}
