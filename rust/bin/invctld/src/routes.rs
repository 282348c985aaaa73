//! Route registration: module routers, system endpoints and file downloads.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};

use invctl_blob::BlobStore;
use invctl_core::{Module, ServiceError};

use crate::bootstrap::Services;

/// Uploads are photos and scanned forms.
const MAX_BODY: usize = 32 * 1024 * 1024;

/// Build the complete router.
pub fn build_router(services: &Services) -> Router {
    let modules: [&dyn Module; 3] = [&services.auth, &services.stock, &services.sales];

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .merge(
            Router::new()
                .route("/files/{*key}", get(download))
                .with_state(services.blob.clone()),
        );

    // Mount each module under /{module_name}.
    for module in modules {
        app = app.nest(&format!("/{}", module.name()), module.routes());
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY)).layer(
        middleware::from_fn_with_state(services.auth.service().clone(), auth::auth_middleware),
    )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "invctld",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Uploaded documents by blob key, for any signed-in user.
async fn download(
    State(blob): State<Arc<dyn BlobStore>>,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    let data = blob
        .get(&key)?
        .ok_or_else(|| ServiceError::NotFound(format!("file '{}' not found", key)))?;
    Ok(([(header::CONTENT_TYPE, content_type(&key))], data).into_response())
}

fn content_type(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::bootstrap::open_services;
    use crate::config::{JwtConfig, RootConfig, ServerConfig, StorageConfig};

    fn services(dir: &tempfile::TempDir) -> Services {
        let config = ServerConfig {
            root: RootConfig {
                password_hash: auth::hash_password("rootpass123").unwrap(),
            },
            storage: StorageConfig {
                data_dir: dir.path().to_str().unwrap().to_string(),
            },
            jwt: JwtConfig {
                secret: "test-secret".into(),
                expire_secs: 3600,
            },
        };
        open_services(&config).unwrap()
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
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
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn login(app: &Router, username: &str, password: &str) -> String {
        let (status, body) = call(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn public_and_protected_paths() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(&services(&dir));

        let (status, _) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, "GET", "/version", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["name"], "invctld");

        let (status, _) = call(&app, "GET", "/stock/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, "GET", "/files/receipts/x.pdf", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registered_user_reaches_modules_by_role() {
        let dir = tempfile::tempdir().unwrap();
        let services = services(&dir);
        let app = build_router(&services);

        let (status, _) = call(
            &app,
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
        let token = login(&app, "sari", "gudang123").await;

        let (status, body) = call(&app, "GET", "/stock/dashboard", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["role"], "Warehouse Manager");

        let (status, _) = call(&app, "GET", "/sales/orders", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        services.blob.put("receipts/PO-1/resi.pdf", b"%PDF-1.4").unwrap();
        let (status, body) = call(&app, "GET", "/files/receipts/PO-1/resi.pdf", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"%PDF-1.4");
        let (status, _) = call(&app, "GET", "/files/receipts/missing.pdf", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("a/b.PDF"), "application/pdf");
        assert_eq!(content_type("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type("noext"), "application/octet-stream");
    }
}
