mod inventory;
mod locations;
mod purchase;
mod workshop;

use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, ServiceError};

use crate::service::dashboard::TechnicianStats;
use crate::service::StockService;

/// Shared application state.
pub type AppState = Arc<StockService>;

/// `?status=` filter for list endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusFilter<S> {
    status: Option<S>,
}

/// Build the stock API router.
///
/// Routes are relative; the server nests them under `/stock` behind the
/// auth middleware, which supplies `Extension<Claims>`.
pub fn build_router(svc: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/analytics/technicians", get(technician_analytics))
        .merge(purchase::routes())
        .merge(workshop::routes())
        .merge(inventory::routes())
        .merge(locations::routes())
        .with_state(svc)
}

async fn dashboard(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    Ok(Json(svc.dashboard(&claims)?))
}

async fn technician_analytics(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<TechnicianStats>>, ServiceError> {
    Ok(Json(svc.technician_analytics(&claims)?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::testutil::{as_user, fixture, received_sku, Fixture};

    const BOUNDARY: &str = "INVCTLBOUNDARY";

    fn app(fx: &Fixture, user: &str) -> Router {
        build_router(fx.svc.clone()).layer(Extension(as_user(user)))
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn call(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send(router, req).await
    }

    async fn post_form(
        router: Router,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> (StatusCode, Value) {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        send(router, req).await
    }

    #[tokio::test]
    async fn purchase_order_approval_over_http() {
        let fx = fixture();
        let (status, po) = post_form(
            app(&fx, "pur1"),
            "/purchase-orders",
            &[("po_number", "PO-100"), ("expected_sku_count", "3"), ("buy_price", "4500000")],
            &[("forwarder_receipt", "resi.pdf", b"%PDF-1.4")],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{po}");
        assert_eq!(po["status"], "PENDING_APPROVAL");
        let id = po["id"].as_str().unwrap();

        let (status, body) =
            call(app(&fx, "pur1"), "POST", &format!("/purchase-orders/{id}/@approve"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let (status, body) = call(
            app(&fx, "wm1"),
            "POST",
            &format!("/purchase-orders/{id}/@reject"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");

        let (status, body) =
            call(app(&fx, "wm1"), "POST", &format!("/purchase-orders/{id}/@approve"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");

        let (status, body) = call(
            app(&fx, "wm1"),
            "POST",
            &format!("/receiving/{id}/skus"),
            Some(json!({"sku_code": "MC-100", "name": "AC Daikin", "technician_id": "tech1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "QC");

        let (status, body) = call(app(&fx, "wm1"), "GET", "/purchase-orders?status=DELIVERED", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn qc_submission_is_multipart() {
        let fx = fixture();
        let sku = received_sku(&fx, "MC-200");
        let uri = format!("/skus/{}/qc", sku.id);

        let (status, _) = post_form(app(&fx, "tech2"), &uri, &[("condition_notes", "ok")], &[]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, form) = post_form(
            app(&fx, "tech1"),
            &uri,
            &[
                ("condition_notes", "compressor weak"),
                ("needs_spare_part", "on"),
                ("part_name", "Kapasitor 35uF"),
                ("part_quantity", "1"),
            ],
            &[("qc_document", "qc.jpg", b"JPEG")],
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{form}");
        let qc_id = form["id"].as_str().unwrap();

        let (status, body) = call(
            app(&fx, "lead1"),
            "POST",
            &format!("/qc/{qc_id}/@verify"),
            Some(json!({"decision": "reject"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lead_comments"], "Rejected. Please fix.");

        let (status, list) =
            call(app(&fx, "wm1"), "GET", "/part-requests?status=REJECTED", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, history) =
            call(app(&fx, "sales1"), "GET", &format!("/skus/{}/history", sku.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["timeline"][0]["type"], "QC_REJECTED");
    }

    #[tokio::test]
    async fn search_and_dashboard() {
        let fx = fixture();
        let (status, _) = call(
            app(&fx, "wm1"),
            "POST",
            "/inventory",
            Some(json!({"part_name": "Remote AC", "location": "Rak 3"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, hits) = call(app(&fx, "sales1"), "GET", "/inventory/search?q=remote", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits[0]["name"], "Remote AC");
        assert_eq!(hits[0]["location"], "Rak 3");
        assert_eq!(hits[0]["supplier"], "-");

        let (status, dash) = call(app(&fx, "tech1"), "GET", "/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dash["role"], "Technician");
    }
}
