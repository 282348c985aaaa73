use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, FormData, ListParams, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{PurchaseOrder, PurchasingNotification, Sku};
use crate::service::purchase::{AddSku, CreatePurchaseOrder, ReceivingDetail};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchase-orders", get(list_pos).post(create_po))
        .route("/purchase-orders/pending", get(pending_approvals))
        .route("/purchase-orders/{id}", get(get_po))
        .route("/purchase-orders/{id}/forwarder-receipt", post(forwarder_receipt))
        .route("/purchase-orders/{id}/@approve", post(approve_po))
        .route("/purchase-orders/{id}/@reject", post(reject_po))
        .route("/receiving", get(list_receiving))
        .route("/receiving/{id}", get(receiving_detail))
        .route("/receiving/{id}/skus", post(add_sku))
        .route("/receiving/{id}/delivery-receipt", post(delivery_receipt))
        .route("/receiving/{id}/@report", post(report_packing_list))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/@resolve", post(resolve_notification))
}

#[derive(Deserialize)]
struct ReasonBody {
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct NotificationQuery {
    #[serde(default)]
    all: bool,
}

async fn list_pos(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<PurchaseOrder>>, ServiceError> {
    Ok(Json(svc.list_pos(&claims, &params)?))
}

/// POST /purchase-orders — multipart, with an optional `forwarder_receipt` file.
async fn create_po(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PurchaseOrder>), ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let input = CreatePurchaseOrder {
        po_number: form.string("po_number").unwrap_or_default(),
        expected_sku_count: form.int("expected_sku_count")?.unwrap_or(0),
        buy_price: form.int("buy_price")?.unwrap_or(0),
    };
    let receipt = form.take_file("forwarder_receipt");
    let po = svc.create_po(&claims, input, receipt)?;
    Ok((StatusCode::CREATED, Json(po)))
}

async fn pending_approvals(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PurchaseOrder>>, ServiceError> {
    Ok(Json(svc.list_pending_approvals(&claims)?))
}

async fn get_po(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    Ok(Json(svc.get_po(&claims, &id)?))
}

async fn forwarder_receipt(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_file("forwarder_receipt")
        .ok_or_else(|| ServiceError::Validation("forwarder_receipt file is required".into()))?;
    Ok(Json(svc.upload_forwarder_receipt(&claims, &id, file)?))
}

async fn approve_po(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    Ok(Json(svc.approve_po(&claims, &id)?))
}

async fn reject_po(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<ReasonBody>,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    Ok(Json(svc.reject_po(&claims, &id, &body.reason)?))
}

async fn list_receiving(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PurchaseOrder>>, ServiceError> {
    Ok(Json(svc.list_receiving(&claims)?))
}

async fn receiving_detail(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ReceivingDetail>, ServiceError> {
    Ok(Json(svc.receiving_detail(&claims, &id)?))
}

async fn add_sku(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<AddSku>,
) -> Result<(StatusCode, Json<Sku>), ServiceError> {
    let sku = svc.add_sku(&claims, &id, body)?;
    Ok((StatusCode::CREATED, Json(sku)))
}

async fn delivery_receipt(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let file = form
        .take_file("delivery_receipt")
        .ok_or_else(|| ServiceError::Validation("delivery_receipt file is required".into()))?;
    Ok(Json(svc.upload_delivery_receipt(&claims, &id, file)?))
}

async fn report_packing_list(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Result<(StatusCode, Json<PurchasingNotification>), ServiceError> {
    let note = svc.report_packing_list(&claims, &id, &body.message)?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn list_notifications(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<NotificationQuery>,
) -> Result<Json<Vec<PurchasingNotification>>, ServiceError> {
    Ok(Json(svc.list_notifications(&claims, q.all)?))
}

async fn resolve_notification(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PurchasingNotification>, ServiceError> {
    Ok(Json(svc.resolve_notification(&claims, &id)?))
}
