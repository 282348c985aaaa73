//! Sales HTTP API, nested under `/sales`.

use std::sync::Arc;

use axum::extract::{Extension, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use invctl_core::{Claims, FormData, ServiceError};
use stock::model::MovementRequest;

use crate::model::{Quotation, SalesOrder};
use crate::service::documents::PdfFile;
use crate::service::orders::{CreateOrder, OrderDetail};
use crate::service::quotations::{CreateQuotation, QuotationDetail};
use crate::service::{SalesDashboard, SalesService};

pub type AppState = Arc<SalesService>;

pub fn build_router(svc: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(order_detail))
        .route("/orders/{id}/payments", post(add_payment))
        .route("/orders/{id}/@ship", post(process_shipping))
        .route("/orders/{id}/shipping-files", post(upload_shipping_files))
        .route("/orders/{id}/invoice.pdf", get(invoice_pdf))
        .route("/orders/{id}/label.pdf", get(label_pdf))
        .route("/quotations", get(list_quotations).post(create_quotation))
        .route("/quotations/{id}", get(quotation_detail))
        .route("/quotations/{id}/@convert", post(convert_quotation))
        .route("/quotations/{id}/quotation.pdf", get(quotation_pdf))
        .route("/movements/{id}/@receive", post(receive_sku))
        .with_state(svc)
}

impl IntoResponse for PdfFile {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    inline_disposition(&self.file_name),
                ),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// `inline; filename="..."` with anything outside `[A-Za-z0-9._-]` replaced.
fn inline_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!("inline; filename=\"{}\"", safe)
}

async fn dashboard(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SalesDashboard>, ServiceError> {
    Ok(Json(svc.sales_dashboard(&claims)?))
}

async fn list_orders(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<SalesOrder>>, ServiceError> {
    Ok(Json(svc.list_orders(&claims)?))
}

async fn create_order(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<CreateOrder>,
) -> Result<(StatusCode, Json<SalesOrder>), ServiceError> {
    let order = svc.create_order(&claims, input)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn order_detail(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetail>, ServiceError> {
    Ok(Json(svc.order_detail(&claims, &id)?))
}

/// POST /orders/{id}/payments — multipart: `amount` and a `proof_of_transfer` file.
async fn add_payment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<OrderDetail>), ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let amount = form
        .int("amount")?
        .ok_or_else(|| ServiceError::Validation("amount is required".into()))?;
    let detail = svc.add_payment(&claims, &id, amount, form.take_file("proof_of_transfer"))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /orders/{id}/@ship — multipart: `shipping_type` and a `shipping_receipt` file.
async fn process_shipping(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SalesOrder>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let receipt = form.take_file("shipping_receipt");
    Ok(Json(svc.process_shipping(&claims, &id, form.string("shipping_type"), receipt)?))
}

/// POST /orders/{id}/shipping-files — multipart: `shipping_receipt` and/or
/// `proof_of_receipt`.
async fn upload_shipping_files(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SalesOrder>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let receipt = form.take_file("shipping_receipt");
    let proof = form.take_file("proof_of_receipt");
    Ok(Json(svc.upload_shipping_files(&claims, &id, receipt, proof)?))
}

async fn invoice_pdf(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<PdfFile, ServiceError> {
    svc.print_invoice_a4(&claims, &id)
}

async fn label_pdf(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<PdfFile, ServiceError> {
    svc.print_order_label(&claims, &id)
}

async fn list_quotations(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Quotation>>, ServiceError> {
    Ok(Json(svc.list_quotations(&claims)?))
}

async fn create_quotation(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<CreateQuotation>,
) -> Result<(StatusCode, Json<Quotation>), ServiceError> {
    let quotation = svc.create_quotation(&claims, input)?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

async fn quotation_detail(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QuotationDetail>, ServiceError> {
    Ok(Json(svc.quotation_detail(&claims, &id)?))
}

async fn convert_quotation(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SalesOrder>), ServiceError> {
    let order = svc.convert_to_order(&claims, &id)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn quotation_pdf(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<PdfFile, ServiceError> {
    svc.print_quotation_a4(&claims, &id)
}

/// POST /movements/{id}/@receive — multipart with a `receipt_form` file.
async fn receive_sku(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<MovementRequest>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    Ok(Json(svc.sales_receive_sku(&claims, &id, form.take_file("receipt_form"))?))
}
