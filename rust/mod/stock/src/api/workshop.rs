use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, FormData, ServiceError};

use crate::api::{AppState, StatusFilter};
use crate::model::{Decision, QcForm, RequestStatus, Sku, SkuStatus, SparePartRequest};
use crate::service::history::SkuHistory;
use crate::service::parts::PartRequestView;
use crate::service::qc::{FinalCheck, InstallationSubmission, PhotoUpload, QcFormView, QcSubmission};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/skus", get(list_skus))
        .route("/skus/{id}", get(get_sku))
        .route("/skus/{id}/history", get(sku_history))
        .route("/skus/{id}/qc", get(qc_form).post(submit_qc))
        .route("/qc/pending", get(pending_qc))
        .route("/qc/{id}/@verify", post(verify_qc))
        .route("/qc/{id}/installation", get(installation).post(submit_installation))
        .route("/qc/{id}/@final-check", post(final_check))
        .route("/final-check/pending", get(pending_final_check))
        .route("/part-requests", get(list_part_requests))
        .route("/part-requests/{id}", get(manage_part_request))
        .route("/part-requests/{id}/@issue", post(issue_part))
        .route("/part-requests/{id}/@approve-buy", post(approve_buy))
        .route("/part-requests/{id}/@received", post(mark_received))
        .route("/part-requests/{id}/@lead-receipt", post(lead_receipt))
}

#[derive(Deserialize)]
struct VerifyBody {
    decision: Decision,
    #[serde(default)]
    comments: Option<String>,
}

#[derive(Deserialize)]
struct DecisionBody {
    decision: Decision,
}

async fn list_skus(
    State(svc): State<AppState>,
    Query(q): Query<StatusFilter<SkuStatus>>,
) -> Result<Json<Vec<Sku>>, ServiceError> {
    Ok(Json(svc.list_skus(q.status)?))
}

async fn get_sku(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sku>, ServiceError> {
    Ok(Json(svc.get_sku(&id)?))
}

async fn sku_history(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SkuHistory>, ServiceError> {
    Ok(Json(svc.sku_history(&claims, &id)?))
}

async fn qc_form(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QcFormView>, ServiceError> {
    Ok(Json(svc.qc_form_view(&claims, &id)?))
}

/// POST /skus/{id}/qc — multipart: `condition_notes`, `needs_spare_part`,
/// `part_name`, `part_quantity` and an optional `qc_document` file.
async fn submit_qc(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<QcForm>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let input = QcSubmission {
        condition_notes: form.string("condition_notes").unwrap_or_default(),
        needs_spare_part: form.flag("needs_spare_part"),
        part_name: form.string("part_name"),
        part_quantity: form.int("part_quantity")?,
        document: form.take_file("qc_document"),
    };
    Ok(Json(svc.submit_qc(&claims, &id, input)?))
}

async fn pending_qc(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<QcFormView>>, ServiceError> {
    Ok(Json(svc.list_pending_qc(&claims)?))
}

async fn verify_qc(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<QcForm>, ServiceError> {
    Ok(Json(svc.verify_qc(&claims, &id, body.decision, body.comments)?))
}

async fn installation(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<QcFormView>, ServiceError> {
    Ok(Json(svc.installation_view(&claims, &id)?))
}

/// POST /qc/{id}/installation — multipart: `installation_notes`,
/// `old_part_name`, repeated `before_photos`/`before_remarks` and
/// `after_photos`/`after_remarks`. Remarks pair with photos by position.
async fn submit_installation(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<QcForm>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let mut photos = |files: &str, remarks: &str| -> Vec<PhotoUpload> {
        let mut remarks = form.texts(remarks).into_iter();
        form.take_files(files)
            .into_iter()
            .map(|file| PhotoUpload {
                file,
                remarks: remarks.next(),
            })
            .collect()
    };
    let before = photos("before_photos", "before_remarks");
    let after = photos("after_photos", "after_remarks");
    let input = InstallationSubmission {
        notes: form.string("installation_notes").unwrap_or_default(),
        before,
        after,
        old_part_name: form.string("old_part_name"),
    };
    Ok(Json(svc.submit_installation(&claims, &id, input)?))
}

async fn pending_final_check(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<QcFormView>>, ServiceError> {
    Ok(Json(svc.list_pending_final_check(&claims)?))
}

async fn final_check(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<FinalCheck>,
) -> Result<Json<QcForm>, ServiceError> {
    Ok(Json(svc.final_check(&claims, &id, body)?))
}

async fn list_part_requests(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<StatusFilter<RequestStatus>>,
) -> Result<Json<Vec<PartRequestView>>, ServiceError> {
    Ok(Json(svc.list_part_requests(&claims, q.status)?))
}

async fn manage_part_request(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PartRequestView>, ServiceError> {
    Ok(Json(svc.manage_part_request(&claims, &id)?))
}

async fn issue_part(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SparePartRequest>, ServiceError> {
    Ok(Json(svc.issue_part(&claims, &id)?))
}

async fn approve_buy(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SparePartRequest>, ServiceError> {
    Ok(Json(svc.approve_buy(&claims, &id)?))
}

async fn mark_received(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SparePartRequest>, ServiceError> {
    Ok(Json(svc.mark_part_received(&claims, &id)?))
}

async fn lead_receipt(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> Result<Json<SparePartRequest>, ServiceError> {
    Ok(Json(svc.approve_part_receipt(&claims, &id, body.decision)?))
}
