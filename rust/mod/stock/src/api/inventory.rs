use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, ServiceError};

use crate::api::{AppState, StatusFilter};
use crate::model::{AdjustmentStatus, AdjustmentView, Decision, SparePart, StockAdjustment};
use crate::service::inventory::{
    AdjustmentInput, InventoryList, PartInput, PartSearchHit, PartUsage,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory).post(add_part))
        .route("/inventory/search", get(search))
        .route("/inventory/usage", get(usage_history))
        .route("/inventory/{id}", get(get_part).put(edit_part))
        .route("/inventory/{id}/adjustments", post(request_adjustment))
        .route("/adjustments", get(list_adjustments))
        .route("/adjustments/{id}/@decide", post(decide_adjustment))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct UsageQuery {
    part_name: String,
}

#[derive(Deserialize)]
struct DecideBody {
    decision: Decision,
    #[serde(default)]
    reason: Option<String>,
}

async fn list_inventory(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<InventoryList>, ServiceError> {
    Ok(Json(svc.list_inventory(&claims)?))
}

async fn add_part(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<PartInput>,
) -> Result<(StatusCode, Json<SparePart>), ServiceError> {
    let part = svc.add_part(&claims, body)?;
    Ok((StatusCode::CREATED, Json(part)))
}

/// GET /inventory/search?q= — typeahead, open to every signed-in user.
async fn search(
    State(svc): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<PartSearchHit>>, ServiceError> {
    Ok(Json(svc.inventory_search(&q.q)?))
}

async fn usage_history(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<UsageQuery>,
) -> Result<Json<Vec<PartUsage>>, ServiceError> {
    Ok(Json(svc.part_usage_history(&claims, &q.part_name)?))
}

async fn get_part(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<SparePart>, ServiceError> {
    Ok(Json(svc.get_part(&claims, &id)?))
}

async fn edit_part(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<PartInput>,
) -> Result<Json<SparePart>, ServiceError> {
    Ok(Json(svc.edit_part(&claims, &id, body)?))
}

async fn request_adjustment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<AdjustmentInput>,
) -> Result<(StatusCode, Json<StockAdjustment>), ServiceError> {
    let adj = svc.request_adjustment(&claims, &id, body)?;
    Ok((StatusCode::CREATED, Json(adj)))
}

async fn list_adjustments(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<StatusFilter<AdjustmentStatus>>,
) -> Result<Json<Vec<AdjustmentView>>, ServiceError> {
    Ok(Json(svc.list_adjustments(&claims, q.status)?))
}

async fn decide_adjustment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<DecideBody>,
) -> Result<Json<AdjustmentView>, ServiceError> {
    Ok(Json(svc.decide_adjustment(&claims, &id, body.decision, body.reason)?))
}
