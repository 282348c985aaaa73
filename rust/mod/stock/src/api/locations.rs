use axum::extract::{Extension, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, FormData, ServiceError};

use crate::api::AppState;
use crate::model::{MovementRequest, Rack, SalesAssignment, Sku, Store};
use crate::service::movement::{
    AssignmentInput, AssignmentView, MovementOverview, MovementView, StoreInput,
};
use crate::service::racks::{RackInput, RackZone};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/racks", get(list_racks).post(create_rack))
        .route("/racks/grid", get(rack_grid))
        .route("/racks/{id}", put(update_rack).delete(delete_rack))
        .route("/shelving", get(unshelved))
        .route("/skus/{id}/@shelve", post(assign_shelf))
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/{id}", put(update_store).delete(delete_store))
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route("/assignments/{id}", put(update_assignment).delete(delete_assignment))
        .route("/movements", get(movement_overview).post(create_movement))
        .route("/movements/incoming", get(incoming))
        .route("/movements/{id}/@receive", post(confirm_received))
}

#[derive(Deserialize)]
struct ShelveBody {
    rack_id: String,
}

async fn list_racks(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Rack>>, ServiceError> {
    Ok(Json(svc.list_racks(&claims)?))
}

async fn create_rack(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<RackInput>,
) -> Result<(StatusCode, Json<Rack>), ServiceError> {
    let rack = svc.create_rack(&claims, body)?;
    Ok((StatusCode::CREATED, Json(rack)))
}

async fn rack_grid(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RackZone>>, ServiceError> {
    Ok(Json(svc.rack_grid(&claims)?))
}

async fn update_rack(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<RackInput>,
) -> Result<Json<Rack>, ServiceError> {
    Ok(Json(svc.update_rack(&claims, &id, body)?))
}

async fn delete_rack(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_rack(&claims, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unshelved(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Sku>>, ServiceError> {
    Ok(Json(svc.list_unshelved(&claims)?))
}

async fn assign_shelf(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<ShelveBody>,
) -> Result<Json<Sku>, ServiceError> {
    Ok(Json(svc.assign_shelf(&claims, &id, &body.rack_id)?))
}

async fn list_stores(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Store>>, ServiceError> {
    Ok(Json(svc.list_stores(&claims)?))
}

async fn create_store(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<StoreInput>,
) -> Result<(StatusCode, Json<Store>), ServiceError> {
    let store = svc.create_store(&claims, body)?;
    Ok((StatusCode::CREATED, Json(store)))
}

async fn update_store(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<StoreInput>,
) -> Result<Json<Store>, ServiceError> {
    Ok(Json(svc.update_store(&claims, &id, body)?))
}

async fn delete_store(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_store(&claims, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_assignments(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AssignmentView>>, ServiceError> {
    Ok(Json(svc.list_assignments(&claims)?))
}

async fn create_assignment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<AssignmentInput>,
) -> Result<(StatusCode, Json<SalesAssignment>), ServiceError> {
    let assignment = svc.create_assignment(&claims, body)?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_assignment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<AssignmentInput>,
) -> Result<Json<SalesAssignment>, ServiceError> {
    Ok(Json(svc.update_assignment(&claims, &id, body)?))
}

async fn delete_assignment(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_assignment(&claims, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn movement_overview(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MovementOverview>, ServiceError> {
    Ok(Json(svc.movement_overview(&claims)?))
}

/// POST /movements — multipart: `sku_id`, `store_id`, optional `delivery_form`.
async fn create_movement(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MovementRequest>), ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let sku_id = form
        .string("sku_id")
        .ok_or_else(|| ServiceError::Validation("sku_id is required".into()))?;
    let store_id = form
        .string("store_id")
        .ok_or_else(|| ServiceError::Validation("store_id is required".into()))?;
    let delivery_form = form.take_file("delivery_form");
    let movement = svc.create_movement(&claims, &sku_id, &store_id, delivery_form)?;
    Ok((StatusCode::CREATED, Json(movement)))
}

async fn incoming(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MovementView>>, ServiceError> {
    Ok(Json(svc.incoming_movements(&claims)?))
}

/// POST /movements/{id}/@receive — multipart with the `receipt_form` file.
async fn confirm_received(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<MovementRequest>, ServiceError> {
    let mut form = FormData::read(multipart).await?;
    let receipt = form.take_file("receipt_form");
    Ok(Json(svc.confirm_received(&claims, &id, receipt)?))
}
