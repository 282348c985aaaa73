use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use invctl_core::{Claims, ListParams, ListResult, Role, ServiceError, UserDirectory, UserRef};

use crate::api::AppState;
use crate::model::{Group, User, UserView};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/groups", put(set_groups))
        .route("/users/{id}/@activate", post(activate))
        .route("/users/{id}/@deactivate", post(deactivate))
        .route("/technicians", get(list_technicians))
        .route("/groups", get(list_groups))
}

#[derive(Deserialize)]
struct SetGroupsBody {
    groups: Vec<String>,
}

async fn list_users(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<UserView>>, ServiceError> {
    claims.require(Role::Master)?;
    Ok(Json(svc.list_users(&params)?))
}

async fn get_user(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, ServiceError> {
    if claims.sub != id {
        claims.require(Role::Master)?;
    }
    Ok(Json(svc.user_view(&id)?))
}

async fn set_groups(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(body): Json<SetGroupsBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    claims.require(Role::Master)?;
    let groups = svc.set_user_groups(&id, &body.groups)?;
    Ok(Json(serde_json::json!({ "id": id, "groups": groups })))
}

async fn activate(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    claims.require(Role::Master)?;
    Ok(Json(svc.set_active(&id, true)?))
}

async fn deactivate(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<User>, ServiceError> {
    claims.require(Role::Master)?;
    Ok(Json(svc.set_active(&id, false)?))
}

/// Technicians a warehouse manager can assign a received SKU to.
async fn list_technicians(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserRef>>, ServiceError> {
    claims.require_any(&[Role::WarehouseManager, Role::LeadTechnician, Role::Master])?;
    Ok(Json(svc.members(Role::Technician)?))
}

async fn list_groups(State(svc): State<AppState>) -> Result<Json<Vec<Group>>, ServiceError> {
    Ok(Json(svc.list_groups()?))
}
