use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use invctl_core::{Claims, ServiceError};

use crate::api::AppState;
use crate::model::{LoginRequest, RegisterUser, TokenResponse, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(svc): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(svc.login(&body.username, &body.password)?))
}

async fn register(
    State(svc): State<AppState>,
    Json(body): Json<RegisterUser>,
) -> Result<(StatusCode, Json<User>), ServiceError> {
    let user = svc.register(body)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn logout(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ServiceError> {
    svc.revoke_session(&claims.sid)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me — the caller as seen by the token.
async fn me(Extension(claims): Extension<Claims>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": claims.sub,
        "username": claims.name,
        "groups": claims.groups,
        "is_root": claims.is_root(),
        "primary_role": claims.primary_role(),
    }))
}
