use std::collections::HashMap;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::error::AppError;
use crate::handlers::json::Json;
use crate::handlers::path::Path;
use crate::models::UserPayload;
use crate::state::AppState;

const DEFAULT_OFFSET: u32 = 0;
const DEFAULT_LIMIT: u32 = 10;

/// `/users` 配下のルート（`/api/v1` にネストして使う）
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
}

/// POST /api/v1/users
///
/// 201 と作成したユーザーを返す
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, axum::Json(user)))
}

/// GET /api/v1/users/{id}
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.get_user_by_id(&id).await?;
    Ok(axum::Json(user))
}

/// PUT /api/v1/users/{id}
///
/// ボディに `id` があってもパスの値を使う
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.update_user(&id, payload).await?;
    Ok(axum::Json(user))
}

/// DELETE /api/v1/users/{id}
///
/// 成功時は 204（ボディなし）
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.user_service.delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users?offset=0&limit=10
///
/// 数値として解釈できない値はデフォルトにフォールバックする
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let offset = parse_or(params.get("offset"), DEFAULT_OFFSET);
    let limit = parse_or(params.get("limit"), DEFAULT_LIMIT);

    let users = state.user_service.list_users(offset, limit).await?;
    Ok(axum::Json(users))
}

fn parse_or(value: Option<&String>, default: u32) -> u32 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
