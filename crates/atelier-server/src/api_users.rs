//! Users and items handlers.
//!
//! Every handler here runs its queries through [`AppState::with_session`],
//! so each request gets its own connection and gives it back on exit.

use crate::api::{ApiError, Json, Path, Query};
use crate::AppState;
use atelier_store::{
    create_user, create_user_item, get_items, get_user, get_user_by_email, get_users, Item,
    ItemCreate, User, UserCreate,
};
use axum::extract::Extension;
use serde::Deserialize;
use std::sync::Arc;

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

/// Handler for `POST /users/`.
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<UserCreate>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .with_session(move |conn| {
            if get_user_by_email(conn, &payload.email)?.is_some() {
                return Err(ApiError::Conflict("Email already registered".to_string()));
            }
            Ok(create_user(conn, &payload)?)
        })
        .await?;

    Ok(Json(user))
}

/// Handler for `GET /users/`.
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .with_session(move |conn| Ok(get_users(conn, page.skip, page.limit)?))
        .await?;

    Ok(Json(users))
}

/// Handler for `GET /users/{user_id}`.
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .with_session(move |conn| Ok(get_user(conn, user_id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Handler for `POST /users/{user_id}/items/`.
pub async fn create_item_for_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Json(payload): Json<ItemCreate>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .with_session(move |conn| {
            if get_user(conn, user_id)?.is_none() {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
            Ok(create_user_item(conn, &payload, user_id)?)
        })
        .await?;

    Ok(Json(item))
}

/// Handler for `GET /items/`.
pub async fn list_items_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state
        .with_session(move |conn| Ok(get_items(conn, page.skip, page.limit)?))
        .await?;

    Ok(Json(items))
}
