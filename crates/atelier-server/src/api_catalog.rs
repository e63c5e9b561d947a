//! Catalog handlers: validated bodies echoed back through response shapes.

use crate::api::{validated, ApiError, Json, Path, Query};
use crate::catalog::{Image, Item, Log, Offer, UserIn, UserInDb, UserOut};
use axum::{
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Optional `q` search parameter.
#[derive(Debug, Deserialize)]
pub struct ItemQuery {
    pub q: Option<String>,
}

/// Body of `PUT /catalog/items/{item_id}`, with the item nested under a key.
#[derive(Debug, Deserialize)]
pub struct EmbeddedItem {
    pub item: Item,
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(hello_handler))
        .route("/items/", get(read_items_handler).post(create_item_handler))
        .route(
            "/items/{item_id}",
            get(read_item_handler).put(update_item_handler),
        )
        .route("/elements/", get(read_elements_handler))
        .route("/user/", post(create_user_handler))
        .route("/offers/", post(create_offer_handler))
        .route("/images/multiple/", post(create_images_handler))
        .route("/index-weights/", post(create_index_weights_handler))
        .route("/log/{id}", put(update_log_handler))
}

fn unprocessable(errors: ValidationErrors) -> ApiError {
    ApiError::Unprocessable(errors.to_string())
}

/// Returns the value of cookie `name`, if the request carries it.
fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Handler for `GET /catalog`.
pub async fn hello_handler() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

/// Handler for `GET /catalog/items/`.
///
/// Echoes the `ads_id` cookie and the `User-Agent` header.
pub async fn read_items_handler(headers: HeaderMap) -> Json<Value> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());

    Json(json!({
        "ads_id": cookie(&headers, "ads_id"),
        "User-Agent": user_agent,
    }))
}

/// Handler for `GET /catalog/elements/`. Deprecated.
pub async fn read_elements_handler() -> impl IntoResponse {
    tracing::warn!(route = "/catalog/elements/", "deprecated route called");
    (
        [(HeaderName::from_static("deprecation"), "true")],
        Json(json!([{ "item_id": "Foo" }])),
    )
}

/// Handler for `GET /catalog/items/{item_id}`.
pub async fn read_item_handler(
    Path(item_id): Path<i64>,
    Query(query): Query<ItemQuery>,
) -> Json<Value> {
    Json(json!({ "item_id": item_id, "q": query.q }))
}

/// Handler for `POST /catalog/items/`.
///
/// Returns 201 with only the fields the client supplied.
pub async fn create_item_handler(
    Json(item): Json<Item>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    item.check().map_err(unprocessable)?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for `PUT /catalog/items/{item_id}`.
pub async fn update_item_handler(
    Path(item_id): Path<i64>,
    Json(body): Json<EmbeddedItem>,
) -> Result<Json<Value>, ApiError> {
    body.item.check().map_err(unprocessable)?;
    Ok(Json(json!({ "item_id": item_id, "item": body.item })))
}

/// Handler for `POST /catalog/user/`.
///
/// The response is a [`UserOut`], so the password never leaves the server.
pub async fn create_user_handler(Json(user): Json<UserIn>) -> Result<Json<UserOut>, ApiError> {
    let user = validated(user)?;
    let stored = UserInDb::from(user);

    // Nothing is persisted; the hash only shows what would be.
    tracing::info!(
        username = %stored.username,
        hash_prefix = &stored.hashed_password[..8],
        "user saved (not really)"
    );

    Ok(Json(UserOut::from(stored)))
}

/// Handler for `POST /catalog/offers/`.
pub async fn create_offer_handler(Json(offer): Json<Offer>) -> Result<Json<Offer>, ApiError> {
    offer.check().map_err(unprocessable)?;
    Ok(Json(offer))
}

/// Handler for `POST /catalog/images/multiple/`.
pub async fn create_images_handler(
    Json(images): Json<Vec<Image>>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let images = images
        .into_iter()
        .map(validated)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(images))
}

/// Handler for `POST /catalog/index-weights/`.
///
/// JSON object keys are always strings; they are coerced to integers here.
///
/// # Errors
///
/// `ApiError::Unprocessable` naming the first key that is not an integer.
pub async fn create_index_weights_handler(
    Json(weights): Json<BTreeMap<String, f64>>,
) -> Result<Json<BTreeMap<i64, f64>>, ApiError> {
    let weights = weights
        .into_iter()
        .map(|(key, weight)| {
            key.parse::<i64>()
                .map(|index| (index, weight))
                .map_err(|_| ApiError::Unprocessable(format!("index key is not an integer: {}", key)))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(Json(weights))
}

/// Handler for `PUT /catalog/log/{id}`.
///
/// Returns the JSON-compatible encoding of the entry. Nothing outlives the
/// request.
pub async fn update_log_handler(
    Path(id): Path<String>,
    Json(log): Json<Log>,
) -> Result<Json<Value>, ApiError> {
    let encoded = serde_json::to_value(&log)
        .map_err(|e| ApiError::InternalServerError(format!("failed to encode log: {}", e)))?;

    Ok(Json(json!({ "id": id, "log": encoded })))
}
