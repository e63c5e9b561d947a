//! Admissions desk handlers: path and query coercion, a lookup miss, and a
//! randomized decision.

use crate::admissions::{Application, Decision};
use crate::api::{validated, ApiError, Json, Path, Query};
use crate::AppState;
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

/// Query string for `POST /admissions/applications`.
#[derive(Debug, Deserialize)]
pub struct ApplicationQuery {
    pub id: i64,
}

/// Query string for `GET /admissions/items/`.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 3, max = 50))]
    pub q: Option<String>,
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(hello_post_handler))
        .route("/employee/{id}", get(get_employee_handler))
        .route("/applications", post(create_application_handler))
        .route("/items/", get(search_items_handler))
        .route("/students/{student_id}", get(get_student_handler))
}

/// Handler for `POST /admissions`.
pub async fn hello_post_handler() -> Json<Value> {
    Json(json!({ "Hello": "POST" }))
}

/// Handler for `GET /admissions/employee/{id}`.
pub async fn get_employee_handler(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({ "id": id }))
}

/// Handler for `POST /admissions/applications`.
pub async fn create_application_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ApplicationQuery>,
    Json(application): Json<Application>,
) -> Json<Decision> {
    let decision = state.decisions.decide(&application);

    tracing::info!(
        application_id = query.id,
        probability = decision.probability,
        acceptance = decision.acceptance,
        "application decided"
    );

    Json(decision)
}

/// Handler for `GET /admissions/items/`.
pub async fn search_items_handler(
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let query = validated(query)?;

    let mut results = json!({
        "items": [{ "item_id": "Foo" }, { "item_id": "Bar" }]
    });
    if let Some(q) = query.q {
        results["q"] = Value::String(q);
    }

    Ok(Json(results))
}

/// Handler for `GET /admissions/students/{student_id}`.
pub async fn get_student_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(student_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let name = state
        .students
        .lookup(student_id)
        .ok_or_else(|| ApiError::NotFound("Student ID not found".to_string()))?;

    Ok(Json(json!({ "student": name })))
}
