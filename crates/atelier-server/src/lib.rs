//! Atelier server library logic.
//!
//! Four route groups share one router:
//!
//! | Prefix | Group |
//! |--------|-------|
//! | `/` | users and items, backed by the database |
//! | `/catalog` | schema-validated request and response bodies |
//! | `/admissions` | path, query and error handling |
//! | `/forms` | urlencoded forms and multipart uploads |

pub mod admissions;
pub mod api;
pub mod api_admissions;
pub mod api_catalog;
pub mod api_forms;
pub mod api_users;
pub mod catalog;
pub mod config;
pub mod uploads;

use admissions::{DecisionEngine, StudentDirectory};
use api::ApiError;
use atelier_db::{DbPool, SessionProvider, SqliteSource};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::{Config, UploadsConfig};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Request-scoped database sessions.
    pub sessions: SessionProvider,
    /// Student lookup table for the admissions desk.
    pub students: Arc<StudentDirectory>,
    /// Random source for admission decisions.
    pub decisions: Arc<DecisionEngine>,
    /// Upload spooling and size limits.
    pub uploads: UploadsConfig,
}

impl AppState {
    /// Builds the state from a ready pool and the loaded configuration.
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            sessions: SessionProvider::new(SqliteSource::new(pool)),
            students: Arc::new(StudentDirectory::new(config.admissions.students.clone())),
            decisions: Arc::new(DecisionEngine::new(config.admissions.decision_seed)),
            uploads: config.uploads.clone(),
        }
    }

    /// Runs `handler` on the blocking pool with its own database session.
    ///
    /// The session is acquired before the handler runs and released when it
    /// finishes, whether it returns, fails, or panics. The guard lives on the
    /// blocking task, so a client that disconnects mid-request does not leak
    /// the connection either.
    ///
    /// # Errors
    ///
    /// `ApiError::Unavailable` if no session could be acquired; otherwise the
    /// handler's own error, unchanged.
    pub async fn with_session<T, F>(&self, handler: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let sessions = self.sessions.clone();
        tokio::task::spawn_blocking(move || sessions.provide(|conn| handler(&**conn)))
            .await
            .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
    }
}

/// Maximum request body size outside the upload routes (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    // Uploads get their own, larger body limit.
    let forms = api_forms::router().layer(DefaultBodyLimit::max(state.uploads.max_body_bytes));

    Router::new()
        .route("/health", get(health))
        .route(
            "/users/",
            post(api_users::create_user_handler).get(api_users::list_users_handler),
        )
        .route("/users/{user_id}", get(api_users::get_user_handler))
        .route(
            "/users/{user_id}/items/",
            post(api_users::create_item_for_user_handler),
        )
        .route("/items/", get(api_users::list_items_handler))
        .nest("/catalog", api_catalog::router())
        .nest("/admissions", api_admissions::router())
        .nest("/forms", forms)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
