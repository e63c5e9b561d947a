//! Form and upload handlers.
//!
//! Multipart bodies are read through [`MultipartForm`], which spools large
//! parts to disk instead of holding them in memory.

use crate::api::{ApiError, Form, Json};
use crate::uploads::{MultipartForm, UploadedFile};
use crate::AppState;
use axum::{
    extract::{Extension, Multipart},
    response::Html,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Urlencoded login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    /// Required, but may be empty.
    pub password: String,
}

const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
<form action="/forms/images/" enctype="multipart/form-data" method="post">
<input name="images" type="file" multiple>
<input type="submit">
</form>
<form action="/forms/uploadimages/" enctype="multipart/form-data" method="post">
<input name="images" type="file" multiple>
<input type="submit">
</form>
</body>
</html>
"#;

pub fn router() -> Router {
    Router::new()
        .route("/", get(upload_page_handler))
        .route("/login/", post(login_handler))
        .route("/files/", post(file_size_handler))
        .route("/uploadfile/", post(upload_file_handler))
        .route("/images/", post(image_sizes_handler))
        .route("/uploadimages/", post(upload_images_handler))
        .route("/logos/", post(logos_handler))
}

async fn read_form(state: &AppState, multipart: Multipart) -> Result<MultipartForm, ApiError> {
    MultipartForm::read(multipart, state.uploads.spool_threshold_bytes).await
}

fn filename_of(file: &UploadedFile) -> Value {
    file.filename
        .as_deref()
        .map_or(Value::Null, |name| Value::String(name.to_string()))
}

/// Handler for `GET /forms`.
pub async fn upload_page_handler() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

/// Handler for `POST /forms/login/`.
pub async fn login_handler(Form(form): Form<LoginForm>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!({ "username": form.username })))
}

/// Handler for `POST /forms/files/`.
pub async fn file_size_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(&state, multipart).await?;
    let file = form.take_file("file")?;
    Ok(Json(json!({ "file_size": file.size() })))
}

/// Handler for `POST /forms/uploadfile/`.
pub async fn upload_file_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(&state, multipart).await?;
    let file = form.take_file("file")?;

    tracing::info!(
        filename = ?file.filename,
        size = file.size(),
        on_disk = file.is_on_disk(),
        "upload received"
    );

    Ok(Json(json!({ "filename": filename_of(&file) })))
}

/// Handler for `POST /forms/images/`.
pub async fn image_sizes_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(&state, multipart).await?;
    let sizes: Vec<usize> = form
        .take_files("images")?
        .iter()
        .map(UploadedFile::size)
        .collect();
    Ok(Json(json!({ "file_sizes": sizes })))
}

/// Handler for `POST /forms/uploadimages/`.
pub async fn upload_images_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(&state, multipart).await?;
    let names: Vec<Value> = form.take_files("images")?.iter().map(filename_of).collect();
    Ok(Json(json!({ "filenames": names })))
}

/// Handler for `POST /forms/logos/`.
///
/// Takes two files and a text token in one body.
pub async fn logos_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut form = read_form(&state, multipart).await?;
    let file = form.take_file("file")?;
    let fileb = form.take_file("fileb")?;
    let token = form.take_text("token")?;

    Ok(Json(json!({
        "file_size": file.size(),
        "token": token,
        "fileb_content_type": fileb.content_type,
    })))
}
