use atelier_db::{create_pool, run_migrations, DbRuntimeSettings};
use atelier_server::{app, config::Config, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "atelier-forms-boundary";

/// A multipart part: field name, optional filename and content type, bytes.
struct Part<'a> {
    name: &'a str,
    file: Option<(&'a str, &'a str)>,
    data: &'a [u8],
}

fn text<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part {
        name,
        file: None,
        data: value.as_bytes(),
    }
}

fn file<'a>(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name,
        file: Some((filename, content_type)),
        data,
    }
}

fn setup_app(config: Config) -> Router {
    let settings = DbRuntimeSettings {
        pool_max_size: 1,
        ..DbRuntimeSettings::default()
    };
    let pool = create_pool(":memory:", settings).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    app(AppState::new(pool, &config))
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let headers = match part.file {
            Some((filename, content_type)) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                part.name, filename, content_type
            ),
            None => format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                part.name
            ),
        };
        body.extend_from_slice(headers.as_bytes());
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_upload_page_lists_both_forms() {
    let app = setup_app(Config::default());

    let response = app
        .oneshot(Request::builder().uri("/forms").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("action=\"/forms/images/\""));
    assert!(page.contains("action=\"/forms/uploadimages/\""));
}

#[tokio::test]
async fn test_login_form() {
    let app = setup_app(Config::default());

    let request = Request::builder()
        .method("POST")
        .uri("/forms/login/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password=secret"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "username": "ada" }));
}

#[tokio::test]
async fn test_login_form_accepts_empty_password() {
    let app = setup_app(Config::default());

    let request = Request::builder()
        .method("POST")
        .uri("/forms/login/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password="))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "username": "ada" }));
}

#[tokio::test]
async fn test_login_form_missing_password() {
    let app = setup_app(Config::default());

    let request = Request::builder()
        .method("POST")
        .uri("/forms/login/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=ada"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        body["detail"].as_str().unwrap().contains("password"),
        "unexpected body: {body}"
    );
}

#[tokio::test]
async fn test_file_size() {
    let app = setup_app(Config::default());

    let (status, body) = send(
        &app,
        multipart(
            "/forms/files/",
            &[file("file", "notes.txt", "text/plain", b"hello world")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "file_size": 11 }));
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = setup_app(Config::default());

    let (status, body) = send(
        &app,
        multipart("/forms/files/", &[text("other", "value")]),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "missing form field: file");
}

#[tokio::test]
async fn test_uploadfile_returns_filename() {
    let app = setup_app(Config::default());

    let (status, body) = send(
        &app,
        multipart(
            "/forms/uploadfile/",
            &[file("file", "report.pdf", "application/pdf", b"%PDF-1.4")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "filename": "report.pdf" }));
}

#[tokio::test]
async fn test_large_upload_is_spooled() {
    let mut config = Config::default();
    config.uploads.spool_threshold_bytes = 1024;
    let app = setup_app(config);
    let data = vec![0xAB_u8; 64 * 1024];

    let (status, body) = send(
        &app,
        multipart(
            "/forms/files/",
            &[file("file", "blob.bin", "application/octet-stream", &data)],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_size"], 64 * 1024);
}

#[tokio::test]
async fn test_multiple_images() {
    let app = setup_app(Config::default());
    let parts = [
        file("images", "a.png", "image/png", b"12345"),
        file("images", "b.png", "image/png", b"123"),
    ];

    let (status, body) = send(&app, multipart("/forms/images/", &parts)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "file_sizes": [5, 3] }));

    let (status, body) = send(&app, multipart("/forms/uploadimages/", &parts)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "filenames": ["a.png", "b.png"] }));
}

#[tokio::test]
async fn test_logos_mixes_files_and_token() {
    let app = setup_app(Config::default());

    let (status, body) = send(
        &app,
        multipart(
            "/forms/logos/",
            &[
                file("file", "logo.svg", "image/svg+xml", b"<svg/>"),
                file("fileb", "logo.png", "image/png", b"png"),
                text("token", "tok-42"),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "file_size": 6, "token": "tok-42", "fileb_content_type": "image/png" })
    );
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = Config::default();
    config.uploads.max_body_bytes = 4 * 1024;
    let app = setup_app(config);
    let data = vec![1_u8; 16 * 1024];

    let (status, _) = send(
        &app,
        multipart(
            "/forms/files/",
            &[file("file", "big.bin", "application/octet-stream", &data)],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
