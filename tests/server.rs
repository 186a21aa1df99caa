#![cfg(feature = "http")]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use common::{MockCatalog, MockSource, controller, track};
use spotify_downloader::catalog::SourceRef;
use spotify_downloader::server::{AppState, router};
use spotify_downloader::task::Task;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn form_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/download")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[tokio::test]
async fn test_check_progress_unknown_task() {
    let app = router(AppState::new(controller(
        MockCatalog::default(),
        Arc::new(MockSource::default()),
    )));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/check_progress/never-issued")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["status"], "not_found");
}

#[tokio::test]
async fn test_check_progress_reports_fields() {
    let controller = controller(MockCatalog::default(), Arc::new(MockSource::default()));
    controller
        .store()
        .create(Task::single("known", 4, "https://open.spotify.com/album/x"))
        .unwrap();
    let app = router(AppState::new(controller));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/check_progress/known")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "preparing");
    assert_eq!(json["total"], 4);
    assert_eq!(json["completed"], 0);
    assert_eq!(json["progress"], 0);
    assert_eq!(json["is_batch"], false);
    assert!(json["error"].is_null());
}

#[tokio::test]
async fn test_clear_task_expires_cookie() {
    let app = router(AppState::new(controller(
        MockCatalog::default(),
        Arc::new(MockSource::default()),
    )));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/clear_task")
                .header(header::COOKIE, "task_id=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("task_id=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_download_rejects_bad_input() {
    let app = router(AppState::new(controller(
        MockCatalog::default(),
        Arc::new(MockSource::default()),
    )));

    let response = app
        .clone()
        .oneshot(form_request("url=&format=mp3".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let body = format!(
        "url={}&quality=999",
        encode("https://open.spotify.com/album/x")
    );
    let response = app.oneshot(form_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_creates_task_and_session() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = MockCatalog::default().with(
        SourceRef::Album("abc".to_string()),
        vec![track("One", "A"), track("Two", "B")],
    );
    let controller = controller(catalog, Arc::new(MockSource::default()));
    let app = router(AppState::new(controller.clone()));

    let body = format!(
        "url={}&limit=5&format=m4a&quality=320&output_dir={}&batch_mode=false",
        encode("https://open.spotify.com/album/abc"),
        encode(&dir.path().display().to_string()),
    );
    let response = app.clone().oneshot(form_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let task_id = json["task_id"].as_str().unwrap().to_string();
    assert!(cookie.starts_with(&format!("task_id={}", task_id)));

    let snapshot = controller
        .wait_for(&task_id, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(snapshot.completed, 2);
    assert!(dir.path().join("One.m4a").exists());

    // 任务已结束，首页解除关联
    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, format!("task_id={}", task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key(header::SET_COOKIE));
    assert!(body_json(response).await["task_id"].is_null());
}

#[tokio::test]
async fn test_index_returns_active_task() {
    let controller = controller(MockCatalog::default(), Arc::new(MockSource::default()));
    controller
        .store()
        .create(Task::batch("running", "a\nb"))
        .unwrap();
    let app = router(AppState::new(controller));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, "theme=dark; task_id=running")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(!response.headers().contains_key(header::SET_COOKIE));
    let json = body_json(response).await;
    assert_eq!(json["task_id"], "running");
    assert_eq!(json["task"]["status"], "processing");
    assert_eq!(json["task"]["is_batch"], true);
}
