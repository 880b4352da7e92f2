//! End-to-end RPC surface tests, exercising the real router via
//! `tower::ServiceExt::oneshot` rather than a live TCP listener.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;

use autoclip_api::{create_router, ApiConfig, AppState};

fn set_test_env() {
    std::env::set_var("SUPABASE_URL", "http://localhost:54321");
    std::env::set_var("SUPABASE_SERVICE_ROLE_KEY", "test-service-role-key");
    std::env::set_var("ENVIRONMENT", "development");
}

async fn test_state() -> AppState {
    set_test_env();
    AppState::new(ApiConfig::default()).await.expect("failed to build test app state")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[serial]
async fn health_reports_idle_schedulers_immediately_after_boot() {
    let state = test_state().await;
    let app = create_router(state, None);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["exports"]["active"], 0);
    assert_eq!(body["exports"]["queued"], 0);
    assert_eq!(body["transcription"]["active"], 0);
    assert_eq!(body["transcription"]["openJobs"], 0);
}

#[tokio::test]
#[serial]
async fn render_without_authorization_header_is_rejected_when_secret_is_configured() {
    std::env::set_var("WORKER_SECRET", "s3cr3t");
    let state = test_state().await;
    let app = create_router(state, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/render")
                .header("content-type", "application/json")
                .body(Body::from(json!({"sessionId": "s1", "videoKey": "sessions/s1/input.mp4", "clips": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");

    std::env::remove_var("WORKER_SECRET");
}

#[tokio::test]
#[serial]
async fn render_rejects_an_inverted_clip_range() {
    let state = test_state().await;
    let app = create_router(state, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/render")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "sessionId": "s1",
                        "videoKey": "sessions/s1/input.mp4",
                        "clips": [{"start": 10.0, "end": 5.0}],
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid clip range at index 0.");
}

#[tokio::test]
#[serial]
async fn editor_export_start_reports_queued_immediately() {
    let state = test_state().await;
    let app = create_router(state, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/editor-export/start")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "state": {},
                        "output": {"width": 1080, "height": 1920},
                        "duration": 3.0,
                        "fps": 30.0,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "queued");
    assert!(body["jobId"].is_string());
}

#[tokio::test]
#[serial]
async fn editor_export_status_is_not_found_for_an_unknown_job() {
    let state = test_state().await;
    let app = create_router(state, None);

    let response = app
        .oneshot(Request::builder().uri("/editor-export/status/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn transcribe_queue_dedups_concurrent_requests_for_the_same_session() {
    let state = test_state().await;
    let app = create_router(state, None);

    let request_body = || {
        Request::builder()
            .method("POST")
            .uri("/transcribe/queue")
            .header("content-type", "application/json")
            .body(Body::from(json!({"sessionId": "dedup-session", "videoKey": "sessions/dedup-session/input.mp4"}).to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(request_body()).await.unwrap();
    let first_body = body_json(first).await;

    let second = app.oneshot(request_body()).await.unwrap();
    let second_body = body_json(second).await;

    assert_eq!(first_body["jobId"], second_body["jobId"]);
}
