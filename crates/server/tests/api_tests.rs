//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use moodcam_server::{create_router, AppState, ServerConfig};

const IMAGE: &str = "data:image/jpeg;base64,/9j/AAAA";

fn router_for(vision_base: &str) -> Router {
    let mut config = ServerConfig::default();
    config.vision.base_url = vision_base.to_string();
    config.vision.api_key = "sk-test".to_string();
    config.vision.timeout_secs = 5;
    create_router(AppState::new(config))
}

fn router() -> Router {
    // Nothing listens here; only routes that never reach the model use it.
    router_for("http://127.0.0.1:9")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_analyze_returns_mood_result() {
    let server = MockServer::start().await;
    mount_completion(
        &server,
        r#"{"mood":"happy","confidence":87,"reasoning":"Soft eyes, open mouth"}"#,
    )
    .await;

    let body = json!({"imageData": IMAGE, "sessionId": "session_abc"}).to_string();
    let response = router_for(&server.uri())
        .oneshot(post_json("/api/analyze", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["mood"], "happy");
    assert_eq!(json["confidence"], 87);
    assert_eq!(json["reasoning"], "Soft eyes, open mouth");
    assert_eq!(json["sessionId"], "session_abc");
    assert_eq!(json["version"], "2.0");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_analyze_forwards_corrections_to_model() {
    let server = MockServer::start().await;
    mount_completion(&server, r#"{"mood":"confused","confidence":"64"}"#).await;

    let body = json!({
        "imageData": IMAGE,
        "feedback": {"corrections": [{"predicted": "angry", "actual": "confused", "notes": "head tilt"}]}
    })
    .to_string();
    let response = router_for(&server.uri())
        .oneshot(post_json("/analyze", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["mood"], "confused");
    assert_eq!(json["confidence"], 64);
    assert_eq!(json["sessionId"], "anonymous");

    let received = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    let system = sent["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("LEARNING CONTEXT"));
    assert!(system.contains("head tilt"));
}

#[tokio::test]
async fn test_analyze_requires_image_data() {
    let response = router()
        .oneshot(post_json("/api/analyze", r#"{"sessionId":"s"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "No image data provided"})
    );
}

#[tokio::test]
async fn test_analyze_treats_null_or_blank_image_as_missing() {
    for body in [
        r#"{"imageData":null,"sessionId":"s"}"#,
        r#"{"imageData":"   "}"#,
        "{}",
    ] {
        let response = router()
            .oneshot(post_json("/api/analyze", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({"error": "No image data provided"})
        );
    }
}

#[tokio::test]
async fn test_analyze_rejects_invalid_json() {
    let response = router()
        .oneshot(post_json("/api/analyze", "{imageData:"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid JSON body"}));
}

#[tokio::test]
async fn test_analyze_reports_model_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Incorrect API key provided"}})),
        )
        .mount(&server)
        .await;

    let body = json!({"imageData": IMAGE}).to_string();
    let response = router_for(&server.uri())
        .oneshot(post_json("/api/analyze", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Failed to analyze image");
    assert!(json["details"]
        .as_str()
        .unwrap()
        .contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_analyze_rejects_reply_without_mood() {
    let server = MockServer::start().await;
    mount_completion(&server, r#"{"confidence":50}"#).await;

    let body = json!({"imageData": IMAGE}).to_string();
    let response = router_for(&server.uri())
        .oneshot(post_json("/api/analyze", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_feedback_classifies_learning_type() {
    let body = json!({
        "sessionId": "s1",
        "predictedMood": "angry",
        "actualMood": "confused",
        "confidence": 72,
        "imageHash": "-324340786"
    })
    .to_string();
    let response = router()
        .oneshot(post_json("/api/feedback", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "success": true,
            "message": "Feedback recorded for learning",
            "learningType": "correction"
        })
    );

    let body = json!({"predictedMood": "happy", "actualMood": "happy"}).to_string();
    let response = router()
        .oneshot(post_json("/api/feedback", &body))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["learningType"], "confirmation");
}

#[tokio::test]
async fn test_feedback_accepts_loose_confidence() {
    for confidence in [json!(82.5), json!("82"), json!(150), json!("unsure")] {
        let body = json!({
            "predictedMood": "relaxed",
            "actualMood": "anxious",
            "confidence": confidence
        })
        .to_string();
        let response = router()
            .oneshot(post_json("/api/feedback", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["learningType"], "correction");
    }
}

#[tokio::test]
async fn test_feedback_requires_both_moods() {
    let response = router()
        .oneshot(post_json("/api/feedback", r#"{"predictedMood":"happy"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preflight_is_empty_ok() {
    let response = router()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/analyze")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    for (verb, uri) in [(Method::GET, "/api/analyze"), (Method::PUT, "/api/feedback")] {
        let response = router()
            .oneshot(Request::builder().method(verb).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(json_body(response).await, json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_cors_headers_on_error_responses() {
    let response = router()
        .oneshot(post_json("/api/analyze", "{}"))
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET,OPTIONS,PATCH,DELETE,POST,PUT"
    );
    assert!(headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .contains("X-CSRF-Token"));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = ServerConfig::default();
    config.max_body_size = 64;
    let app = create_router(AppState::new(config));

    let body = json!({"imageData": "A".repeat(1024)}).to_string();
    let response = app.oneshot(post_json("/api/analyze", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
