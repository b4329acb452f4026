//! HTTP surface tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use push_core::{Credential, CredentialId, Platform, device_uid};
use push_dispatch::{ChannelQueue, DispatchConfig, JobReceiver, PushService};
use push_driver::{DriverRegistry, FakeDriver};
use push_http::{PushListResponse, PushStatusResponse, RegisterResponse, push_router};
use push_storage::{CredentialStore, MemoryStorage};
use tower::ServiceExt as _;

const API_KEY: &str = "secret-key";

fn app() -> (Router, JobReceiver) {
    let store = MemoryStorage::new();
    store
        .upsert_credential(&Credential::new("acme", API_KEY))
        .unwrap();

    let registry = DriverRegistry::new()
        .with("android", FakeDriver::new().reject("regid-2", "NotRegistered"))
        .with("ios", FakeDriver::new().unavailable("connection refused"));
    let config = DispatchConfig::default()
        .route("android", "android")
        .route("ios", "ios");

    let (queue, jobs) = ChannelQueue::new(16);
    let service = Arc::new(PushService::new(store, registry, queue, config));
    (push_router(service), jobs)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_form(uri: &str, fields: &[(&str, String)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencode(value)))
        .collect::<Vec<_>>()
        .join("&");

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn register(app: &Router, platform: &str, identity: &str, regid: &str) -> String {
    let (status, body) = call(
        app,
        post(
            "/api/v1/push/register",
            serde_json::json!({ "platform": platform, "identity": identity, "regid": regid }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: RegisterResponse = serde_json::from_slice(&body).unwrap();
    response.device_uuid.to_string()
}

fn payload() -> serde_json::Value {
    serde_json::json!({
        "notification": { "title": "", "body": "", "click_action": "" },
        "data": { "a": "A", "b": "B", "c": "C" },
    })
}

#[tokio::test]
async fn test_missing_or_unknown_api_key_is_forbidden() {
    let (app, _jobs) = app();

    let request = Request::builder()
        .uri("/api/v1/push")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/api/v1/push")
        .header("x-api-key", "wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_is_stable_across_token_changes() {
    let (app, _jobs) = app();

    let first = register(&app, "android", "123456789012345", "regid-1").await;
    let again = register(&app, "Android", "123456789012345", "regid-new").await;

    let expected = device_uid(
        &CredentialId::new("acme"),
        &Platform::new("android"),
        "123456789012345",
    );
    assert_eq!(first, expected.to_string());
    assert_eq!(again, first);
}

#[tokio::test]
async fn test_register_unknown_platform_is_rejected() {
    let (app, _jobs) = app();

    let (status, _) = call(
        &app,
        post(
            "/api/v1/push/register",
            serde_json::json!({ "platform": "web", "identity": "x", "regid": "y" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_send_now_reports_failures() {
    let (app, _jobs) = app();
    let one = register(&app, "android", "111", "regid-1").await;
    let two = register(&app, "android", "222", "regid-2").await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/push/now",
            serde_json::json!({ "to": [one, two], "payload": payload() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: PushStatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.status, "sent");
    assert_eq!(response.failures.len(), 1);
    assert_eq!(response.failures[0].recipient.as_str(), two);
    assert_eq!(response.failures[0].reason, "NotRegistered");

    let (status, body) = call(
        &app,
        get(&format!("/api/v1/push/{}", response.push_uuid)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored: PushStatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(stored.push_uuid, response.push_uuid);
    assert_eq!(stored.status, "sent");
    assert_eq!(stored.updated_at, response.updated_at);
}

#[tokio::test]
async fn test_send_now_outage_is_bad_gateway() {
    let (app, _jobs) = app();
    let device = register(&app, "ios", "phone", "token").await;

    let (status, _) = call(
        &app,
        post(
            "/api/v1/push/now",
            serde_json::json!({ "to": [device], "payload": payload() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = call(&app, get("/api/v1/push")).await;
    let list: PushListResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.data.len(), 1);
    assert_eq!(list.data[0].status, "failed");
}

#[tokio::test]
async fn test_missing_fields_are_unprocessable() {
    let (app, _jobs) = app();

    let (status, _) = call(
        &app,
        post("/api/v1/push/now", serde_json::json!({ "payload": payload() })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        post("/api/v1/push/now", serde_json::json!({ "to": ["UID:1"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_send_now_accepts_form_with_encoded_fields() {
    let (app, _jobs) = app();
    let one = register(&app, "android", "111", "regid-1").await;
    let two = register(&app, "android", "222", "regid-2").await;

    let (status, body) = call(
        &app,
        post_form(
            "/api/v1/push/now",
            &[
                ("to", serde_json::json!([one, two]).to_string()),
                ("payload", payload().to_string()),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response: PushStatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(response.status, "sent");
    assert_eq!(response.recipients.len(), 2);
    assert_eq!(response.failures.len(), 1);
    assert_eq!(response.failures[0].recipient.as_str(), two);
}

#[tokio::test]
async fn test_malformed_form_is_unprocessable() {
    let (app, jobs) = app();

    let (status, _) = call(
        &app,
        post_form(
            "/api/v1/push/queue",
            &[("to", "UID:1".to_string()), ("payload", payload().to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        post_form("/api/v1/push/queue", &[("to", r#"["UID:1"]"#.to_string())]),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert!(jobs.try_next().await.is_none());
}

#[tokio::test]
async fn test_queue_then_list() {
    let (app, jobs) = app();
    let device = register(&app, "android", "111", "regid-1").await;

    let (status, body) = call(
        &app,
        post(
            "/api/v1/push/queue",
            serde_json::json!({ "to": [device], "payload": payload() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let queued: PushStatusResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(queued.status, "queued");
    assert!(jobs.try_next().await.is_some());

    let (status, body) = call(&app, get("/api/v1/push")).await;
    assert_eq!(status, StatusCode::OK);
    let list: PushListResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.data.len(), 1);
    assert_eq!(list.data[0].push_uuid, queued.push_uuid);
}

#[tokio::test]
async fn test_unknown_attempt_is_not_found() {
    let (app, _jobs) = app();
    let (status, _) = call(&app, get("/api/v1/push/non-existing_UUID")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
