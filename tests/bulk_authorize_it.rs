//! End-to-end tests for the bulk decision endpoint, including the
//! deliberate asymmetry: fail-fast on validation, isolate per-item
//! evaluation errors once validation has passed.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;

use policy_control_plane::{app, AppConfig, AppState};

async fn engine_decision(Json(body): Json<serde_json::Value>) -> Response {
    let input = &body["input"];
    let subject = input["subject"]["id"].as_str().unwrap_or_default();
    if subject == "boom" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({
        "result": {
            "allow": true,
            "reason": format!("read granted on {}", input["resource"]["id"].as_str().unwrap_or_default()),
        }
    }))
    .into_response()
}

async fn spawn_engine() -> String {
    let router = Router::new()
        .route("/v1/data/authz/decision", post(engine_decision))
        .route("/health", get(|| async { "ok" }));
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

async fn spawn_app(engine_url: &str) -> String {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        engine_url: engine_url.to_string(),
        engine_decision_path: "authz/decision".into(),
        engine_timeout: Duration::from_secs(2),
        repo_url: "/nonexistent/policy-repo".into(),
        repo_token: None,
        repo_branch: "main".into(),
        environment: "test".into(),
        git_timeout: Duration::from_secs(5),
        sync_poll_interval: Duration::from_secs(30),
        sync_stale_after: Duration::from_secs(90),
        cache_enabled: false,
        cache_ttl: Duration::from_secs(60),
    };
    let state = AppState::build(&config).await.unwrap();
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = app(state);
    tokio::spawn(async move { axum::serve(listener, service).await.unwrap() });
    format!("http://{addr}")
}

fn item(user: &str, resource: &str) -> serde_json::Value {
    json!({
        "user": {"id": user},
        "resource": {"id": resource, "type": "api"},
        "action": {"name": "read"}
    })
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let engine = spawn_engine().await;
    let base = spawn_app(&engine).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/authorize/bulk"))
        .json(&json!([]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn fifty_one_items_are_rejected_wholesale() {
    let engine = spawn_engine().await;
    let base = spawn_app(&engine).await;

    let items: Vec<_> = (0..51).map(|i| item("u1", &format!("r{i}"))).collect();
    let response = reqwest::Client::new()
        .post(format!("{base}/authorize/bulk"))
        .json(&items)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    let message = error["error"]["message"].as_str().unwrap();
    assert!(message.contains("51"));
    assert!(message.contains("50"));
}

#[tokio::test]
async fn fifty_items_come_back_in_order() {
    let engine = spawn_engine().await;
    let base = spawn_app(&engine).await;

    let items: Vec<_> = (0..50).map(|i| item("u1", &format!("r{i}"))).collect();
    let response = reqwest::Client::new()
        .post(format!("{base}/authorize/bulk"))
        .json(&items)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let decisions = body["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 50);
    for (i, decision) in decisions.iter().enumerate() {
        assert_eq!(decision["allow"], json!(true));
        assert_eq!(
            decision["reason"].as_str().unwrap(),
            format!("read granted on r{i}")
        );
    }
}

#[tokio::test]
async fn one_invalid_item_rejects_the_whole_batch() {
    let engine = spawn_engine().await;
    let base = spawn_app(&engine).await;

    let items = vec![item("u1", "r0"), item("", "r1"), item("u1", "r2")];
    let response = reqwest::Client::new()
        .post(format!("{base}/authorize/bulk"))
        .json(&items)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    let message = error["error"]["message"].as_str().unwrap();
    assert!(message.contains("item 1"));
    assert!(message.contains("user.id"));
}

#[tokio::test]
async fn one_internal_error_does_not_fail_the_batch() {
    let engine = spawn_engine().await;
    let base = spawn_app(&engine).await;

    let items = vec![item("u1", "r0"), item("boom", "r1"), item("u1", "r2")];
    let response = reqwest::Client::new()
        .post(format!("{base}/authorize/bulk"))
        .json(&items)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let decisions = body["decisions"].as_array().unwrap();
    assert_eq!(decisions.len(), 3);

    assert_eq!(decisions[0]["allow"], json!(true));
    assert_eq!(decisions[2]["allow"], json!(true));

    // The failing item degrades to a deny, in place
    assert_eq!(decisions[1]["allow"], json!(false));
    assert_eq!(decisions[1]["reason"], json!("internal error"));
}
