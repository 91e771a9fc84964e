//! Sync coordinator endpoint tests

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;

use policy_control_plane::{app, AppConfig, AppState};

async fn spawn_app() -> (String, Arc<AppState>) {
    let config = AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        engine_url: "http://127.0.0.1:9".into(),
        engine_decision_path: "authz/decision".into(),
        engine_timeout: Duration::from_secs(1),
        repo_url: "/nonexistent/policy-repo".into(),
        repo_token: None,
        repo_branch: "main".into(),
        environment: "test".into(),
        git_timeout: Duration::from_secs(5),
        sync_poll_interval: Duration::from_secs(30),
        sync_stale_after: Duration::ZERO,
        cache_enabled: false,
        cache_ttl: Duration::from_secs(60),
    };
    let state = AppState::build(&config).await.unwrap();
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = app(Arc::clone(&state));
    tokio::spawn(async move { axum::serve(listener, service).await.unwrap() });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn polling_registers_an_unknown_target() {
    let (base, _state) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/sync/revision?target=pep-1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let targets: serde_json::Value = client
        .get(format!("{base}/sync/targets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(targets[0]["id"], json!("pep-1"));
    assert_eq!(targets[0]["state"], json!("unknown"));
}

#[tokio::test]
async fn ack_confirms_a_sync_and_staleness_recovers() {
    let (base, state) = spawn_app().await;
    let client = reqwest::Client::new();

    state.sync.advance_revision("rev-1");

    let target: serde_json::Value = client
        .post(format!("{base}/sync/ack"))
        .json(&json!({"target_id": "pep-1", "revision": "rev-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(target["state"], json!("synced"));
    assert_eq!(target["last_synced_revision"], json!("rev-1"));

    // Heartbeat window is zero in this fixture, so the sweep flags it
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(state.sync.mark_stale_targets(), 1);
    let targets: serde_json::Value = client
        .get(format!("{base}/sync/targets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(targets[0]["state"], json!("stale"));

    // The next successful ack brings it back
    let target: serde_json::Value = client
        .post(format!("{base}/sync/ack"))
        .json(&json!({"target_id": "pep-1", "revision": "rev-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(target["state"], json!("synced"));
}

#[tokio::test]
async fn ack_without_target_id_is_rejected() {
    let (base, _state) = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/sync/ack"))
        .json(&json!({"target_id": "", "revision": "rev-1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn nudge_is_accepted_but_advisory() {
    let (base, state) = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/sync/nudge"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    // A nudge on its own does not move any target's state
    assert!(state.sync.targets().is_empty());
}
