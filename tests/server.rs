//! HTTP tests: a real server on a free port, driven with reqwest.

use serde_json::{json, Value};
use tempfile::TempDir;

use bug_triage::config::{Config, DbConfig, LoggingConfig, ServerConfig, StoreConfig};
use bug_triage::server;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(tmp: &TempDir, port: u16, store_enabled: bool) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data/triage.sqlite"),
        },
        server: ServerConfig {
            bind: format!("127.0.0.1:{}", port),
        },
        store: StoreConfig {
            enabled: store_enabled,
        },
        logging: LoggingConfig::default(),
    }
}

/// Starts a server and returns its base URL. The `TempDir` must outlive it.
async fn start_server(store_enabled: bool) -> (TempDir, String) {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg = test_config(&tmp, port, store_enabled);
    tokio::spawn(async move {
        server::run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;
    (tmp, format!("http://127.0.0.1:{}", port))
}

fn request(bugs: Value) -> Value {
    json!({
        "message_id": "http-1",
        "sender": "supervisor",
        "recipient": "bug_triage_agent",
        "type": "task_assignment",
        "timestamp": "2025-03-01T09:30:00Z",
        "task": {
            "bugs": bugs,
            "team_profiles": [
                {"member_id": "dev-01", "name": "Priya", "skills": {"languages": ["python"]}, "current_load": 1}
            ]
        }
    })
}

#[tokio::test]
async fn test_health_with_store() {
    let (_tmp, base) = start_server(true).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agent_name"], "bug_triage_agent");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["details"]["database"], "connected");
    assert!(body["details"]["totals"]["requests"].is_u64());
}

#[tokio::test]
async fn test_health_without_store() {
    let (_tmp, base) = start_server(false).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["database"], "disabled");
}

#[tokio::test]
async fn test_root_banner() {
    let (_tmp, base) = start_server(false).await;

    let body: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
    assert_eq!(body["agent_name"], "bug_triage_agent");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_execute_completed() {
    let (_tmp, base) = start_server(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/execute", base))
        .json(&request(json!([
            {"bug_id": "BUG-1", "title": "SQL injection in search", "description": "Search concatenates input into SQL",
             "code_context": {"file_path": "services/search.py"}}
        ])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["related_message_id"], "http-1");
    let result = &body["results"]["triage"][0];
    assert_eq!(result["bug_id"], "BUG-1");
    assert_eq!(result["classification"]["category"], "Security");
    assert_eq!(result["assignment"]["assigned_to_member_id"], "dev-01");
}

#[tokio::test]
async fn test_execute_validation_failure_is_200() {
    let (_tmp, base) = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/execute", base))
        .json(&request(json!([{"bug_id": "BUG-1", "description": "missing title"}])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "failed");
    assert!(body.get("results").is_none());
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("title is required"));
}

#[tokio::test]
async fn test_execute_rejects_non_json() {
    let (_tmp, base) = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/execute", base))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_metrics_count_requests() {
    let (_tmp, base) = start_server(false).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/execute", base))
        .json(&request(json!([
            {"bug_id": "BUG-1", "title": "Wrong total", "description": "Invoice shows wrong result"}
        ])))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/execute", base))
        .json(&json!({"sender": "someone-else"}))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .get(format!("{}/metrics", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totals"]["requests"], 2);
    assert_eq!(body["totals"]["successful"], 1);
    assert_eq!(body["totals"]["failed"], 1);
    assert_eq!(body["totals"]["validation_failures"], 1);
    assert_eq!(body["totals"]["warning_events"], 1);
    assert_eq!(body["rates"]["success_rate"], 0.5);
    assert!(body["health_checks"]["invocations"].as_u64().unwrap() >= 1);
    assert!(body["last_request_at"].is_string());
}
