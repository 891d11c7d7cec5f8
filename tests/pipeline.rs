//! Library-level tests: the triage service running against a real SQLite
//! store in a temporary directory.

use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use bug_triage::config::{Config, DbConfig, LoggingConfig, ServerConfig, StoreConfig};
use bug_triage::sqlite_store::SqliteStore;
use bug_triage::{db, migrate, seed};
use bug_triage_core::models::PriorityLevel;
use bug_triage_core::store::{DeveloperLoad, PersistedProfile, Store};
use bug_triage_core::{ResponseStatus, TriageService};

fn test_config(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data/triage.sqlite"),
        },
        server: ServerConfig::default(),
        store: StoreConfig { enabled: true },
        logging: LoggingConfig::default(),
    }
}

async fn open_store(tmp: &TempDir) -> SqliteStore {
    let cfg = test_config(tmp);
    let pool = db::connect(&cfg).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn service(store: &SqliteStore) -> TriageService {
    TriageService::new(Some(Arc::new(store.clone()))).unwrap()
}

fn request(bugs: Value) -> Value {
    json!({
        "message_id": "pipe-1",
        "sender": "supervisor",
        "recipient": "bug_triage_agent",
        "type": "task_assignment",
        "timestamp": "2025-03-01T09:30:00Z",
        "task": {
            "bugs": bugs,
            "team_profiles": [
                {"member_id": "dev-01", "name": "Priya", "skills": {"languages": ["python"]}, "current_load": 1},
                {"member_id": "dev-02", "name": "Jonas", "skills": {"languages": ["java"]}, "current_load": 1}
            ]
        }
    })
}

#[tokio::test]
async fn test_migrations_seed_default_rules_once() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    migrate::apply(store.pool()).await.unwrap();

    let rules = store.severity_rules().await.unwrap();
    assert_eq!(rules.len(), 3);
    assert!(rules.iter().all(|r| r.priority == PriorityLevel::Critical));
    let names: Vec<_> = rules.iter().map(|r| r.severity.as_str()).collect();
    assert!(names.contains(&"crash"));
    assert!(names.contains(&"security_vulnerability"));
    assert!(names.contains(&"data_loss"));
}

#[tokio::test]
async fn test_history_recorded_per_bug() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let svc = service(&store);

    let resp = svc
        .process(&request(json!([
            {"bug_id": "BUG-1", "title": "Wrong total", "description": "Invoice shows wrong result",
             "code_context": {"file_path": "billing/invoice.py"}},
            {"bug_id": "BUG-2", "title": "Slow search", "description": "Search latency is high"}
        ])))
        .await;
    assert_eq!(resp.status, ResponseStatus::Completed);
    assert_eq!(store.history_count().await.unwrap(), 2);

    let history = store.history_for("BUG-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].language.as_deref(), Some("python"));
    assert_eq!(history[0].file_type.as_deref(), Some(".py"));
    assert_eq!(
        history[0].classification,
        resp.triage()[0].classification
    );
    assert_eq!(history[0].bug["bug_id"], "BUG-1");
}

#[tokio::test]
async fn test_failed_validation_writes_no_history() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;
    let svc = service(&store);

    let resp = svc
        .process(&request(json!([{"bug_id": "BUG-1", "description": "no title"}])))
        .await;
    assert_eq!(resp.status, ResponseStatus::Failed);
    assert_eq!(store.history_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_seed_import_drives_routing() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let seed_file: seed::SeedFile = serde_json::from_value(json!({
        "routing_rules": [
            {"rule_type": "tag", "assign_to": ["dev-09"], "priority": 1, "conditions": {"tags": ["billing"]}},
            {"rule_type": "tag", "assign_to": ["dev-08"], "priority": 7, "conditions": {"tags": ["billing"]}}
        ]
    }))
    .unwrap();
    let summary = seed::import(&store, &seed_file).await.unwrap();
    assert_eq!(summary.routing_rules, 2);

    let resp = service(&store)
        .process(&request(json!([
            {"bug_id": "BUG-5", "title": "Refund rounding", "description": "Refund is off by a cent",
             "metadata": {"tags": ["billing"]}}
        ])))
        .await;
    let assignment = &resp.triage()[0].assignment;
    assert_eq!(assignment.assigned_to_member_id, "dev-08");
}

#[tokio::test]
async fn test_duplicate_severity_rule_ignored() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let seed_file: seed::SeedFile = serde_json::from_value(json!({
        "severity_rules": [
            {"severity": "crash", "priority": "critical", "conditions": ["crash"]},
            {"severity": "billing", "priority": "high", "conditions": ["billing"]}
        ]
    }))
    .unwrap();
    let summary = seed::import(&store, &seed_file).await.unwrap();
    assert_eq!(summary.severity_rules, 1);
    assert_eq!(store.severity_rules().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_persisted_profile_and_load_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let mut profile = PersistedProfile::new("dev-02", "Jonas");
    profile.skills.languages = vec!["go".into()];
    profile.modules_owned = vec!["payments".into()];
    store.upsert_profile(&profile).await.unwrap();
    store
        .upsert_load(&DeveloperLoad {
            member_id: "dev-02".into(),
            current_load_score: 0.1,
            open_bugs: 1,
            active_languages: vec!["go".into()],
        })
        .await
        .unwrap();

    assert_eq!(store.get_profile("dev-02").await.unwrap(), Some(profile));
    assert!(store.get_profile("dev-99").await.unwrap().is_none());
    assert_eq!(
        store
            .developer_load("dev-02")
            .await
            .unwrap()
            .map(|l| l.current_load_score),
        Some(0.1)
    );

    let resp = service(&store)
        .process(&request(json!([
            {"bug_id": "BUG-6", "title": "Goroutine leak", "description": "Workers never exit", "language": "go"}
        ])))
        .await;
    assert_eq!(
        resp.triage()[0].assignment.assigned_to_member_id,
        "dev-02"
    );
}
