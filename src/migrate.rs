use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use bug_triage_core::models::PriorityLevel;
use bug_triage_core::store::SeverityRule;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Severity rules every fresh database starts with.
fn default_severity_rules() -> Vec<SeverityRule> {
    let rule = |severity: &str, conditions: &[&str]| SeverityRule {
        severity: severity.to_string(),
        priority: PriorityLevel::Critical,
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
        language_specific: false,
        languages: Vec::new(),
    };
    vec![
        rule("crash", &["crash", "production"]),
        rule("security_vulnerability", &["public_exploit", "production"]),
        rule("data_loss", &["data_loss", "production"]),
    ]
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and seeds default rules. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            member_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            skills_json TEXT NOT NULL DEFAULT '{}',
            modules_owned_json TEXT NOT NULL DEFAULT '[]',
            open_assigned_bugs INTEGER,
            primary_stack TEXT,
            experience_years INTEGER,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS developer_load (
            member_id TEXT PRIMARY KEY,
            current_load_score REAL NOT NULL DEFAULT 0.5,
            open_bugs INTEGER NOT NULL DEFAULT 0,
            active_languages_json TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS severity_priority_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            severity TEXT NOT NULL,
            priority TEXT NOT NULL,
            conditions_json TEXT NOT NULL DEFAULT '[]',
            language_specific INTEGER NOT NULL DEFAULT 0,
            languages_json TEXT NOT NULL DEFAULT '[]',
            UNIQUE(severity, priority)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routing_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rule_type TEXT NOT NULL,
            assign_to_json TEXT NOT NULL DEFAULT '[]',
            priority INTEGER NOT NULL DEFAULT 0,
            conditions_json TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS triage_history (
            id TEXT PRIMARY KEY,
            bug_id TEXT NOT NULL,
            language TEXT,
            file_type TEXT,
            category TEXT NOT NULL,
            bug_type TEXT NOT NULL,
            priority TEXT NOT NULL,
            assigned_to TEXT NOT NULL,
            record_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_triage_history_bug ON triage_history(bug_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_routing_rules_priority ON routing_rules(priority)")
        .execute(pool)
        .await?;

    let store = SqliteStore::new(pool.clone());
    for rule in default_severity_rules() {
        if store.insert_severity_rule(&rule).await? {
            info!("seeded severity rule: {} -> {}", rule.severity, rule.priority);
        }
    }

    Ok(())
}
