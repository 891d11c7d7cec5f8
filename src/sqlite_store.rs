//! SQLite-backed [`Store`] implementation.
//!
//! List-valued fields (skills, modules, rule conditions, assignees) live in
//! JSON text columns. Routing-rule matching happens in Rust after loading the
//! rules by priority, since the conditions are not indexed.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::info;

use bug_triage_core::models::{BugReport, PriorityLevel, Skills};
use bug_triage_core::store::{
    DeveloperLoad, HistoryRecord, PersistedProfile, RoutingConditions, RoutingRule, SeverityRule,
    Store, Workload,
};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// SQLite implementation of the [`Store`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts or replaces a team member.
    pub async fn upsert_profile(&self, profile: &PersistedProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO team_members (member_id, name, email, skills_json, modules_owned_json,
                                      open_assigned_bugs, primary_stack, experience_years, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(member_id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                skills_json = excluded.skills_json,
                modules_owned_json = excluded.modules_owned_json,
                open_assigned_bugs = excluded.open_assigned_bugs,
                primary_stack = excluded.primary_stack,
                experience_years = excluded.experience_years,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.member_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(serde_json::to_string(&profile.skills)?)
        .bind(serde_json::to_string(&profile.modules_owned)?)
        .bind(profile.open_assigned_bugs())
        .bind(&profile.primary_stack)
        .bind(profile.experience_years)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert_load(&self, load: &DeveloperLoad) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO developer_load (member_id, current_load_score, open_bugs,
                                        active_languages_json, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(member_id) DO UPDATE SET
                current_load_score = excluded.current_load_score,
                open_bugs = excluded.open_bugs,
                active_languages_json = excluded.active_languages_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&load.member_id)
        .bind(load.current_load_score)
        .bind(load.open_bugs)
        .bind(serde_json::to_string(&load.active_languages)?)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a severity rule unless one with the same severity and
    /// priority exists. Returns whether a row was written.
    pub async fn insert_severity_rule(&self, rule: &SeverityRule) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO severity_priority_rules
                (severity, priority, conditions_json, language_specific, languages_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rule.severity)
        .bind(rule.priority.as_str())
        .bind(serde_json::to_string(&rule.conditions)?)
        .bind(rule.language_specific)
        .bind(serde_json::to_string(&rule.languages)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Appends a routing rule and returns its row id.
    pub async fn insert_routing_rule(&self, rule: &RoutingRule) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO routing_rules (rule_type, assign_to_json, priority, conditions_json)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&rule.rule_type)
        .bind(serde_json::to_string(&rule.assign_to)?)
        .bind(rule.priority)
        .bind(serde_json::to_string(&rule.conditions)?)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn history_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM triage_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// History records for one bug, oldest first.
    pub async fn history_for(&self, bug_id: &str) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT record_json FROM triage_history WHERE bug_id = ? ORDER BY created_at, rowid",
        )
        .bind(bug_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| json_column(row, "record_json"))
            .collect()
    }
}

/// Opens the configured store, migrating it first. `None` when
/// `[store].enabled` is false.
pub async fn open(config: &Config) -> Result<Option<Arc<dyn Store>>> {
    if !config.store.enabled {
        info!("store disabled, triage will use request data only");
        return Ok(None);
    }
    let pool = db::connect(config).await?;
    migrate::apply(&pool)
        .await
        .context("Failed to migrate triage database")?;
    info!("using store at {}", config.db.path.display());
    Ok(Some(Arc::new(SqliteStore::new(pool))))
}

fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in column {}", column))
}

fn profile_from_row(row: &SqliteRow) -> Result<PersistedProfile> {
    let skills: Skills = json_column(row, "skills_json")?;
    let open_assigned_bugs: Option<i64> = row.try_get("open_assigned_bugs")?;
    Ok(PersistedProfile {
        member_id: row.try_get("member_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        skills,
        modules_owned: json_column(row, "modules_owned_json")?,
        workload: open_assigned_bugs.map(|n| Workload {
            open_assigned_bugs: n,
        }),
        primary_stack: row.try_get("primary_stack")?,
        experience_years: row.try_get("experience_years")?,
    })
}

fn severity_rule_from_row(row: &SqliteRow) -> Result<SeverityRule> {
    let priority: String = row.try_get("priority")?;
    Ok(SeverityRule {
        severity: row.try_get("severity")?,
        priority: PriorityLevel::parse(&priority)
            .ok_or_else(|| anyhow!("unknown priority in severity rule: {}", priority))?,
        conditions: json_column(row, "conditions_json")?,
        language_specific: row.try_get("language_specific")?,
        languages: json_column(row, "languages_json")?,
    })
}

fn routing_rule_from_row(row: &SqliteRow) -> Result<RoutingRule> {
    let conditions: RoutingConditions = json_column(row, "conditions_json")?;
    Ok(RoutingRule {
        rule_type: row.try_get("rule_type")?,
        assign_to: json_column(row, "assign_to_json")?,
        priority: row.try_get("priority")?,
        conditions,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_profile(&self, member_id: &str) -> Result<Option<PersistedProfile>> {
        let row = sqlx::query("SELECT * FROM team_members WHERE member_id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    async fn all_profiles(&self) -> Result<Vec<PersistedProfile>> {
        let rows = sqlx::query("SELECT * FROM team_members ORDER BY member_id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(profile_from_row).collect()
    }

    async fn severity_rules(&self) -> Result<Vec<SeverityRule>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM severity_priority_rules
            ORDER BY CASE priority
                WHEN 'critical' THEN 0
                WHEN 'high' THEN 1
                WHEN 'medium' THEN 2
                ELSE 3
            END, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(severity_rule_from_row).collect()
    }

    async fn applicable_routing_rules(&self, bug: &BugReport) -> Result<Vec<RoutingRule>> {
        let rows = sqlx::query("SELECT * FROM routing_rules ORDER BY priority DESC, id")
            .fetch_all(&self.pool)
            .await?;
        let mut rules = Vec::new();
        for row in &rows {
            let rule = routing_rule_from_row(row)?;
            if rule.applies_to(bug) {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    async fn developer_load(&self, member_id: &str) -> Result<Option<DeveloperLoad>> {
        let row = sqlx::query("SELECT * FROM developer_load WHERE member_id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(DeveloperLoad {
                member_id: row.try_get("member_id")?,
                current_load_score: row.try_get("current_load_score")?,
                open_bugs: row.try_get("open_bugs")?,
                active_languages: json_column(&row, "active_languages_json")?,
            })),
            None => Ok(None),
        }
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO triage_history (id, bug_id, language, file_type, category, bug_type,
                                        priority, assigned_to, record_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&record.bug_id)
        .bind(&record.language)
        .bind(&record.file_type)
        .bind(&record.classification.category)
        .bind(&record.classification.bug_type)
        .bind(record.priority.level.as_str())
        .bind(&record.assignment.assigned_to_member_id)
        .bind(serde_json::to_string(record)?)
        .bind(&record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
