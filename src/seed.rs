//! Bulk import of team data and rules from a JSON file.
//!
//! ```json
//! {
//!   "team_members": [{"member_id": "dev-01", "name": "Priya", "skills": {"languages": ["python"]}}],
//!   "developer_load": [{"member_id": "dev-01", "current_load_score": 0.2}],
//!   "severity_rules": [{"severity": "outage", "priority": "critical", "conditions": ["production"]}],
//!   "routing_rules": [{"rule_type": "module", "assign_to": ["dev-01"], "priority": 10,
//!                      "conditions": {"modules": ["auth"]}}]
//! }
//! ```
//!
//! Members and loads are upserted by `member_id`; severity rules are skipped
//! when the same severity and priority already exist; routing rules are
//! appended.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use bug_triage_core::store::{DeveloperLoad, PersistedProfile, RoutingRule, SeverityRule};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub team_members: Vec<PersistedProfile>,
    #[serde(default)]
    pub developer_load: Vec<DeveloperLoad>,
    #[serde(default)]
    pub severity_rules: Vec<SeverityRule>,
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub team_members: usize,
    pub developer_load: usize,
    pub severity_rules: usize,
    pub routing_rules: usize,
}

pub fn load_seed_file(path: &Path) -> Result<SeedFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {}", path.display()))
}

/// Writes every record of `seed` into `store`.
pub async fn import(store: &SqliteStore, seed: &SeedFile) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    for member in &seed.team_members {
        store
            .upsert_profile(member)
            .await
            .with_context(|| format!("Failed to store team member {}", member.member_id))?;
        summary.team_members += 1;
    }
    for load in &seed.developer_load {
        store
            .upsert_load(load)
            .await
            .with_context(|| format!("Failed to store load for {}", load.member_id))?;
        summary.developer_load += 1;
    }
    for rule in &seed.severity_rules {
        if store.insert_severity_rule(rule).await? {
            summary.severity_rules += 1;
        }
    }
    for rule in &seed.routing_rules {
        store.insert_routing_rule(rule).await?;
        summary.routing_rules += 1;
    }
    Ok(summary)
}

/// `triage seed <file>`: migrates the database if needed, then imports.
pub async fn run_seed(config: &Config, path: &Path) -> Result<()> {
    let seed = load_seed_file(path)?;
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store = SqliteStore::new(pool.clone());
    let summary = import(&store, &seed).await?;
    pool.close().await;

    println!("Seed complete: {}", path.display());
    println!("  team members: {}", summary.team_members);
    println!("  developer loads: {}", summary.developer_load);
    println!("  severity rules: {}", summary.severity_rules);
    println!("  routing rules: {}", summary.routing_rules);
    Ok(())
}
