//! In-memory [`Store`] implementation for tests and storeless deployments.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Profiles and loads
//! are keyed by member id; rules keep insertion order. A store can be
//! switched to unavailable to exercise degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::BugReport;

use super::{
    sort_routing_rules, DeveloperLoad, HistoryRecord, PersistedProfile, RoutingRule,
    SeverityRule, Store,
};

/// In-memory store.
pub struct InMemoryStore {
    profiles: RwLock<Vec<PersistedProfile>>,
    loads: RwLock<HashMap<String, DeveloperLoad>>,
    severity_rules: RwLock<Vec<SeverityRule>>,
    routing_rules: RwLock<Vec<RoutingRule>>,
    history: RwLock<Vec<HistoryRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(Vec::new()),
            loads: RwLock::new(HashMap::new()),
            severity_rules: RwLock::new(Vec::new()),
            routing_rules: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_profile(self, profile: PersistedProfile) -> Self {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.retain(|p| p.member_id != profile.member_id);
            profiles.push(profile);
        }
        self
    }

    pub fn with_load(self, load: DeveloperLoad) -> Self {
        if let Ok(mut loads) = self.loads.write() {
            loads.insert(load.member_id.clone(), load);
        }
        self
    }

    pub fn with_severity_rule(self, rule: SeverityRule) -> Self {
        if let Ok(mut rules) = self.severity_rules.write() {
            rules.push(rule);
        }
        self
    }

    pub fn with_routing_rule(self, rule: RoutingRule) -> Self {
        if let Ok(mut rules) = self.routing_rules.write() {
            rules.push(rule);
        }
        self
    }

    /// Makes every subsequent read and write fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the history log.
    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("in-memory store marked unavailable");
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn get_profile(&self, member_id: &str) -> Result<Option<PersistedProfile>> {
        self.check()?;
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.iter().find(|p| p.member_id == member_id).cloned())
    }

    async fn all_profiles(&self) -> Result<Vec<PersistedProfile>> {
        self.check()?;
        Ok(self.profiles.read().map_err(poisoned)?.clone())
    }

    async fn severity_rules(&self) -> Result<Vec<SeverityRule>> {
        self.check()?;
        let mut rules = self.severity_rules.read().map_err(poisoned)?.clone();
        rules.sort_by_key(|r| r.priority.rank());
        Ok(rules)
    }

    async fn applicable_routing_rules(&self, bug: &BugReport) -> Result<Vec<RoutingRule>> {
        self.check()?;
        let mut rules: Vec<RoutingRule> = self
            .routing_rules
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.applies_to(bug))
            .cloned()
            .collect();
        sort_routing_rules(&mut rules);
        Ok(rules)
    }

    async fn developer_load(&self, member_id: &str) -> Result<Option<DeveloperLoad>> {
        self.check()?;
        Ok(self.loads.read().map_err(poisoned)?.get(member_id).cloned())
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<bool> {
        self.check()?;
        self.history.write().map_err(poisoned)?.push(record.clone());
        Ok(true)
    }
}
