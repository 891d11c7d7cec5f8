//! Storage abstraction for the triage service.
//!
//! The [`Store`] trait is the only way the service reaches persisted team
//! data, rules, and the triage history. The orchestrator is the sole caller;
//! engines receive prefetched [`Lookup`](crate::lookup::Lookup) values.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{
    AssignmentOutput, BugReport, ClassificationOutput, ConfidenceScores, PriorityLevel,
    PriorityOutput, Skills, SuggestedFix,
};
use crate::paths;

/// Open-work counter kept alongside a persisted profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub open_assigned_bugs: i64,
}

/// A team member as recorded in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedProfile {
    pub member_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub skills: Skills,
    #[serde(default)]
    pub modules_owned: Vec<String>,
    #[serde(default)]
    pub workload: Option<Workload>,
    #[serde(default)]
    pub primary_stack: Option<String>,
    #[serde(default)]
    pub experience_years: Option<i64>,
}

impl PersistedProfile {
    pub fn new(member_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            email: None,
            skills: Skills::default(),
            modules_owned: Vec::new(),
            workload: None,
            primary_stack: None,
            experience_years: None,
        }
    }

    pub fn open_assigned_bugs(&self) -> Option<i64> {
        self.workload.as_ref().map(|w| w.open_assigned_bugs)
    }
}

fn default_load_score() -> f64 {
    0.5
}

/// Tracked load of a developer. `current_load_score` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperLoad {
    pub member_id: String,
    #[serde(default = "default_load_score")]
    pub current_load_score: f64,
    #[serde(default)]
    pub open_bugs: i64,
    #[serde(default)]
    pub active_languages: Vec<String>,
}

/// Maps a severity label to a priority when all its conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRule {
    pub severity: String,
    pub priority: PriorityLevel,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub language_specific: bool,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingConditions {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
}

/// Sends bugs matching its conditions straight to a fixed assignee list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub rule_type: String,
    #[serde(default)]
    pub assign_to: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub conditions: RoutingConditions,
}

impl RoutingRule {
    /// True when the bug's language, any tag, or its routing module
    /// (`auth` / `api` from the code path) is named by the rule.
    pub fn applies_to(&self, bug: &BugReport) -> bool {
        let c = &self.conditions;
        let language_hit = bug
            .language()
            .is_some_and(|lang| c.languages.iter().any(|l| l.eq_ignore_ascii_case(lang)));
        let tag_hit = bug.tags().iter().any(|t| c.tags.contains(t));
        let module_hit = bug
            .file_path()
            .and_then(paths::routing_module_for_path)
            .is_some_and(|m| c.modules.iter().any(|rm| rm == m));
        language_hit || tag_hit || module_hit
    }
}

/// Sorts rules by descending priority, keeping insertion order among equals.
pub fn sort_routing_rules(rules: &mut [RoutingRule]) {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Append-only record of one triage decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub bug_id: String,
    pub language: Option<String>,
    pub file_type: Option<String>,
    pub classification: ClassificationOutput,
    pub priority: PriorityOutput,
    pub assignment: AssignmentOutput,
    pub suggested_fix: SuggestedFix,
    pub confidence: ConfidenceScores,
    pub bug: serde_json::Value,
    pub created_at: String,
}

/// Abstract storage backend for the triage service.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ping`](Store::ping) | Liveness probe used by `/health` |
/// | [`get_profile`](Store::get_profile) | One persisted team member |
/// | [`all_profiles`](Store::all_profiles) | Every persisted team member |
/// | [`severity_rules`](Store::severity_rules) | Severity rules, most urgent first |
/// | [`applicable_routing_rules`](Store::applicable_routing_rules) | Routing rules matching a bug |
/// | [`developer_load`](Store::developer_load) | Tracked load of one member |
/// | [`append_history`](Store::append_history) | Record a triage decision |
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn get_profile(&self, member_id: &str) -> Result<Option<PersistedProfile>>;

    async fn all_profiles(&self) -> Result<Vec<PersistedProfile>>;

    /// Severity rules ordered by resulting priority, critical first.
    async fn severity_rules(&self) -> Result<Vec<SeverityRule>>;

    /// Routing rules that apply to `bug`, highest priority first.
    async fn applicable_routing_rules(&self, bug: &BugReport) -> Result<Vec<RoutingRule>>;

    async fn developer_load(&self, member_id: &str) -> Result<Option<DeveloperLoad>>;

    /// Appends a history record. `Ok(false)` means the store declined it.
    async fn append_history(&self, record: &HistoryRecord) -> Result<bool>;
}
