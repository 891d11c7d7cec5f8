//! The triage orchestrator.
//!
//! [`TriageService::process`] takes a raw handshake request and always
//! returns a [`HandshakeResponse`]:
//!
//! 1. Validate the envelope and every bug. Any problem yields a `failed`
//!    response before an engine runs.
//! 2. Prefetch store data once per request (persisted profiles, severity
//!    rules, developer loads). Store failures degrade to input-only
//!    behavior.
//! 3. For each bug, in input order: infer language and file type, classify,
//!    assess priority, pick an assignee, suggest a fix, record history.
//! 4. Assemble a `completed` response with one result per bug.
//!
//! Request outcomes are reported to an injected [`TriageObserver`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::assign::{self, AssignmentLookups};
use crate::classify::Classifier;
use crate::fix;
use crate::handshake::{HandshakeMessage, HandshakeResponse};
use crate::lookup::Lookup;
use crate::models::{
    BugReport, ClassificationOutput, ConfidenceScores, PriorityOutput, TeamProfile, TriageResult,
};
use crate::paths;
use crate::priority;
use crate::profiles;
use crate::store::{DeveloperLoad, HistoryRecord, PersistedProfile, SeverityRule, Store};
use crate::validate::validate_request;

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    FailedValidation,
    Error,
}

/// Summary of one processed request, handed to the observer.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub duration: Duration,
    pub bug_count: usize,
    pub status: OutcomeStatus,
    pub warning_count: usize,
}

/// Sink for request outcomes (metrics, audit).
pub trait TriageObserver: Send + Sync {
    fn record_request(&self, _outcome: &RequestOutcome) {}
}

/// Observer that discards everything.
pub struct NoopObserver;

impl TriageObserver for NoopObserver {}

/// Store reads shared by every bug in a request.
struct Prefetched {
    team: Vec<TeamProfile>,
    severity_rules: Vec<SeverityRule>,
    profiles: HashMap<String, Lookup<PersistedProfile>>,
    loads: HashMap<String, Lookup<DeveloperLoad>>,
}

/// Runs the triage pipeline. Cheap to share behind an `Arc`.
pub struct TriageService {
    classifier: Classifier,
    store: Option<Arc<dyn Store>>,
    observer: Arc<dyn TriageObserver>,
}

impl TriageService {
    /// Creates a service. Without a store every lookup is unavailable and
    /// nothing is recorded.
    pub fn new(store: Option<Arc<dyn Store>>) -> Result<Self> {
        Ok(Self {
            classifier: Classifier::new()?,
            store,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn TriageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Pings the store. `None` when no store is configured.
    pub async fn store_healthy(&self) -> Option<bool> {
        let store = self.store.as_ref()?;
        Some(match store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("store ping failed: {:#}", e);
                false
            }
        })
    }

    /// Processes a raw handshake request.
    pub async fn process(&self, raw: &Value) -> HandshakeResponse {
        let started = Instant::now();
        let bug_count = raw
            .pointer("/task/bugs")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let message_id = raw
            .get("message_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let message = match validate_request(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!("rejected request {}: {}", message_id, e);
                self.report(started, bug_count, OutcomeStatus::FailedValidation, 0);
                return HandshakeResponse::failed(&message_id, format!("Validation error: {}", e));
            }
        };

        info!(
            "processing request {} with {} bug(s)",
            message.message_id, bug_count
        );
        match self.run(&message).await {
            Ok((triage, warnings)) => {
                let warning_count = warnings.len();
                self.report(started, bug_count, OutcomeStatus::Completed, warning_count);
                info!(
                    "request {} completed in {} ms",
                    message.message_id,
                    started.elapsed().as_millis()
                );
                HandshakeResponse::completed(&message.message_id, triage, warnings)
            }
            Err(e) => {
                error!("request {} failed: {:#}", message.message_id, e);
                self.report(started, bug_count, OutcomeStatus::Error, 0);
                HandshakeResponse::failed(&message.message_id, format!("Internal error: {:#}", e))
            }
        }
    }

    fn report(&self, started: Instant, bug_count: usize, status: OutcomeStatus, warnings: usize) {
        self.observer.record_request(&RequestOutcome {
            duration: started.elapsed(),
            bug_count,
            status,
            warning_count: warnings,
        });
    }

    async fn run(&self, message: &HandshakeMessage) -> Result<(Vec<TriageResult>, Vec<String>)> {
        let task = message
            .task
            .as_ref()
            .context("Task data is required")?;

        let prefetched = self.prefetch(&task.team_profiles).await;
        let mut results = Vec::with_capacity(task.bugs.len());
        let mut warnings = Vec::new();

        for bug in &task.bugs {
            let missing = bug.missing_optional_fields();
            if !missing.is_empty() {
                warnings.push(format!(
                    "Bug {}: Missing optional fields: {}. Output may be less accurate.",
                    bug.bug_id,
                    missing.join(", ")
                ));
            }
            let result = self
                .triage_bug(bug, &prefetched)
                .await
                .with_context(|| format!("triage of bug {} failed", bug.bug_id))?;
            results.push(result);
        }
        Ok((results, warnings))
    }

    async fn prefetch(&self, team: &[TeamProfile]) -> Prefetched {
        let Some(store) = &self.store else {
            return Prefetched {
                team: team.to_vec(),
                severity_rules: Vec::new(),
                profiles: HashMap::new(),
                loads: HashMap::new(),
            };
        };

        let persisted = Lookup::from_list(store.all_profiles().await);
        if !persisted.is_available() {
            warn!("persisted profiles unavailable, using request profiles only");
        }
        let team = profiles::enrich_profiles(team, &persisted);

        let severity_rules = Lookup::from_list(store.severity_rules().await);
        if !severity_rules.is_available() {
            warn!("severity rules unavailable, using heuristics only");
        }

        let mut profile_lookups = HashMap::new();
        let mut loads = HashMap::new();
        for member in &team {
            let id = member.member_id.clone();
            profile_lookups.insert(
                id.clone(),
                Lookup::from_result(store.get_profile(&id).await),
            );
            loads.insert(id.clone(), Lookup::from_result(store.developer_load(&id).await));
        }

        Prefetched {
            team,
            severity_rules: severity_rules.items().to_vec(),
            profiles: profile_lookups,
            loads,
        }
    }

    async fn triage_bug(&self, input: &BugReport, pre: &Prefetched) -> Result<TriageResult> {
        let mut bug = input.clone();
        if let Some(path) = bug.file_path() {
            let resolved = paths::resolve(Some(path), bug.language(), bug.file_type());
            if bug.language().is_none() && resolved.language.is_some() {
                info!(
                    "bug {}: detected language {:?} from {}",
                    bug.bug_id, resolved.language, path
                );
            }
            bug.language = resolved.language;
            bug.file_type = resolved.file_type;
        }

        let classification = self.classifier.classify(&bug);
        debug!(
            "bug {}: {} / {} ({:.2})",
            bug.bug_id, classification.category, classification.bug_type, classification.confidence
        );

        let assessment = priority::assess(&bug, &classification, &pre.severity_rules);

        let routing_rules = match &self.store {
            Some(store) => Lookup::from_list(store.applicable_routing_rules(&bug).await),
            None => Lookup::Unavailable,
        };
        let lookups = AssignmentLookups {
            routing_rules,
            profiles: pre.profiles.clone(),
            loads: pre.loads.clone(),
        };
        let assignment = assign::assign(&bug, &pre.team, &lookups);
        let suggested_fix = fix::suggest(&bug, &classification);

        let confidence = ConfidenceScores::from_stages(
            classification.confidence,
            assessment.confidence,
            assignment.confidence,
        );
        let result = TriageResult {
            bug_id: bug.bug_id.clone(),
            classification: ClassificationOutput {
                category: classification.category.to_string(),
                bug_type: classification.bug_type,
                root_cause: classification.root_cause,
            },
            priority: PriorityOutput {
                level: assessment.level,
                justification: assessment.justification,
            },
            assignment: assignment.into(),
            suggested_fix,
            confidence_scores: confidence,
        };

        self.record(&bug, &result).await?;
        Ok(result)
    }

    /// Appends to the history log. Store failures are logged, not returned.
    async fn record(&self, bug: &BugReport, result: &TriageResult) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let record = HistoryRecord {
            bug_id: result.bug_id.clone(),
            language: bug.language.clone(),
            file_type: bug.file_type.clone(),
            classification: result.classification.clone(),
            priority: result.priority.clone(),
            assignment: result.assignment.clone(),
            suggested_fix: result.suggested_fix.clone(),
            confidence: result.confidence_scores.clone(),
            bug: serde_json::to_value(bug).context("failed to serialize bug for history")?,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        match store.append_history(&record).await {
            Ok(true) => {}
            Ok(false) => warn!("history for bug {} was not recorded", result.bug_id),
            Err(e) => warn!("failed to record history for bug {}: {:#}", result.bug_id, e),
        }
        Ok(())
    }
}
