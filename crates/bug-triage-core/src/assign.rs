//! Assignee selection.
//!
//! A matching routing rule wins outright. Otherwise every candidate is scored
//! on language, module ownership, framework/domain mentions, and load; the
//! highest score wins, earlier candidates first on ties.

use std::collections::HashMap;

use crate::lookup::Lookup;
use crate::models::{AssignmentOutput, BugReport, TeamProfile};
use crate::paths;
use crate::store::{DeveloperLoad, PersistedProfile, RoutingRule};

const ROUTED_CONFIDENCE: f64 = 0.95;
const FALLBACK_CONFIDENCE: f64 = 0.3;

const DECLARED_LANGUAGE: f64 = 5.0;
const PERSISTED_LANGUAGE: f64 = 4.0;
const DECLARED_MODULE: f64 = 4.0;
const PERSISTED_MODULE: f64 = 3.5;
const MENTION: f64 = 1.0;
const HEAVY_LOAD_PENALTY: f64 = 1.0;
const IDLE_BONUS: f64 = 0.5;
const HIGH_LOAD_SCORE_PENALTY: f64 = 1.5;
const LOW_LOAD_SCORE_BONUS: f64 = 0.5;

/// Prefetched store reads for one bug.
#[derive(Debug, Clone)]
pub struct AssignmentLookups {
    /// Applicable routing rules, highest priority first.
    pub routing_rules: Lookup<Vec<RoutingRule>>,
    pub profiles: HashMap<String, Lookup<PersistedProfile>>,
    pub loads: HashMap<String, Lookup<DeveloperLoad>>,
}

impl AssignmentLookups {
    /// Lookups for a deployment without a store.
    pub fn unavailable() -> Self {
        Self {
            routing_rules: Lookup::Unavailable,
            profiles: HashMap::new(),
            loads: HashMap::new(),
        }
    }

    fn profile(&self, member_id: &str) -> Option<&PersistedProfile> {
        self.profiles.get(member_id).and_then(Lookup::found)
    }

    fn load(&self, member_id: &str) -> Option<&DeveloperLoad> {
        self.loads.get(member_id).and_then(Lookup::found)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub member_id: String,
    pub name: String,
    pub confidence: f64,
}

impl From<Assignment> for AssignmentOutput {
    fn from(a: Assignment) -> Self {
        AssignmentOutput {
            assigned_to_member_id: a.member_id,
            assigned_to_name: a.name,
            confidence: a.confidence,
        }
    }
}

/// Picks an assignee. Never fails; an empty team yields `unknown`.
pub fn assign(
    bug: &BugReport,
    candidates: &[TeamProfile],
    lookups: &AssignmentLookups,
) -> Assignment {
    if let Some(routed) = route(lookups.routing_rules.items()) {
        return routed;
    }

    let description = bug.description.to_lowercase();
    let module = bug.file_path().and_then(paths::module_for_path);

    let mut best: Option<(&TeamProfile, f64)> = None;
    for candidate in candidates {
        let score = score(bug, candidate, &description, module, lookups);
        if score <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    match (best, candidates.first()) {
        (Some((winner, score)), _) => Assignment {
            member_id: winner.member_id.clone(),
            name: winner.name.clone(),
            confidence: f64::min(score / 10.0, 1.0),
        },
        (None, Some(first)) => Assignment {
            member_id: first.member_id.clone(),
            name: first.name.clone(),
            confidence: FALLBACK_CONFIDENCE,
        },
        (None, None) => Assignment {
            member_id: "unknown".to_string(),
            name: "Unknown".to_string(),
            confidence: 0.0,
        },
    }
}

/// First assignee of the highest-priority rule. Rules without assignees
/// fall through to scoring.
fn route(rules: &[RoutingRule]) -> Option<Assignment> {
    let rule = rules.first()?;
    let member_id = rule.assign_to.first()?;
    tracing::debug!("routing rule '{}' assigns to {}", rule.rule_type, member_id);
    Some(Assignment {
        member_id: member_id.clone(),
        name: member_id.clone(),
        confidence: ROUTED_CONFIDENCE,
    })
}

fn score(
    bug: &BugReport,
    candidate: &TeamProfile,
    description: &str,
    module: Option<&str>,
    lookups: &AssignmentLookups,
) -> f64 {
    let skills = candidate.skills();
    let persisted = lookups.profile(&candidate.member_id);
    let mut score = 0.0;

    if let Some(lang) = bug.language() {
        if skills.has_language(lang) {
            score += DECLARED_LANGUAGE;
        } else if persisted.is_some_and(|p| p.skills.has_language(lang)) {
            score += PERSISTED_LANGUAGE;
        }
    }

    if let Some(module) = module {
        if candidate.modules_owned().iter().any(|m| m == module) {
            score += DECLARED_MODULE;
        } else if persisted.is_some_and(|p| p.modules_owned.iter().any(|m| m == module)) {
            score += PERSISTED_MODULE;
        }
    }

    let mentions = skills
        .frameworks
        .iter()
        .chain(skills.domains.iter())
        .filter(|s| !s.is_empty() && description.contains(&s.to_lowercase()))
        .count();
    score += MENTION * mentions as f64;

    match candidate.current_load {
        Some(load) if load > 5 => score -= HEAVY_LOAD_PENALTY,
        Some(0) => score += IDLE_BONUS,
        _ => {}
    }

    if let Some(load) = lookups.load(&candidate.member_id) {
        if load.current_load_score > 0.8 {
            score -= HIGH_LOAD_SCORE_PENALTY;
        } else if load.current_load_score < 0.3 {
            score += LOW_LOAD_SCORE_BONUS;
        }
    }

    f64::max(score, 0.0)
}
