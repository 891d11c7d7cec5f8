//! Priority assessment.
//!
//! Persisted severity rules are checked first, in the order supplied; the
//! first rule whose conditions all hold decides the level. Otherwise a tiered
//! heuristic over environment, category, type, and tags applies.

use crate::classify::ClassificationResult;
use crate::models::{BugReport, Category, PriorityLevel};
use crate::store::SeverityRule;

const RULE_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityAssessment {
    pub level: PriorityLevel,
    pub justification: String,
    pub confidence: f64,
}

/// Facts about a bug the heuristic tiers look at.
struct Signals {
    production: bool,
    category: Category,
    bug_type: String,
    tags: String,
}

fn critical(s: &Signals) -> bool {
    s.production
        && (s.category == Category::Security
            || (s.category == Category::RuntimeError && s.tags.contains("crash"))
            || s.tags.contains("data_loss"))
}

fn high(s: &Signals) -> bool {
    s.category == Category::Security
        || (s.category == Category::RuntimeError
            && (s.bug_type.contains("crash") || s.bug_type.contains("exception")))
        || (s.production
            && matches!(s.category, Category::Performance | Category::LogicError))
}

fn medium(s: &Signals) -> bool {
    matches!(
        s.category,
        Category::Performance | Category::LogicError | Category::ConfigurationError
    )
}

fn low(_: &Signals) -> bool {
    true
}

/// Heuristic tiers, most urgent first, each with its generic impact phrase.
const TIERS: &[(PriorityLevel, fn(&Signals) -> bool, &str)] = &[
    (PriorityLevel::Critical, critical, "severe impact on system"),
    (PriorityLevel::High, high, "significant impact"),
    (PriorityLevel::Medium, medium, "moderate impact"),
    (PriorityLevel::Low, low, "minimal impact"),
];

/// Assesses priority. Never fails.
pub fn assess(
    bug: &BugReport,
    classification: &ClassificationResult,
    severity_rules: &[SeverityRule],
) -> PriorityAssessment {
    if let Some(rule) = severity_rules
        .iter()
        .find(|r| rule_matches(r, bug, classification.category))
    {
        return PriorityAssessment {
            level: rule.priority,
            justification: format!(
                "Matches severity rule: {} -> {}",
                rule.severity, rule.priority
            ),
            confidence: RULE_CONFIDENCE,
        };
    }

    let signals = Signals {
        production: bug.is_production(),
        category: classification.category,
        bug_type: classification.bug_type.to_lowercase(),
        tags: bug.joined_tags(),
    };
    let (level, generic) = TIERS
        .iter()
        .find(|(_, holds, _)| holds(&signals))
        .map(|(level, _, generic)| (*level, *generic))
        .unwrap_or((PriorityLevel::Low, "minimal impact"));

    PriorityAssessment {
        level,
        justification: justification(level, &signals, generic),
        confidence: confidence(bug, classification),
    }
}

/// All conditions must hold. `production` checks the environment; any other
/// condition matches a tag, or a substring of the category or joined tags.
fn rule_matches(rule: &SeverityRule, bug: &BugReport, category: Category) -> bool {
    if rule.language_specific {
        let speaks = bug
            .language()
            .is_some_and(|lang| rule.languages.iter().any(|l| l.eq_ignore_ascii_case(lang)));
        if !speaks {
            return false;
        }
    }

    let category = category.as_str().to_lowercase();
    let joined = bug.joined_tags();
    rule.conditions.iter().all(|condition| {
        let condition = condition.to_lowercase();
        if condition == "production" {
            return bug.is_production();
        }
        bug.tags().iter().any(|t| t.to_lowercase() == condition)
            || category.contains(&condition)
            || joined.contains(&condition)
    })
}

fn justification(level: PriorityLevel, s: &Signals, generic: &str) -> String {
    let mut reasons = Vec::new();
    if s.production {
        reasons.push("affecting production environment");
    }
    match s.category {
        Category::Security => reasons.push("security vulnerability"),
        Category::RuntimeError => reasons.push("runtime error causing application instability"),
        _ => {}
    }
    if s.tags.contains("crash") {
        reasons.push("causing application crashes");
    }

    let body = if reasons.is_empty() {
        generic.to_string()
    } else {
        reasons.join("; ")
    };
    format!("{} priority: {}", level.label(), body)
}

fn confidence(bug: &BugReport, classification: &ClassificationResult) -> f64 {
    let mut c = 0.7;
    if bug.environment().is_some() {
        c += 0.1;
    }
    if !bug.tags().is_empty() {
        c += 0.1;
    }
    if classification.confidence > 0.8 {
        c += 0.1;
    }
    f64::min(c, 1.0)
}
