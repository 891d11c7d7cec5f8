//! Data models that flow through the triage pipeline.
//!
//! Input types ([`BugReport`], [`TeamProfile`]) deserialize directly from the
//! supervisor's JSON payload. Output types ([`TriageResult`] and its parts)
//! serialize into the `results.triage` array of the response envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location and excerpt of the code a bug points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeContext {
    pub file_path: String,
    #[serde(default)]
    pub line_start: Option<i64>,
    #[serde(default)]
    pub line_end: Option<i64>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl CodeContext {
    /// The snippet, if present and non-empty.
    pub fn snippet(&self) -> Option<&str> {
        non_empty(self.snippet.as_deref())
    }
}

/// Free-form reporter metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A single bug report as submitted by the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub bug_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub steps_to_reproduce: Option<Vec<String>>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub code_context: Option<CodeContext>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl BugReport {
    /// Minimal report with only the mandatory fields set.
    pub fn new(
        bug_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            bug_id: bug_id.into(),
            title: title.into(),
            description: description.into(),
            steps_to_reproduce: None,
            stack_trace: None,
            logs: None,
            code_context: None,
            language: None,
            file_type: None,
            metadata: None,
        }
    }

    pub fn stack_trace(&self) -> Option<&str> {
        non_empty(self.stack_trace.as_deref())
    }

    pub fn logs(&self) -> Option<&str> {
        non_empty(self.logs.as_deref())
    }

    pub fn language(&self) -> Option<&str> {
        non_empty(self.language.as_deref())
    }

    pub fn file_type(&self) -> Option<&str> {
        non_empty(self.file_type.as_deref())
    }

    pub fn file_path(&self) -> Option<&str> {
        self.code_context
            .as_ref()
            .and_then(|c| non_empty(Some(c.file_path.as_str())))
    }

    pub fn snippet(&self) -> Option<&str> {
        self.code_context.as_ref().and_then(CodeContext::snippet)
    }

    /// The environment tag, if present and non-empty.
    pub fn environment(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| non_empty(m.environment.as_deref()))
    }

    pub fn is_production(&self) -> bool {
        self.environment()
            .is_some_and(|e| e.eq_ignore_ascii_case("production"))
    }

    pub fn tags(&self) -> &[String] {
        self.metadata
            .as_ref()
            .and_then(|m| m.tags.as_deref())
            .unwrap_or(&[])
    }

    /// All tags lower-cased and joined by single spaces.
    pub fn joined_tags(&self) -> String {
        self.tags()
            .iter()
            .map(|t| t.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Names of optional fields that are missing, in a fixed order.
    pub fn missing_optional_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.steps_to_reproduce.as_ref().map_or(true, |s| s.is_empty()) {
            missing.push("steps_to_reproduce");
        }
        if self.stack_trace().is_none() {
            missing.push("stack_trace");
        }
        if self.logs().is_none() {
            missing.push("logs");
        }
        match &self.code_context {
            None => missing.push("code_context"),
            Some(ctx) if ctx.snippet().is_none() => missing.push("code_context.snippet"),
            Some(_) => {}
        }
        missing
    }
}

/// Structured skill set of a team member.
///
/// Deserializes from either `{languages, frameworks, domains}` or a legacy
/// flat list; a flat list becomes `domains` with no languages or frameworks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSkills")]
pub struct Skills {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub domains: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSkills {
    Structured {
        #[serde(default)]
        languages: Option<Vec<String>>,
        #[serde(default)]
        frameworks: Option<Vec<String>>,
        #[serde(default)]
        domains: Option<Vec<String>>,
    },
    Legacy(Vec<String>),
}

impl From<RawSkills> for Skills {
    fn from(raw: RawSkills) -> Self {
        match raw {
            RawSkills::Structured {
                languages,
                frameworks,
                domains,
            } => Skills {
                languages: languages.unwrap_or_default(),
                frameworks: frameworks.unwrap_or_default(),
                domains: domains.unwrap_or_default(),
            },
            RawSkills::Legacy(domains) => Skills {
                languages: Vec::new(),
                frameworks: Vec::new(),
                domains,
            },
        }
    }
}

impl Skills {
    pub fn has_language(&self, language: &str) -> bool {
        self.languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// A candidate assignee supplied with the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub member_id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Option<Skills>,
    #[serde(default)]
    pub modules_owned: Option<Vec<String>>,
    #[serde(default)]
    pub current_load: Option<i64>,
}

impl TeamProfile {
    pub fn new(member_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            name: name.into(),
            skills: None,
            modules_owned: None,
            current_load: None,
        }
    }

    pub fn skills(&self) -> Skills {
        self.skills.clone().unwrap_or_default()
    }

    pub fn modules_owned(&self) -> &[String] {
        self.modules_owned.as_deref().unwrap_or(&[])
    }
}

/// High-level bug category, in the fixed tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    RuntimeError,
    Security,
    Performance,
    LogicError,
    ConfigurationError,
    UxUiIssue,
}

impl Category {
    /// All categories in tie-break order.
    pub const ALL: [Category; 6] = [
        Category::RuntimeError,
        Category::Security,
        Category::Performance,
        Category::LogicError,
        Category::ConfigurationError,
        Category::UxUiIssue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::RuntimeError => "Runtime Error",
            Category::Security => "Security",
            Category::Performance => "Performance",
            Category::LogicError => "Logic Error",
            Category::ConfigurationError => "Configuration Error",
            Category::UxUiIssue => "UX/UI Issue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority level of a triaged bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Critical => "critical",
            PriorityLevel::High => "high",
            PriorityLevel::Medium => "medium",
            PriorityLevel::Low => "low",
        }
    }

    /// Capitalized label used in justifications.
    pub fn label(&self) -> &'static str {
        match self {
            PriorityLevel::Critical => "Critical",
            PriorityLevel::High => "High",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::Low => "Low",
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(&self) -> u8 {
        match self {
            PriorityLevel::Critical => 0,
            PriorityLevel::High => 1,
            PriorityLevel::Medium => 2,
            PriorityLevel::Low => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(PriorityLevel::Critical),
            "high" => Some(PriorityLevel::High),
            "medium" => Some(PriorityLevel::Medium),
            "low" => Some(PriorityLevel::Low),
            _ => None,
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============ Output ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutput {
    pub category: String,
    #[serde(rename = "type")]
    pub bug_type: String,
    pub root_cause: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityOutput {
    pub level: PriorityLevel,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOutput {
    pub assigned_to_member_id: String,
    pub assigned_to_name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub approach: String,
    pub estimated_effort: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub classification_confidence: f64,
    pub priority_confidence: f64,
    pub assignee_confidence: f64,
    pub overall_confidence: f64,
}

impl ConfidenceScores {
    /// Clamps each stage score to `[0, 1]`; overall is their unweighted mean.
    pub fn from_stages(classification: f64, priority: f64, assignee: f64) -> Self {
        let classification = clamp_unit(classification);
        let priority = clamp_unit(priority);
        let assignee = clamp_unit(assignee);
        Self {
            classification_confidence: classification,
            priority_confidence: priority,
            assignee_confidence: assignee,
            overall_confidence: clamp_unit((classification + priority + assignee) / 3.0),
        }
    }
}

/// Triage decision for one bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub bug_id: String,
    pub classification: ClassificationOutput,
    pub priority: PriorityOutput,
    pub assignment: AssignmentOutput,
    pub suggested_fix: SuggestedFix,
    pub confidence_scores: ConfidenceScores,
}

pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_skills() {
        let s: Skills = serde_json::from_value(json!({
            "languages": ["java"],
            "frameworks": ["spring"]
        }))
        .unwrap();
        assert_eq!(s.languages, vec!["java"]);
        assert_eq!(s.frameworks, vec!["spring"]);
        assert!(s.domains.is_empty());
    }

    #[test]
    fn test_legacy_skills_become_domains() {
        let s: Skills = serde_json::from_value(json!(["backend", "payments"])).unwrap();
        assert!(s.languages.is_empty());
        assert!(s.frameworks.is_empty());
        assert_eq!(s.domains, vec!["backend", "payments"]);
    }

    #[test]
    fn test_missing_optional_fields_order() {
        let bug = BugReport::new("B-1", "t", "d");
        assert_eq!(
            bug.missing_optional_fields(),
            vec!["steps_to_reproduce", "stack_trace", "logs", "code_context"]
        );
    }

    #[test]
    fn test_missing_snippet_reported() {
        let mut bug = BugReport::new("B-1", "t", "d");
        bug.stack_trace = Some("trace".into());
        bug.logs = Some("log".into());
        bug.steps_to_reproduce = Some(vec!["click".into()]);
        bug.code_context = Some(CodeContext {
            file_path: "src/a.py".into(),
            line_start: None,
            line_end: None,
            snippet: None,
        });
        assert_eq!(bug.missing_optional_fields(), vec!["code_context.snippet"]);
    }

    #[test]
    fn test_production_case_insensitive() {
        let mut bug = BugReport::new("B-1", "t", "d");
        bug.metadata = Some(Metadata {
            environment: Some("Production".into()),
            ..Default::default()
        });
        assert!(bug.is_production());
    }

    #[test]
    fn test_confidence_scores_mean_and_clamp() {
        let c = ConfidenceScores::from_stages(1.4, 0.5, 0.0);
        assert_eq!(c.classification_confidence, 1.0);
        assert!((c.overall_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_priority_level_serde() {
        let v = serde_json::to_value(PriorityLevel::Critical).unwrap();
        assert_eq!(v, json!("critical"));
        assert_eq!(PriorityLevel::parse(" HIGH "), Some(PriorityLevel::High));
        assert_eq!(PriorityLevel::parse("urgent"), None);
    }
}
