//! Remediation approach and effort estimate.

use crate::classify::ClassificationResult;
use crate::models::{BugReport, Category, SuggestedFix};

/// A canned approach for a category, optionally narrowed by type.
struct Approach {
    category: Category,
    /// Lower-case needle the type must contain; empty matches any type.
    type_needle: &'static str,
    steps: &'static [&'static str],
    /// Extra step appended when the bug carries code context.
    with_context: Option<&'static str>,
}

/// First row matching the category and type is used.
const APPROACHES: &[Approach] = &[
    Approach {
        category: Category::RuntimeError,
        type_needle: "null",
        steps: &["Add null check before accessing object properties or methods"],
        with_context: Some("Ensure object is properly initialized before use"),
    },
    Approach {
        category: Category::RuntimeError,
        type_needle: "index",
        steps: &[
            "Add bounds checking before accessing array or list indices",
            "Validate array/list size before iteration",
        ],
        with_context: None,
    },
    Approach {
        category: Category::Security,
        type_needle: "sql injection",
        steps: &[
            "Use parameterized queries or prepared statements",
            "Sanitize and validate all user inputs",
        ],
        with_context: None,
    },
    Approach {
        category: Category::Security,
        type_needle: "xss",
        steps: &[
            "Escape user input before rendering in HTML",
            "Use Content Security Policy (CSP) headers",
        ],
        with_context: None,
    },
    Approach {
        category: Category::Security,
        type_needle: "authentication",
        steps: &[
            "Verify authentication credentials properly",
            "Implement proper session management",
        ],
        with_context: None,
    },
    Approach {
        category: Category::Performance,
        type_needle: "timeout",
        steps: &[
            "Optimize slow database queries",
            "Add caching for frequently accessed data",
            "Consider increasing timeout values if appropriate",
        ],
        with_context: None,
    },
    Approach {
        category: Category::Performance,
        type_needle: "memory leak",
        steps: &[
            "Ensure proper resource cleanup (close files, connections)",
            "Review object lifecycle and memory management",
        ],
        with_context: None,
    },
    Approach {
        category: Category::LogicError,
        type_needle: "",
        steps: &[
            "Review business logic and algorithm implementation",
            "Add unit tests to verify correct behavior",
        ],
        with_context: Some("Trace through code execution path to identify incorrect logic"),
    },
    Approach {
        category: Category::ConfigurationError,
        type_needle: "",
        steps: &[
            "Verify all required configuration values are set",
            "Check environment variables and configuration files",
            "Validate configuration values on application startup",
        ],
        with_context: None,
    },
];

/// Root-cause phrases that add a follow-up step.
const ROOT_CAUSE_FOLLOWUPS: &[(&str, &str)] = &[
    ("null check", "Implement defensive programming with null checks"),
    ("exception handling", "Add try-catch blocks for error handling"),
];

/// Effort bands: (category, type needles, band). First match wins.
const EFFORT: &[(Category, &[&str], &str)] = &[
    (Category::RuntimeError, &["nullpointer", "index"], "1-2 hours"),
    (Category::RuntimeError, &[], "2-4 hours"),
    (Category::Security, &["sql injection"], "4-8 hours"),
    (Category::Security, &["xss"], "2-4 hours"),
    (Category::Security, &[], "3-6 hours"),
    (Category::Performance, &["memory leak"], "4-8 hours"),
    (Category::Performance, &["timeout"], "2-6 hours"),
    (Category::Performance, &[], "3-6 hours"),
    (Category::LogicError, &[], "2-6 hours"),
    (Category::ConfigurationError, &[], "30 minutes - 2 hours"),
    (Category::UxUiIssue, &[], "1-4 hours"),
];

pub fn suggest(bug: &BugReport, classification: &ClassificationResult) -> SuggestedFix {
    SuggestedFix {
        approach: approach(bug, classification),
        estimated_effort: effort(bug, classification),
    }
}

fn approach(bug: &BugReport, classification: &ClassificationResult) -> String {
    let bug_type = classification.bug_type.to_lowercase();
    let mut steps: Vec<&str> = Vec::new();

    if let Some(row) = APPROACHES.iter().find(|a| {
        a.category == classification.category
            && (a.type_needle.is_empty() || bug_type.contains(a.type_needle))
    }) {
        steps.extend_from_slice(row.steps);
        if bug.code_context.is_some() {
            steps.extend(row.with_context);
        }
    }

    let root_cause = classification.root_cause.to_lowercase();
    steps.extend(
        ROOT_CAUSE_FOLLOWUPS
            .iter()
            .filter(|(phrase, _)| root_cause.contains(phrase))
            .map(|(_, step)| *step),
    );

    if steps.is_empty() {
        return format!(
            "Review and fix the {} issue. Test the fix thoroughly before deployment.",
            classification.category.as_str().to_lowercase()
        );
    }
    format!("{}.", steps.join(". "))
}

fn effort(bug: &BugReport, classification: &ClassificationResult) -> String {
    let bug_type = classification.bug_type.to_lowercase();
    EFFORT
        .iter()
        .find(|(category, needles, _)| {
            *category == classification.category
                && (needles.is_empty() || needles.iter().any(|n| bug_type.contains(n)))
        })
        .map(|(_, _, band)| band.to_string())
        .unwrap_or_else(|| {
            if bug.code_context.is_some() {
                "2-4 hours".to_string()
            } else {
                "1-3 hours".to_string()
            }
        })
}
