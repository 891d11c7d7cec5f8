//! Bug classification: category, type, root cause, and confidence.
//!
//! Categories are scored by counting case-insensitive pattern hits over the
//! report text. All pattern tables are ordered; earlier entries win ties.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::models::{BugReport, Category};

/// Category patterns in tie-break order.
const CATEGORY_PATTERNS: &[(Category, &[&str])] = &[
    (
        Category::RuntimeError,
        &[
            r"NullPointerException",
            r"IndexOutOfBoundsException",
            r"ArrayIndexOutOfBounds",
            r"TypeError",
            r"AttributeError",
            r"KeyError",
            r"ValueError",
            r"RuntimeException",
            r"undefined is not",
            r"Cannot read property",
            r"is not defined",
        ],
    ),
    (
        Category::Security,
        &[
            r"SQL.*injection",
            r"XSS",
            r"cross.?site.*scripting",
            r"authentication.*failed",
            r"unauthorized",
            r"forbidden",
            r"CSRF",
            r"security.*vulnerability",
            r"insecure",
            r"vulnerability",
        ],
    ),
    (
        Category::Performance,
        &[
            r"timeout",
            r"slow",
            r"performance",
            r"memory.*leak",
            r"out of memory",
            r"OOM",
            r"CPU.*high",
            r"response.*time",
            r"latency",
        ],
    ),
    (
        Category::LogicError,
        &[
            r"logic.*error",
            r"incorrect.*calculation",
            r"wrong.*result",
            r"unexpected.*behavior",
            r"does not work",
            r"not.*working",
            r"broken",
        ],
    ),
    (
        Category::ConfigurationError,
        &[
            r"configuration.*error",
            r"config.*missing",
            r"environment.*variable",
            r"setting.*not.*found",
            r"invalid.*config",
        ],
    ),
    (
        Category::UxUiIssue,
        &[
            r"UI.*issue",
            r"user.*interface",
            r"display.*wrong",
            r"layout.*broken",
            r"styling",
            r"CSS",
            r"rendering",
        ],
    ),
];

/// Named type patterns, scored when no category override applies.
const TYPE_PATTERNS: &[(&str, &[&str])] = &[
    (
        "NullPointerException",
        &[r"NullPointerException", r"null.*pointer", r"NoneType"],
    ),
    ("SQL Injection", &[r"SQL.*injection", r"SQLi"]),
    (
        "Index Out of Bounds",
        &[r"IndexOutOfBounds", r"array.*index", r"list.*index"],
    ),
    ("Type Error", &[r"TypeError", r"type.*error", r"cannot.*convert"]),
    (
        "Authentication Error",
        &[r"authentication.*failed", r"unauthorized", r"login.*failed"],
    ),
    ("Timeout", &[r"timeout", r"request.*timed.*out"]),
    ("Memory Leak", &[r"memory.*leak", r"out.*of.*memory", r"OOM"]),
];

/// Something in the text that looks like a stack frame or trace header.
const TRACE_MARKER: &str = r#"stack_trace|traceback|exception in thread|\bat\s+[\w$.]+\([^)]*\)|\w+\.\w+:\d+|file "[^"]+", line \d+"#;

/// A category-specific type that takes precedence over pattern scoring.
struct TypeOverride {
    category: Category,
    needs_trace: bool,
    /// Alternatives; each inner slice is a conjunction of lower-case needles.
    any_of: &'static [&'static [&'static str]],
    bug_type: &'static str,
}

const TYPE_OVERRIDES: &[TypeOverride] = &[
    TypeOverride {
        category: Category::RuntimeError,
        needs_trace: true,
        any_of: &[&["nullpointerexception"], &["null pointer"]],
        bug_type: "NullPointerException",
    },
    TypeOverride {
        category: Category::RuntimeError,
        needs_trace: true,
        any_of: &[&["indexoutofbounds"]],
        bug_type: "Index Out of Bounds",
    },
    TypeOverride {
        category: Category::RuntimeError,
        needs_trace: true,
        any_of: &[&["typeerror"]],
        bug_type: "Type Error",
    },
    TypeOverride {
        category: Category::Security,
        needs_trace: false,
        any_of: &[&["sql", "injection"]],
        bug_type: "SQL Injection",
    },
    TypeOverride {
        category: Category::Security,
        needs_trace: false,
        any_of: &[&["xss"], &["cross-site"]],
        bug_type: "XSS",
    },
    TypeOverride {
        category: Category::Security,
        needs_trace: false,
        any_of: &[&["authentication"], &["unauthorized"]],
        bug_type: "Authentication Error",
    },
    TypeOverride {
        category: Category::Performance,
        needs_trace: false,
        any_of: &[&["timeout"]],
        bug_type: "Timeout",
    },
    TypeOverride {
        category: Category::Performance,
        needs_trace: false,
        any_of: &[&["memory", "leak"]],
        bug_type: "Memory Leak",
    },
];

/// Canned root causes keyed by (category, type). The first element is used
/// when a snippet is present, the second otherwise.
const ROOT_CAUSES: &[(Category, &str, &str, &str)] = &[
    (
        Category::RuntimeError,
        "NullPointerException",
        "Missing null check before accessing object property or method",
        "Object is null when accessed",
    ),
    (
        Category::RuntimeError,
        "Index Out of Bounds",
        "Array or list index exceeds bounds",
        "Array or list index exceeds bounds",
    ),
    (
        Category::Security,
        "SQL Injection",
        "User input not properly sanitized before database query",
        "User input not properly sanitized before database query",
    ),
    (
        Category::Security,
        "Authentication Error",
        "Authentication credentials invalid or session expired",
        "Authentication credentials invalid or session expired",
    ),
    (
        Category::Performance,
        "Timeout",
        "Operation taking longer than expected timeout period",
        "Operation taking longer than expected timeout period",
    ),
    (
        Category::Performance,
        "Memory Leak",
        "Memory not properly released, causing gradual memory consumption",
        "Memory not properly released, causing gradual memory consumption",
    ),
];

const SECURITY_PATH_HINTS: &[&str] = &["auth", "security", "login", "password"];
const LOOP_HINTS: &[&str] = &["loop", "recursion", "while", "for"];

/// Classifier output for a single bug.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub category: Category,
    pub bug_type: String,
    pub root_cause: String,
    pub confidence: f64,
}

struct CompiledCategory {
    category: Category,
    patterns: Vec<Regex>,
}

struct CompiledType {
    name: &'static str,
    patterns: Vec<Regex>,
}

/// Compiled pattern tables. Build once and share across requests.
pub struct Classifier {
    categories: Vec<CompiledCategory>,
    types: Vec<CompiledType>,
    trace_marker: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid classifier pattern: {}", pattern))
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

fn hits(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

impl Classifier {
    pub fn new() -> Result<Self> {
        let categories = CATEGORY_PATTERNS
            .iter()
            .map(|(category, patterns)| {
                Ok(CompiledCategory {
                    category: *category,
                    patterns: compile_all(patterns)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let types = TYPE_PATTERNS
            .iter()
            .map(|(name, patterns)| {
                Ok(CompiledType {
                    name: *name,
                    patterns: compile_all(patterns)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            categories,
            types,
            trace_marker: compile(TRACE_MARKER)?,
        })
    }

    /// Classifies a bug. Never fails; sparse reports get lower confidence.
    pub fn classify(&self, bug: &BugReport) -> ClassificationResult {
        let corpus = corpus(bug);
        let category = self.category(bug, &corpus);
        let bug_type = self.bug_type(category, &corpus);
        let root_cause = root_cause(bug, category, &bug_type);
        ClassificationResult {
            category,
            bug_type,
            root_cause,
            confidence: confidence(bug),
        }
    }

    fn category(&self, bug: &BugReport, corpus: &str) -> Category {
        let path = bug.file_path().map(str::to_lowercase).unwrap_or_default();
        let snippet = bug.snippet().map(str::to_lowercase).unwrap_or_default();

        let mut best = Category::LogicError;
        let mut best_score = 0.0_f64;
        for compiled in &self.categories {
            let mut score = hits(&compiled.patterns, corpus) as f64;
            match compiled.category {
                Category::Security if SECURITY_PATH_HINTS.iter().any(|h| path.contains(h)) => {
                    score += 1.0
                }
                Category::Performance if LOOP_HINTS.iter().any(|h| snippet.contains(h)) => {
                    score += 0.5
                }
                _ => {}
            }
            if score > best_score {
                best = compiled.category;
                best_score = score;
            }
        }
        best
    }

    fn bug_type(&self, category: Category, corpus: &str) -> String {
        let has_trace = self.trace_marker.is_match(corpus);
        let overridden = TYPE_OVERRIDES
            .iter()
            .filter(|o| o.category == category && (!o.needs_trace || has_trace))
            .find(|o| {
                o.any_of
                    .iter()
                    .any(|all| all.iter().all(|needle| corpus.contains(needle)))
            });
        if let Some(o) = overridden {
            return o.bug_type.to_string();
        }

        let mut best: Option<&str> = None;
        let mut best_score = 0;
        for t in &self.types {
            let score = hits(&t.patterns, corpus);
            if score > best_score {
                best = Some(t.name);
                best_score = score;
            }
        }
        match best {
            Some(name) => name.to_string(),
            None => format!("{} Issue", category),
        }
    }
}

/// Lower-cased title, description, stack trace, and logs joined by spaces.
fn corpus(bug: &BugReport) -> String {
    [
        Some(bug.title.as_str()),
        Some(bug.description.as_str()),
        bug.stack_trace(),
        bug.logs(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

fn root_cause(bug: &BugReport, category: Category, bug_type: &str) -> String {
    let snippet = bug.snippet().map(str::to_lowercase);

    if let Some((_, _, with_snippet, without)) = ROOT_CAUSES
        .iter()
        .find(|(c, t, _, _)| *c == category && *t == bug_type)
    {
        let cause = if snippet.is_some() { with_snippet } else { without };
        return cause.to_string();
    }

    if let Some(snippet) = snippet.as_deref() {
        if snippet.contains("null") && !snippet.contains("check") {
            return "Missing null check in code".to_string();
        }
        let trace_mentions_exception = bug
            .stack_trace()
            .is_some_and(|t| t.to_lowercase().contains("exception"));
        if trace_mentions_exception && !snippet.contains("try") {
            return "Missing exception handling".to_string();
        }
    }

    format!(
        "Issue in {} category, type: {}",
        category.as_str().to_lowercase(),
        bug_type
    )
}

fn confidence(bug: &BugReport) -> f64 {
    let mut c = 0.5;
    if bug.stack_trace().is_some() {
        c += 0.2;
    }
    if bug.snippet().is_some() {
        c += 0.15;
    }
    if bug.description.chars().count() > 100 {
        c += 0.1;
    }
    if bug.logs().is_some() {
        c += 0.05;
    }
    f64::min(c, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CodeContext;

    fn classifier() -> Classifier {
        Classifier::new().unwrap()
    }

    fn with_context(mut bug: BugReport, path: &str, snippet: Option<&str>) -> BugReport {
        bug.code_context = Some(CodeContext {
            file_path: path.into(),
            line_start: Some(10),
            line_end: Some(12),
            snippet: snippet.map(str::to_string),
        });
        bug
    }

    #[test]
    fn test_npe_with_trace_and_snippet() {
        let mut bug = BugReport::new(
            "BUG-1",
            "NullPointerException in AuthService",
            "Login crashes when the session user is missing",
        );
        bug.stack_trace = Some(
            "java.lang.NullPointerException\n    at com.acme.AuthService.login(AuthService.java:42)"
                .into(),
        );
        let bug = with_context(bug, "src/auth/AuthService.java", Some("user.getName();"));

        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::RuntimeError);
        assert_eq!(result.bug_type, "NullPointerException");
        assert_eq!(
            result.root_cause,
            "Missing null check before accessing object property or method"
        );
        assert!((result.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report_defaults_to_logic_error() {
        let bug = BugReport::new("BUG-2", "Something", "Happens sometimes");
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::LogicError);
        assert_eq!(result.bug_type, "Logic Error Issue");
        assert_eq!(
            result.root_cause,
            "Issue in logic error category, type: Logic Error Issue"
        );
        assert!((result.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sql_injection_override() {
        let bug = BugReport::new(
            "BUG-3",
            "SQL injection in search endpoint",
            "The search box allows SQL injection via the q parameter",
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.bug_type, "SQL Injection");
        assert_eq!(
            result.root_cause,
            "User input not properly sanitized before database query"
        );
    }

    #[test]
    fn test_security_path_bonus_breaks_zero_scores() {
        let bug = with_context(
            BugReport::new("BUG-4", "Weird thing", "Happens on submit"),
            "src/login/form.ts",
            None,
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Security);
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // One Performance hit ("slow") and one Logic Error hit ("broken").
        let bug = BugReport::new("BUG-5", "Page slow", "Export is broken");
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Performance);
    }

    #[test]
    fn test_runtime_override_requires_trace_marker() {
        let bug = BugReport::new(
            "BUG-6",
            "TypeError on checkout",
            "TypeError: cannot read total",
        );
        // No trace marker, so the type comes from pattern scoring.
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::RuntimeError);
        assert_eq!(result.bug_type, "Type Error");
    }

    #[test]
    fn test_timeout_type_and_root_cause() {
        let bug = BugReport::new(
            "BUG-7",
            "Report generation timeout",
            "The monthly report request hits a timeout after 30s",
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Performance);
        assert_eq!(result.bug_type, "Timeout");
        assert_eq!(
            result.root_cause,
            "Operation taking longer than expected timeout period"
        );
    }

    #[test]
    fn test_snippet_null_heuristic() {
        let bug = with_context(
            BugReport::new("BUG-8", "Totals wrong", "Wrong result on invoice totals"),
            "src/billing/total.py",
            Some("if item is null: return 0"),
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::LogicError);
        assert_eq!(result.root_cause, "Missing null check in code");
    }

    #[test]
    fn test_loop_snippet_tips_category_to_performance() {
        let plain = with_context(
            BugReport::new("BUG-10", "Weird thing", "Happens on submit"),
            "src/jobs/run.py",
            Some("x = 1"),
        );
        assert_eq!(classifier().classify(&plain).category, Category::LogicError);

        let looping = with_context(
            BugReport::new("BUG-10", "Weird thing", "Happens on submit"),
            "src/jobs/run.py",
            Some("for item in items: process(item)"),
        );
        assert_eq!(
            classifier().classify(&looping).category,
            Category::Performance
        );
    }

    #[test]
    fn test_missing_exception_handling_root_cause() {
        let mut bug = BugReport::new("BUG-11", "Worker stops", "Background worker halts");
        bug.stack_trace = Some("IllegalStateException at Worker.run(Worker.java:10)".into());
        let bug = with_context(bug, "src/worker/Worker.java", Some("state.advance();"));

        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::LogicError);
        assert_eq!(result.root_cause, "Missing exception handling");
    }

    #[test]
    fn test_xss_override() {
        let bug = BugReport::new(
            "BUG-12",
            "Stored XSS in comments",
            "Comment body executes injected script tags",
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.bug_type, "XSS");
        assert_eq!(result.root_cause, "Issue in security category, type: XSS");
    }

    #[test]
    fn test_authentication_override() {
        let bug = BugReport::new(
            "BUG-13",
            "Unauthorized for admins",
            "Admins get unauthorized responses from the reports API",
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Security);
        assert_eq!(result.bug_type, "Authentication Error");
        assert_eq!(
            result.root_cause,
            "Authentication credentials invalid or session expired"
        );
    }

    #[test]
    fn test_memory_leak_override() {
        let bug = BugReport::new(
            "BUG-14",
            "Memory leak in worker",
            "RSS grows until the pod restarts",
        );
        let result = classifier().classify(&bug);
        assert_eq!(result.category, Category::Performance);
        assert_eq!(result.bug_type, "Memory Leak");
        assert_eq!(
            result.root_cause,
            "Memory not properly released, causing gradual memory consumption"
        );
    }

    #[test]
    fn test_confidence_caps_at_one() {
        let mut bug = BugReport::new("BUG-9", "Crash", &"x".repeat(150));
        bug.stack_trace = Some("trace".into());
        bug.logs = Some("log".into());
        let bug = with_context(bug, "a.py", Some("x = 1"));
        let result = classifier().classify(&bug);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }
}
