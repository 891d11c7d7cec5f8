//! Mock supervisor: posts a canned handshake request to a running server.
//!
//! Scenarios cover one bug each from a different corner of the classifier:
//! `backend` (null dereference in auth), `ui` (layout glitch), `security`
//! (SQL injection), and `performance` (pool exhaustion under load).

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

use bug_triage_core::handshake::{AGENT_NAME, SUPERVISOR, TASK_ASSIGNMENT};

pub const SCENARIOS: &[&str] = &["backend", "ui", "security", "performance"];

fn scenario_task(name: &str) -> Option<Value> {
    let task = match name {
        "backend" => json!({
            "bugs": [{
                "bug_id": "BUG-BE-101",
                "title": "NullPointerException on password reset",
                "description": "Reset endpoint throws NullPointerException when the token has expired.",
                "stack_trace": "java.lang.NullPointerException\n    at ResetService.verify(ResetService.java:77)",
                "code_context": {
                    "file_path": "src/auth/ResetService.java",
                    "line_start": 60,
                    "line_end": 90,
                    "snippet": "Token t = tokens.find(id);\nreturn t.getOwner();"
                },
                "metadata": {"environment": "production", "tags": ["auth"]}
            }],
            "team_profiles": [{
                "member_id": "dev-auth",
                "name": "Farah Okafor",
                "skills": {"languages": ["java", "kotlin"], "frameworks": ["spring"], "domains": ["backend", "auth"]},
                "modules_owned": ["auth"],
                "current_load": 2
            }]
        }),
        "ui" => json!({
            "bugs": [{
                "bug_id": "BUG-UI-202",
                "title": "Sidebar overlaps content on narrow screens",
                "description": "The sidebar renders on top of the report table below 900px width.",
                "code_context": {
                    "file_path": "web/src/components/Sidebar.tsx",
                    "snippet": "<aside className=\"sidebar fixed\">{children}</aside>"
                },
                "metadata": {"environment": "staging", "tags": ["ui", "css"]}
            }],
            "team_profiles": [{
                "member_id": "dev-web",
                "name": "Tomas Lind",
                "skills": {"languages": ["typescript", "javascript"], "frameworks": ["react"], "domains": ["frontend"]},
                "modules_owned": ["web"],
                "current_load": 1
            }]
        }),
        "security" => json!({
            "bugs": [{
                "bug_id": "BUG-SEC-303",
                "title": "SQL injection in report filter",
                "description": "The filter parameter is concatenated into the query string.",
                "steps_to_reproduce": ["Open reports", "Filter by ' OR '1'='1", "Every tenant's rows are returned"],
                "code_context": {
                    "file_path": "services/reports/filters.py",
                    "snippet": "sql = \"SELECT * FROM reports WHERE name = '\" + name + \"'\""
                },
                "metadata": {"environment": "production", "tags": ["security"]}
            }],
            "team_profiles": [{
                "member_id": "dev-sec",
                "name": "Ada Moreau",
                "skills": {"languages": ["python", "go"], "domains": ["security", "backend"]},
                "modules_owned": ["reports"],
                "current_load": 3
            }]
        }),
        "performance" => json!({
            "bugs": [{
                "bug_id": "BUG-PERF-404",
                "title": "Checkout latency spikes under load",
                "description": "p99 latency climbs to 3s when traffic doubles; requests time out waiting on the pool.",
                "logs": "WARN timeout acquiring connection after 2000ms",
                "code_context": {
                    "file_path": "src/api/checkout.ts",
                    "snippet": "for (const item of cart) { await db.query(q, [item.id]); }"
                },
                "metadata": {"environment": "production", "tags": ["performance"]}
            }],
            "team_profiles": [{
                "member_id": "dev-perf",
                "name": "Kenji Sato",
                "skills": {"languages": ["typescript", "rust"], "domains": ["performance"]},
                "modules_owned": ["api"],
                "current_load": 4
            }]
        }),
        _ => return None,
    };
    Some(task)
}

/// Builds the full handshake request for `scenario`.
pub fn scenario_payload(scenario: &str) -> Result<Value> {
    let Some(task) = scenario_task(scenario) else {
        bail!(
            "Unknown scenario '{}'. Expected one of: {}",
            scenario,
            SCENARIOS.join(", ")
        );
    };
    Ok(json!({
        "message_id": uuid::Uuid::new_v4().to_string(),
        "sender": SUPERVISOR,
        "recipient": AGENT_NAME,
        "type": TASK_ASSIGNMENT,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "task": task,
    }))
}

/// Posts `scenario` to `{url}/execute` and prints the response.
pub async fn run_supervisor(
    url: &str,
    scenario: &str,
    timeout_secs: u64,
    save_to: Option<&Path>,
) -> Result<()> {
    let payload = scenario_payload(scenario)?;
    let endpoint = format!("{}/execute", url.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    let response = client
        .post(&endpoint)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", endpoint))?
        .error_for_status()?;
    let body: Value = response.json().await.context("Response was not JSON")?;

    let pretty = serde_json::to_string_pretty(&body)?;
    println!("{}", pretty);

    if let Some(path) = save_to {
        std::fs::write(path, &pretty)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Saved response to {}", path.display());
    }
    Ok(())
}
