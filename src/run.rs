//! `triage run <file>`: one-shot triage of a handshake request on disk.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use bug_triage_core::{ResponseStatus, TriageService};

use crate::config::Config;
use crate::sqlite_store;

/// Processes the request in `path` and prints the response as JSON.
///
/// The response is printed even when triage fails; the command then exits
/// with an error carrying the response's message.
pub async fn run_file(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    let request: Value = serde_json::from_str(&content)
        .with_context(|| format!("Request file is not valid JSON: {}", path.display()))?;

    let store = sqlite_store::open(config).await?;
    let service = TriageService::new(store)?;
    let response = service.process(&request).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.status == ResponseStatus::Failed {
        bail!(
            "triage failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
