//! Supervisor handshake envelope.
//!
//! Requests arrive as a [`HandshakeMessage`] carrying a batch of bugs and the
//! candidate team. Every request, successful or not, is answered with a
//! [`HandshakeResponse`] that references the original `message_id`.

use serde::{Deserialize, Serialize};

use crate::models::{BugReport, TeamProfile, TriageResult};

/// Identifier this service uses as sender and expects as recipient.
pub const AGENT_NAME: &str = "bug_triage_agent";
/// The only accepted sender.
pub const SUPERVISOR: &str = "supervisor";

pub const TASK_ASSIGNMENT: &str = "task_assignment";
pub const TASK_RESPONSE: &str = "task_response";

/// Batch of bugs and the team they may be assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub bugs: Vec<BugReport>,
    pub team_profiles: Vec<TeamProfile>,
}

/// Inbound envelope from the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub message_id: String,
    pub sender: String,
    pub recipient: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub related_message_id: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub task: Option<TaskAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Completed,
    Failed,
    InProgress,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageResults {
    pub triage: Vec<TriageResult>,
}

/// Outbound envelope returned to the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub message_id: String,
    pub sender: String,
    pub recipient: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub related_message_id: Option<String>,
    pub status: ResponseStatus,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<TriageResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandshakeResponse {
    fn envelope(related_message_id: &str, status: ResponseStatus) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            sender: AGENT_NAME.to_string(),
            recipient: SUPERVISOR.to_string(),
            message_type: TASK_RESPONSE.to_string(),
            related_message_id: Some(related_message_id.to_string()),
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            results: None,
            warnings: None,
            error: None,
        }
    }

    /// A `completed` response; `warnings` is omitted when empty.
    pub fn completed(
        related_message_id: &str,
        triage: Vec<TriageResult>,
        warnings: Vec<String>,
    ) -> Self {
        let mut resp = Self::envelope(related_message_id, ResponseStatus::Completed);
        resp.results = Some(TriageResults { triage });
        if !warnings.is_empty() {
            resp.warnings = Some(warnings);
        }
        resp
    }

    /// A `failed` response carrying no results.
    pub fn failed(related_message_id: &str, error: impl Into<String>) -> Self {
        let mut resp = Self::envelope(related_message_id, ResponseStatus::Failed);
        resp.error = Some(error.into());
        resp
    }

    /// Triage results, empty for failed responses.
    pub fn triage(&self) -> &[TriageResult] {
        self.results
            .as_ref()
            .map(|r| r.triage.as_slice())
            .unwrap_or(&[])
    }
}
