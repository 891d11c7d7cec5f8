//! Request validation.
//!
//! Runs before any engine. Checks the envelope, then every bug and team
//! profile, then the language/file-type pairing of each bug. The first
//! problem found is reported.

use serde_json::Value;
use thiserror::Error;

use crate::handshake::{HandshakeMessage, AGENT_NAME, SUPERVISOR, TASK_ASSIGNMENT, TASK_RESPONSE};
use crate::paths;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("request must be a JSON object")]
    NotAnObject,
    #[error("{0} is required")]
    MissingEnvelopeField(&'static str),
    #[error("sender must be 'supervisor' for task assignments, got '{0}'")]
    InvalidSender(String),
    #[error("recipient must be 'bug_triage_agent', got '{0}'")]
    InvalidRecipient(String),
    #[error("type must be 'task_assignment' or 'task_response', got '{0}'")]
    InvalidType(String),
    #[error("Task data is required")]
    MissingTask,
    #[error("bugs array cannot be empty")]
    EmptyBugs,
    #[error("team_profiles array cannot be empty")]
    EmptyTeamProfiles,
    #[error("{field} is required for bug at index {index}")]
    MissingBugField { index: usize, field: &'static str },
    #[error("code_context.file_path is required if code_context is provided (bug {bug_id})")]
    MissingFilePath { bug_id: String },
    #[error("{field} is required for all team profiles")]
    MissingProfileField { field: &'static str },
    #[error("Language '{language}' and file_type '{file_type}' are inconsistent for bug {bug_id}")]
    InconsistentLanguage {
        bug_id: String,
        language: String,
        file_type: String,
    },
    #[error("{0}")]
    Malformed(String),
}

/// Validates a raw request and parses it into a [`HandshakeMessage`].
///
/// On success the message is guaranteed to carry a task with at least one
/// bug and one profile.
pub fn validate_request(raw: &Value) -> Result<HandshakeMessage, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    for field in ["message_id", "timestamp"] {
        if non_empty_str(obj.get(field)).is_none() {
            return Err(ValidationError::MissingEnvelopeField(field));
        }
    }
    let sender = str_field(obj.get("sender"));
    if sender != SUPERVISOR {
        return Err(ValidationError::InvalidSender(sender.to_string()));
    }
    let recipient = str_field(obj.get("recipient"));
    if recipient != AGENT_NAME {
        return Err(ValidationError::InvalidRecipient(recipient.to_string()));
    }
    let message_type = str_field(obj.get("type"));
    if message_type != TASK_ASSIGNMENT && message_type != TASK_RESPONSE {
        return Err(ValidationError::InvalidType(message_type.to_string()));
    }

    let task = match obj.get("task") {
        Some(task) if !task.is_null() => task,
        _ => return Err(ValidationError::MissingTask),
    };
    let bugs = task
        .get("bugs")
        .and_then(Value::as_array)
        .filter(|b| !b.is_empty())
        .ok_or(ValidationError::EmptyBugs)?;
    let profiles = task
        .get("team_profiles")
        .and_then(Value::as_array)
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::EmptyTeamProfiles)?;

    for (index, bug) in bugs.iter().enumerate() {
        check_bug(index, bug)?;
    }
    for profile in profiles {
        for field in ["member_id", "name"] {
            if non_empty_str(profile.get(field)).is_none() {
                return Err(ValidationError::MissingProfileField { field });
            }
        }
    }

    let message: HandshakeMessage = serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::Malformed(e.to_string()))?;

    if let Some(task) = &message.task {
        for bug in &task.bugs {
            let resolved = paths::resolve(bug.file_path(), bug.language(), bug.file_type());
            let (Some(language), Some(file_type)) = (resolved.language, resolved.file_type) else {
                continue;
            };
            if !paths::is_consistent(Some(&language), Some(&file_type)) {
                return Err(ValidationError::InconsistentLanguage {
                    bug_id: bug.bug_id.clone(),
                    language,
                    file_type,
                });
            }
        }
    }

    Ok(message)
}

fn check_bug(index: usize, bug: &Value) -> Result<(), ValidationError> {
    for field in ["bug_id", "title", "description"] {
        if non_empty_str(bug.get(field)).is_none() {
            return Err(ValidationError::MissingBugField { index, field });
        }
    }
    if let Some(ctx) = bug.get("code_context").filter(|c| !c.is_null()) {
        if non_empty_str(ctx.get("file_path")).is_none() {
            return Err(ValidationError::MissingFilePath {
                bug_id: str_field(bug.get("bug_id")).to_string(),
            });
        }
    }
    Ok(())
}

fn str_field(v: Option<&Value>) -> &str {
    v.and_then(Value::as_str).unwrap_or("")
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(bugs: Value) -> Value {
        json!({
            "message_id": "msg-1",
            "sender": "supervisor",
            "recipient": "bug_triage_agent",
            "type": "task_assignment",
            "timestamp": "2024-05-01T12:00:00Z",
            "task": {
                "bugs": bugs,
                "team_profiles": [{"member_id": "dev-1", "name": "Alice", "skills": ["backend"]}]
            }
        })
    }

    #[test]
    fn test_valid_request_parses() {
        let msg = validate_request(&request(json!([
            {"bug_id": "B-1", "title": "Crash", "description": "Boom"}
        ])))
        .unwrap();
        let task = msg.task.unwrap();
        assert_eq!(task.bugs.len(), 1);
        assert_eq!(task.team_profiles[0].skills.as_ref().unwrap().domains, vec!["backend"]);
    }

    #[test]
    fn test_missing_title() {
        let err = validate_request(&request(json!([
            {"bug_id": "B-1", "description": "Boom"}
        ])))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingBugField {
                index: 0,
                field: "title"
            }
        );
        assert_eq!(err.to_string(), "title is required for bug at index 0");
    }

    #[test]
    fn test_empty_description_rejected() {
        let err = validate_request(&request(json!([
            {"bug_id": "B-1", "title": "Crash", "description": "  "}
        ])))
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingBugField { field: "description", .. }
        ));
    }

    #[test]
    fn test_wrong_sender() {
        let mut req = request(json!([{"bug_id": "B-1", "title": "t", "description": "d"}]));
        req["sender"] = json!("someone");
        assert_eq!(
            validate_request(&req).unwrap_err(),
            ValidationError::InvalidSender("someone".into())
        );
    }

    #[test]
    fn test_missing_task() {
        let mut req = request(json!([]));
        req.as_object_mut().unwrap().remove("task");
        assert_eq!(validate_request(&req).unwrap_err(), ValidationError::MissingTask);
        assert_eq!(ValidationError::MissingTask.to_string(), "Task data is required");
    }

    #[test]
    fn test_empty_bugs() {
        assert_eq!(
            validate_request(&request(json!([]))).unwrap_err(),
            ValidationError::EmptyBugs
        );
    }

    #[test]
    fn test_inconsistent_language() {
        let err = validate_request(&request(json!([{
            "bug_id": "B-1", "title": "t", "description": "d",
            "language": "python",
            "code_context": {"file_path": "src/App.java"}
        }])))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Language 'python' and file_type '.java' are inconsistent for bug B-1"
        );
    }

    #[test]
    fn test_unknown_extension_is_consistent() {
        assert!(validate_request(&request(json!([{
            "bug_id": "B-1", "title": "t", "description": "d",
            "language": "javascript",
            "code_context": {"file_path": "web/Filter.vue"}
        }])))
        .is_ok());
    }

    #[test]
    fn test_code_context_needs_file_path() {
        let err = validate_request(&request(json!([{
            "bug_id": "B-1", "title": "t", "description": "d",
            "code_context": {"snippet": "x = 1"}
        }])))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingFilePath {
                bug_id: "B-1".into()
            }
        );
    }

    #[test]
    fn test_not_an_object() {
        assert_eq!(
            validate_request(&json!([1, 2])).unwrap_err(),
            ValidationError::NotAnObject
        );
    }
}
