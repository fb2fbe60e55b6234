use std::fmt;

use serde_json::Value;

pub const UNKNOWN_FAILURE: &str = "unknown error";

/// Provider task status, parsed case-insensitively.
///
/// Only `Succeeded` and `Failed` are terminal. Statuses the provider may add
/// later land in `Unknown` and keep the poller waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "SUCCEED" | "SUCCEEDED" | "SUCCESS" => Self::Succeeded,
            "FAILED" | "FAILURE" => Self::Failed,
            "PENDING" | "QUEUED" | "SUBMITTED" => Self::Pending,
            "RUNNING" | "PROCESSING" => Self::Running,
            _ => Self::Unknown(normalized),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Succeeded | Self::Failed => true,
            Self::Pending | Self::Running | Self::Unknown(_) => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Running => f.write_str("RUNNING"),
            Self::Succeeded => f.write_str("SUCCEEDED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Unknown(raw) if raw.is_empty() => f.write_str("<empty>"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// One status read of a provider task.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    /// Upper-cased status string as sent by the provider (may be empty).
    pub raw_status: String,
    pub payload: Value,
}

impl TaskSnapshot {
    pub fn from_payload(id: &str, payload: Value) -> Self {
        let raw_status = ["task_status", "status"]
            .iter()
            .filter_map(|key| payload.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or_default()
            .to_ascii_uppercase();
        Self {
            id: id.to_string(),
            status: TaskStatus::parse(&raw_status),
            raw_status,
            payload,
        }
    }

    /// First entry of `output_images`, when it is a non-blank string.
    pub fn first_output_image(&self) -> Option<&str> {
        self.payload
            .get("output_images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn has_output_images(&self) -> bool {
        self.payload
            .get("output_images")
            .and_then(Value::as_array)
            .map(|images| !images.is_empty())
            .unwrap_or(false)
    }

    pub fn failure_message(&self) -> String {
        failure_message(&self.payload)
    }
}

/// Reads `task_id`, then `id`; numeric ids are rendered as strings.
pub fn task_id_from(payload: &Value) -> Option<String> {
    ["task_id", "id"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::String(id) => Some(id.trim().to_string()).filter(|id| !id.is_empty()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

/// Provider failure text from `message`, `error` or `output`.
pub fn failure_message(payload: &Value) -> String {
    ["message", "error", "output"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
            Value::Array(items) if items.is_empty() => None,
            Value::Object(obj) if obj.is_empty() => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| UNKNOWN_FAILURE.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{failure_message, task_id_from, TaskSnapshot, TaskStatus, UNKNOWN_FAILURE};

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(TaskStatus::parse("succeed"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::parse("SUCCEED"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::parse("Failed"), TaskStatus::Failed);
        assert_eq!(TaskStatus::parse("running"), TaskStatus::Running);
        assert_eq!(TaskStatus::parse("PENDING"), TaskStatus::Pending);
        assert_eq!(
            TaskStatus::parse("throttled"),
            TaskStatus::Unknown("THROTTLED".to_string())
        );
        assert_eq!(TaskStatus::parse(""), TaskStatus::Unknown(String::new()));
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(!TaskStatus::Unknown("CANCELED".to_string()).is_terminal());
    }

    #[test]
    fn snapshot_prefers_task_status_over_status() {
        let snapshot = TaskSnapshot::from_payload(
            "abc",
            json!({"task_status": "succeed", "status": "RUNNING"}),
        );
        assert_eq!(snapshot.raw_status, "SUCCEED");
        assert_eq!(snapshot.status, TaskStatus::Succeeded);

        let snapshot = TaskSnapshot::from_payload("abc", json!({"status": "processing"}));
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert_eq!(snapshot.raw_status, "PROCESSING");
    }

    #[test]
    fn snapshot_reads_first_output_image() {
        let snapshot = TaskSnapshot::from_payload(
            "abc",
            json!({"output_images": [" http://x/img.png ", "http://x/other.png"]}),
        );
        assert_eq!(snapshot.first_output_image(), Some("http://x/img.png"));

        let snapshot = TaskSnapshot::from_payload("abc", json!({"output_images": [42]}));
        assert!(snapshot.has_output_images());
        assert_eq!(snapshot.first_output_image(), None);

        let snapshot = TaskSnapshot::from_payload("abc", json!({"output_images": []}));
        assert!(!snapshot.has_output_images());
    }

    #[test]
    fn task_id_accepts_task_id_then_id() {
        assert_eq!(task_id_from(&json!({"task_id": "abc"})).as_deref(), Some("abc"));
        assert_eq!(task_id_from(&json!({"task_id": "", "id": "xyz"})).as_deref(), Some("xyz"));
        assert_eq!(task_id_from(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(task_id_from(&json!({"request_id": "abc"})), None);
    }

    #[test]
    fn failure_message_reads_fields_in_order() {
        assert_eq!(
            failure_message(&json!({"message": "nsfw content", "error": "other"})),
            "nsfw content"
        );
        assert_eq!(failure_message(&json!({"message": "", "error": "quota"})), "quota");
        assert_eq!(
            failure_message(&json!({"output": {"code": "E1"}})),
            r#"{"code":"E1"}"#
        );
        assert_eq!(failure_message(&json!({})), UNKNOWN_FAILURE);
    }
}
