use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::ApiError;
use crate::item::Item;
use crate::request::Tool;
use crate::request::ToolChoice;
use crate::request::Truncation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Incomplete,
    Failed,
    Cancelled,
    RequiresAction,
}

impl ResponseStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseStatus::Queued | ResponseStatus::InProgress)
    }

    /// `queued -> in_progress -> {completed, incomplete, failed, cancelled,
    /// requires_action}`. `requires_action` is terminal (Open Question 1).
    pub fn can_transition_to(self, next: ResponseStatus) -> bool {
        use ResponseStatus::*;
        matches!(
            (self, next),
            (Queued, InProgress)
                | (
                    InProgress,
                    Completed | Incomplete | Failed | Cancelled | RequiresAction
                )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_output_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteDetails {
    pub reason: String,
}

/// A `Response` as it exists in the store and as returned to a client. Echoes
/// ~25 of the originating request's parameters so a client can read the full
/// effective configuration back off the object without re-sending it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default = "object_tag")]
    pub object: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub output: Vec<Item>,
    pub model: String,
    pub created_at: i64,
    pub usage: Option<Usage>,
    pub error: Option<ApiError>,
    pub previous_response_id: Option<String>,
    pub incomplete_details: Option<IncompleteDetails>,

    // Echoed request parameters.
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub store: bool,
    pub truncation: Truncation,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub parallel_tool_calls: bool,
}

fn object_tag() -> String {
    "response".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_reject_backwards_moves() {
        assert!(ResponseStatus::Queued.can_transition_to(ResponseStatus::InProgress));
        assert!(ResponseStatus::InProgress.can_transition_to(ResponseStatus::Completed));
        assert!(ResponseStatus::InProgress.can_transition_to(ResponseStatus::RequiresAction));
        assert!(!ResponseStatus::Completed.can_transition_to(ResponseStatus::InProgress));
        assert!(!ResponseStatus::RequiresAction.can_transition_to(ResponseStatus::Completed));
        assert!(!ResponseStatus::Queued.can_transition_to(ResponseStatus::Completed));
    }

    #[test]
    fn terminal_states() {
        assert!(ResponseStatus::Completed.is_terminal());
        assert!(ResponseStatus::RequiresAction.is_terminal());
        assert!(!ResponseStatus::Queued.is_terminal());
        assert!(!ResponseStatus::InProgress.is_terminal());
    }
}
