use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::content::ContentPart;
use crate::content::LogProb;
use crate::item::Item;
use crate::response::Response;

/// One SSE event in a response's stream. `sequence_number` is assigned by
/// the synthesizer and is monotonically increasing within a single stream
/// (invariant P1); it is not meaningful across streams.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub sequence_number: u64,
    pub kind: StreamEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventKind {
    Created { response: Box<Response> },
    Queued { response: Box<Response> },
    InProgress { response: Box<Response> },
    Completed { response: Box<Response> },
    Failed { response: Box<Response> },
    Cancelled { response: Box<Response> },
    Incomplete { response: Box<Response> },
    RequiresAction { response: Box<Response> },

    OutputItemAdded { output_index: u32, item: Box<Item> },
    OutputItemDone { output_index: u32, item: Box<Item> },

    ContentPartAdded {
        item_id: String,
        output_index: u32,
        content_index: u32,
        part: ContentPart,
    },
    ContentPartDone {
        item_id: String,
        output_index: u32,
        content_index: u32,
        part: ContentPart,
    },

    OutputTextDelta {
        item_id: String,
        output_index: u32,
        content_index: u32,
        delta: String,
        logprobs: Vec<LogProb>,
    },
    OutputTextDone {
        item_id: String,
        output_index: u32,
        content_index: u32,
        text: String,
        logprobs: Vec<LogProb>,
    },

    FunctionCallArgumentsDelta {
        item_id: String,
        output_index: u32,
        delta: String,
    },
    FunctionCallArgumentsDone {
        item_id: String,
        output_index: u32,
        arguments: String,
    },

    ReasoningSummaryPartAdded {
        item_id: String,
        output_index: u32,
        content_index: u32,
        part: ContentPart,
    },
    ReasoningSummaryTextDelta {
        item_id: String,
        output_index: u32,
        content_index: u32,
        delta: String,
    },
    ReasoningSummaryTextDone {
        item_id: String,
        output_index: u32,
        content_index: u32,
        text: String,
    },
}

impl StreamEventKind {
    pub fn type_tag(&self) -> &'static str {
        use StreamEventKind::*;
        match self {
            Created { .. } => "response.created",
            Queued { .. } => "response.queued",
            InProgress { .. } => "response.in_progress",
            Completed { .. } => "response.completed",
            Failed { .. } => "response.failed",
            Cancelled { .. } => "response.cancelled",
            Incomplete { .. } => "response.incomplete",
            RequiresAction { .. } => "response.requires_action",
            OutputItemAdded { .. } => "response.output_item.added",
            OutputItemDone { .. } => "response.output_item.done",
            ContentPartAdded { .. } => "response.content_part.added",
            ContentPartDone { .. } => "response.content_part.done",
            OutputTextDelta { .. } => "response.output_text.delta",
            OutputTextDone { .. } => "response.output_text.done",
            FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            ReasoningSummaryPartAdded { .. } => "response.reasoning_summary_part.added",
            ReasoningSummaryTextDelta { .. } => "response.reasoning_summary_text.delta",
            ReasoningSummaryTextDone { .. } => "response.reasoning_summary_text.done",
        }
    }

    /// True for the eight lifecycle events that carry a full response
    /// snapshot rather than item/content-level deltas.
    pub fn is_lifecycle(&self) -> bool {
        use StreamEventKind::*;
        matches!(
            self,
            Created { .. }
                | Queued { .. }
                | InProgress { .. }
                | Completed { .. }
                | Failed { .. }
                | Cancelled { .. }
                | Incomplete { .. }
                | RequiresAction { .. }
        )
    }

    /// True once a terminal lifecycle event has been reached; the
    /// synthesizer uses this to know the stream is over and the `[DONE]`
    /// sentinel should follow.
    pub fn is_terminal(&self) -> bool {
        use StreamEventKind::*;
        matches!(
            self,
            Completed { .. }
                | Failed { .. }
                | Cancelled { .. }
                | Incomplete { .. }
                | RequiresAction { .. }
        )
    }
}

impl Serialize for StreamEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = Map::new();
        map.insert(
            "type".into(),
            Value::String(self.kind.type_tag().to_string()),
        );
        map.insert(
            "sequence_number".into(),
            Value::Number(self.sequence_number.into()),
        );

        macro_rules! put {
            ($key:expr, $val:expr) => {
                map.insert($key.into(), serde_json::to_value($val).map_err(S::Error::custom)?)
            };
        }
        use serde::ser::Error as S_Error;

        match &self.kind {
            StreamEventKind::Created { response }
            | StreamEventKind::Queued { response }
            | StreamEventKind::InProgress { response }
            | StreamEventKind::Completed { response }
            | StreamEventKind::Failed { response }
            | StreamEventKind::Cancelled { response }
            | StreamEventKind::Incomplete { response }
            | StreamEventKind::RequiresAction { response } => {
                put!("response", response.as_ref());
            }
            StreamEventKind::OutputItemAdded { output_index, item }
            | StreamEventKind::OutputItemDone { output_index, item } => {
                put!("output_index", output_index);
                put!("item", item.as_ref());
            }
            StreamEventKind::ContentPartAdded {
                item_id,
                output_index,
                content_index,
                part,
            }
            | StreamEventKind::ContentPartDone {
                item_id,
                output_index,
                content_index,
                part,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("part", part);
            }
            StreamEventKind::OutputTextDelta {
                item_id,
                output_index,
                content_index,
                delta,
                logprobs,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("delta", delta);
                put!("logprobs", logprobs);
            }
            StreamEventKind::OutputTextDone {
                item_id,
                output_index,
                content_index,
                text,
                logprobs,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("text", text);
                put!("logprobs", logprobs);
            }
            StreamEventKind::FunctionCallArgumentsDelta {
                item_id,
                output_index,
                delta,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("delta", delta);
            }
            StreamEventKind::FunctionCallArgumentsDone {
                item_id,
                output_index,
                arguments,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("arguments", arguments);
            }
            StreamEventKind::ReasoningSummaryPartAdded {
                item_id,
                output_index,
                content_index,
                part,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("part", part);
            }
            StreamEventKind::ReasoningSummaryTextDelta {
                item_id,
                output_index,
                content_index,
                delta,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("delta", delta);
            }
            StreamEventKind::ReasoningSummaryTextDone {
                item_id,
                output_index,
                content_index,
                text,
            } => {
                put!("item_id", item_id);
                put!("output_index", output_index);
                put!("content_index", content_index);
                put!("text", text);
            }
        }
        map.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseStatus;

    fn sample_response() -> Response {
        Response {
            id: "resp_abcdefghijklmnopqrstuvwx".into(),
            object: "response".into(),
            status: ResponseStatus::InProgress,
            output: vec![],
            model: "gpt-test".into(),
            created_at: 0,
            usage: None,
            error: None,
            previous_response_id: None,
            incomplete_details: None,
            instructions: None,
            tools: vec![],
            tool_choice: crate::request::ToolChoice::Auto,
            store: true,
            truncation: crate::request::Truncation::Auto,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            parallel_tool_calls: true,
        }
    }

    #[test]
    fn lifecycle_event_serializes_flat_with_type_and_sequence() {
        let event = StreamEvent {
            sequence_number: 3,
            kind: StreamEventKind::Created {
                response: Box::new(sample_response()),
            },
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "response.created");
        assert_eq!(value["sequence_number"], 3);
        assert_eq!(value["response"]["id"], "resp_abcdefghijklmnopqrstuvwx");
    }

    #[test]
    fn delta_event_carries_item_and_index_fields() {
        let event = StreamEvent {
            sequence_number: 10,
            kind: StreamEventKind::OutputTextDelta {
                item_id: "item_abcdefghijklmnopqrstuvwx".into(),
                output_index: 0,
                content_index: 0,
                delta: "hel".into(),
                logprobs: vec![],
            },
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "response.output_text.delta");
        assert_eq!(value["delta"], "hel");
        assert_eq!(value["output_index"], 0);
    }

    #[test]
    fn terminal_classification() {
        let completed = StreamEventKind::Completed {
            response: Box::new(sample_response()),
        };
        assert!(completed.is_terminal());
        let delta = StreamEventKind::FunctionCallArgumentsDelta {
            item_id: "x".into(),
            output_index: 0,
            delta: "a".into(),
        };
        assert!(!delta.is_terminal());
        assert!(!delta.is_lifecycle());
    }
}
