use std::collections::HashMap;

use antwort_protocol::ContentPart;
use antwort_protocol::Item;
use antwort_protocol::ItemPayload;
use antwort_protocol::ItemStatus;
use antwort_protocol::Response;
use antwort_protocol::ResponseStatus;
use antwort_protocol::Role;
use antwort_protocol::StreamEvent;
use antwort_protocol::StreamEventKind;
use antwort_provider::ProviderEvent;

#[derive(Debug, Clone, Copy)]
enum OpenKind {
    Text,
    FunctionCallArguments,
    ReasoningSummary,
}

struct OpenItem {
    output_index: u32,
    kind: OpenKind,
    content_index: u32,
}

/// Turns a `ProviderEvent` sequence into the full OpenResponses lifecycle
/// event sequence: monotonically increasing `sequence_number`, first-seen
/// `output_index` per item, and `content_index` bookkeeping per open content
/// part. Grounded on `core/src/client.rs::process_sse`'s event-kind match,
/// re-targeted from Codex's reduced internal `ResponseEvent` enum to the
/// full wire-level lifecycle Antwort exposes to clients (spec §4.3).
pub struct Synthesizer {
    next_seq: u64,
    next_output_index: u32,
    open_items: HashMap<String, OpenItem>,
    response: Response,
}

impl Synthesizer {
    pub fn new(response: Response) -> Self {
        Self {
            next_seq: 0,
            next_output_index: 0,
            open_items: HashMap::new(),
            response,
        }
    }

    fn seq(&mut self) -> u64 {
        let s = self.next_seq;
        self.next_seq += 1;
        s
    }

    fn event(&mut self, kind: StreamEventKind) -> StreamEvent {
        let sequence_number = self.seq();
        StreamEvent {
            sequence_number,
            kind,
        }
    }

    /// Emits the `response.created` lifecycle event. Called once, before
    /// any provider events are consumed.
    pub fn created(&mut self) -> StreamEvent {
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::Created { response })
    }

    pub fn in_progress(&mut self) -> StreamEvent {
        self.response.status = ResponseStatus::InProgress;
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::InProgress { response })
    }

    fn open_item(&mut self, item_id: &str, kind: OpenKind, placeholder: Item) -> Vec<StreamEvent> {
        if self.open_items.contains_key(item_id) {
            return vec![];
        }
        let output_index = self.next_output_index;
        self.next_output_index += 1;
        self.open_items.insert(
            item_id.to_string(),
            OpenItem {
                output_index,
                kind,
                content_index: 0,
            },
        );
        vec![self.event(StreamEventKind::OutputItemAdded {
            output_index,
            item: Box::new(placeholder),
        })]
    }

    /// Translates one `ProviderEvent` into zero or more `StreamEvent`s,
    /// opening an item lazily on its first delta and closing it when the
    /// provider hands over the finished item.
    pub fn on_provider_event(&mut self, event: ProviderEvent) -> Vec<StreamEvent> {
        match event {
            ProviderEvent::Created => vec![],
            ProviderEvent::OutputTextDelta { item_id, delta } => {
                let mut out = self.open_item(
                    &item_id,
                    OpenKind::Text,
                    Item::new(
                        item_id.clone(),
                        ItemStatus::InProgress,
                        ItemPayload::Message {
                            role: Role::Assistant,
                            content: vec![],
                        },
                    ),
                );
                let opened_just_now = out.len() == 1;
                let output_index = self.open_items[&item_id].output_index;
                if opened_just_now {
                    out.push(self.event(StreamEventKind::ContentPartAdded {
                        item_id: item_id.clone(),
                        output_index,
                        content_index: 0,
                        part: ContentPart::OutputText {
                            text: String::new(),
                            annotations: vec![],
                            logprobs: vec![],
                        },
                    }));
                }
                out.push(self.event(StreamEventKind::OutputTextDelta {
                    item_id,
                    output_index,
                    content_index: 0,
                    delta,
                    logprobs: vec![],
                }));
                out
            }
            ProviderEvent::FunctionCallArgumentsDelta { item_id, delta } => {
                let mut out = self.open_item(
                    &item_id,
                    OpenKind::FunctionCallArguments,
                    Item::new(
                        item_id.clone(),
                        ItemStatus::InProgress,
                        ItemPayload::FunctionCall {
                            name: String::new(),
                            call_id: String::new(),
                            arguments: String::new(),
                        },
                    ),
                );
                let output_index = self.open_items[&item_id].output_index;
                out.push(self.event(StreamEventKind::FunctionCallArgumentsDelta {
                    item_id,
                    output_index,
                    delta,
                }));
                out
            }
            ProviderEvent::ReasoningSummaryTextDelta { item_id, delta } => {
                let mut out = self.open_item(
                    &item_id,
                    OpenKind::ReasoningSummary,
                    Item::new(
                        item_id.clone(),
                        ItemStatus::InProgress,
                        ItemPayload::Reasoning {
                            content: None,
                            encrypted_content: None,
                            summary: Some(vec![]),
                        },
                    ),
                );
                let opened_just_now = out.len() == 1;
                let output_index = self.open_items[&item_id].output_index;
                if opened_just_now {
                    out.push(self.event(StreamEventKind::ReasoningSummaryPartAdded {
                        item_id: item_id.clone(),
                        output_index,
                        content_index: 0,
                        part: ContentPart::SummaryText {
                            text: String::new(),
                        },
                    }));
                }
                out.push(self.event(StreamEventKind::ReasoningSummaryTextDelta {
                    item_id,
                    output_index,
                    content_index: 0,
                    delta,
                }));
                out
            }
            ProviderEvent::ReasoningTextDelta { item_id, delta } => {
                // Reasoning "content" (as opposed to its summary) has no
                // dedicated delta event family in the wire protocol; fold
                // it into the final `output_item.done` snapshot instead of
                // streaming token-by-token.
                tracing::debug!(item_id, delta_len = delta.len(), "buffering reasoning content delta");
                vec![]
            }
            ProviderEvent::OutputItemDone { item } => self.close_item(item),
            ProviderEvent::Completed { .. } => vec![],
        }
    }

    fn close_item(&mut self, item: Item) -> Vec<StreamEvent> {
        let item_id = item.id.clone();
        let mut out = Vec::new();

        let output_index = match self.open_items.get(&item_id) {
            Some(open) => open.output_index,
            None => {
                let index = self.next_output_index;
                self.next_output_index += 1;
                out.push(self.event(StreamEventKind::OutputItemAdded {
                    output_index: index,
                    item: Box::new(item.clone()),
                }));
                index
            }
        };

        let kind = self.open_items.get(&item_id).map(|o| o.kind);
        match (&item.payload, kind) {
            (ItemPayload::Message { content, .. }, Some(OpenKind::Text) | None) => {
                let text: String = content.iter().filter_map(ContentPart::text).collect();
                out.push(self.event(StreamEventKind::ContentPartDone {
                    item_id: item_id.clone(),
                    output_index,
                    content_index: 0,
                    part: ContentPart::OutputText {
                        text: text.clone(),
                        annotations: vec![],
                        logprobs: vec![],
                    },
                }));
                out.push(self.event(StreamEventKind::OutputTextDone {
                    item_id: item_id.clone(),
                    output_index,
                    content_index: 0,
                    text,
                    logprobs: vec![],
                }));
            }
            (ItemPayload::FunctionCall { arguments, .. }, _) => {
                out.push(self.event(StreamEventKind::FunctionCallArgumentsDone {
                    item_id: item_id.clone(),
                    output_index,
                    arguments: arguments.clone(),
                }));
            }
            (ItemPayload::Reasoning { summary, .. }, Some(OpenKind::ReasoningSummary)) => {
                let text: String = summary
                    .iter()
                    .flatten()
                    .filter_map(ContentPart::text)
                    .collect();
                out.push(self.event(StreamEventKind::ReasoningSummaryTextDone {
                    item_id: item_id.clone(),
                    output_index,
                    content_index: 0,
                    text,
                }));
            }
            _ => {}
        }

        let mut finished = item;
        finished.status = ItemStatus::Completed;
        self.response.output.push(finished.clone());
        out.push(self.event(StreamEventKind::OutputItemDone {
            output_index,
            item: Box::new(finished),
        }));
        self.open_items.remove(&item_id);
        out
    }

    pub fn completed(&mut self, usage: Option<antwort_protocol::Usage>) -> StreamEvent {
        self.response.status = ResponseStatus::Completed;
        self.response.usage = usage;
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::Completed { response })
    }

    pub fn failed(&mut self, message: impl Into<String>) -> StreamEvent {
        self.response.status = ResponseStatus::Failed;
        self.response.error = Some(antwort_protocol::ApiError::server_error(message.into()));
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::Failed { response })
    }

    pub fn requires_action(&mut self) -> StreamEvent {
        self.response.status = ResponseStatus::RequiresAction;
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::RequiresAction { response })
    }

    /// Ends the turn as `incomplete`, e.g. after `max_agentic_turns` is
    /// exceeded without the model settling on a final answer.
    pub fn incomplete(&mut self, reason: impl Into<String>) -> StreamEvent {
        self.response.status = ResponseStatus::Incomplete;
        self.response.incomplete_details = Some(antwort_protocol::IncompleteDetails {
            reason: reason.into(),
        });
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::Incomplete { response })
    }

    /// Ends the turn as `cancelled`, in response to a client-initiated
    /// `DELETE`/cancel call observed mid-stream.
    pub fn cancelled(&mut self) -> StreamEvent {
        self.response.status = ResponseStatus::Cancelled;
        let response = Box::new(self.response.clone());
        self.event(StreamEventKind::Cancelled { response })
    }

    pub fn response_snapshot(&self) -> &Response {
        &self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antwort_protocol::ToolChoice;
    use antwort_protocol::Truncation;

    fn shell() -> Response {
        Response {
            id: "resp_abcdefghijklmnopqrstuvwx".into(),
            object: "response".into(),
            status: ResponseStatus::Queued,
            output: vec![],
            model: "gpt-test".into(),
            created_at: 0,
            usage: None,
            error: None,
            previous_response_id: None,
            incomplete_details: None,
            instructions: None,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
            store: true,
            truncation: Truncation::Auto,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            parallel_tool_calls: true,
        }
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut synth = Synthesizer::new(shell());
        let e1 = synth.created();
        let e2 = synth.in_progress();
        let events = synth.on_provider_event(ProviderEvent::OutputTextDelta {
            item_id: "item_abcdefghijklmnopqrstuvwx".into(),
            delta: "hi".into(),
        });
        let mut seqs = vec![e1.sequence_number, e2.sequence_number];
        seqs.extend(events.iter().map(|e| e.sequence_number));
        for pair in seqs.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn first_text_delta_opens_item_and_content_part() {
        let mut synth = Synthesizer::new(shell());
        let events = synth.on_provider_event(ProviderEvent::OutputTextDelta {
            item_id: "item_abcdefghijklmnopqrstuvwx".into(),
            delta: "hel".into(),
        });
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].kind, StreamEventKind::OutputItemAdded { .. }));
        assert!(matches!(events[1].kind, StreamEventKind::ContentPartAdded { .. }));
        assert!(matches!(events[2].kind, StreamEventKind::OutputTextDelta { .. }));

        let more = synth.on_provider_event(ProviderEvent::OutputTextDelta {
            item_id: "item_abcdefghijklmnopqrstuvwx".into(),
            delta: "lo".into(),
        });
        assert_eq!(more.len(), 1, "subsequent deltas should not reopen the item");
    }

    #[test]
    fn output_item_done_closes_with_content_part_and_text_done() {
        let mut synth = Synthesizer::new(shell());
        synth.on_provider_event(ProviderEvent::OutputTextDelta {
            item_id: "item_abcdefghijklmnopqrstuvwx".into(),
            delta: "hi".into(),
        });
        let events = synth.on_provider_event(ProviderEvent::OutputItemDone {
            item: Item::new(
                "item_abcdefghijklmnopqrstuvwx",
                ItemStatus::Completed,
                ItemPayload::Message {
                    role: Role::Assistant,
                    content: vec![ContentPart::OutputText {
                        text: "hi".into(),
                        annotations: vec![],
                        logprobs: vec![],
                    }],
                },
            ),
        });
        let kinds: Vec<_> = events.iter().map(|e| e.kind.type_tag()).collect();
        assert_eq!(
            kinds,
            vec![
                "response.content_part.done",
                "response.output_text.done",
                "response.output_item.done",
            ]
        );
        assert_eq!(synth.response_snapshot().output.len(), 1);
    }

    #[test]
    fn incomplete_records_the_reason_on_the_response() {
        let mut synth = Synthesizer::new(shell());
        synth.incomplete("max_agentic_turns_exceeded");
        assert_eq!(synth.response_snapshot().status, ResponseStatus::Incomplete);
        assert_eq!(
            synth
                .response_snapshot()
                .incomplete_details
                .as_ref()
                .expect("incomplete_details")
                .reason,
            "max_agentic_turns_exceeded"
        );
    }

    #[test]
    fn function_call_without_deltas_opens_and_closes_in_one_step() {
        let mut synth = Synthesizer::new(shell());
        let events = synth.on_provider_event(ProviderEvent::OutputItemDone {
            item: Item::new(
                "item_abcdefghijklmnopqrstuvwx",
                ItemStatus::Completed,
                ItemPayload::FunctionCall {
                    name: "get_weather".into(),
                    call_id: "call_1".into(),
                    arguments: "{}".into(),
                },
            ),
        });
        let kinds: Vec<_> = events.iter().map(|e| e.kind.type_tag()).collect();
        assert_eq!(
            kinds,
            vec![
                "response.output_item.added",
                "response.function_call_arguments.done",
                "response.output_item.done",
            ]
        );
    }
}
