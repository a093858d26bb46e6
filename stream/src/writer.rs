use antwort_protocol::StreamEvent;

/// A `ResponseWriter` is single-use: it starts `Idle`, moves to `Streaming`
/// once the first event is written (or straight to `Completed` for a
/// non-streaming response), and `Completed` is terminal. Mirrors the
/// request-level state machine's shape at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Streaming,
    Completed,
}

impl WriterState {
    pub fn can_transition_to(self, next: WriterState) -> bool {
        use WriterState::*;
        matches!(
            (self, next),
            (Idle, Streaming | Completed) | (Streaming, Completed)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("response writer cannot move from {from:?} to {to:?}: writers are single-use")]
    InvalidTransition { from: WriterState, to: WriterState },
}

/// State machine guarding a response's output path. `antwort-http` pairs
/// one of these with an actual transport sink (an SSE channel, or a plain
/// JSON body writer); this crate only owns the state, not the transport.
pub struct ResponseWriter {
    state: WriterState,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            state: WriterState::Idle,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Call once, before the first `StreamEvent` is handed to the
    /// transport. Returns an error if this writer already moved past
    /// `Idle`.
    pub fn begin_streaming(&mut self) -> Result<(), WriterError> {
        self.transition(WriterState::Streaming)
    }

    /// Call once the terminal lifecycle event (or, for a non-streaming
    /// response, the whole body) has been written.
    pub fn complete(&mut self) -> Result<(), WriterError> {
        self.transition(WriterState::Completed)
    }

    fn transition(&mut self, next: WriterState) -> Result<(), WriterError> {
        if self.state.can_transition_to(next) {
            self.state = next;
            Ok(())
        } else {
            Err(WriterError::InvalidTransition {
                from: self.state,
                to: next,
            })
        }
    }
}

/// Renders one `StreamEvent` as a standalone SSE frame (`event:`/`data:`
/// lines plus the blank-line terminator), grounded on the teacher/pack's
/// `chunk_event` helper (`other_examples/f3fbedb3_..._server-mod.rs.rs`).
/// `antwort-http` may use this directly or build an equivalent `axum::sse`
/// event from the same `StreamEvent`; both must produce the same bytes.
pub fn format_sse_frame(event: &StreamEvent) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.kind.type_tag(), data))
}

/// The sentinel frame that ends every stream, successful or not.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[cfg(test)]
mod tests {
    use super::*;
    use antwort_protocol::Response;
    use antwort_protocol::ResponseStatus;
    use antwort_protocol::StreamEventKind;
    use antwort_protocol::ToolChoice;
    use antwort_protocol::Truncation;

    fn sample_event() -> StreamEvent {
        let response = Response {
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
            tool_choice: ToolChoice::Auto,
            store: true,
            truncation: Truncation::Auto,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            parallel_tool_calls: true,
        };
        StreamEvent {
            sequence_number: 0,
            kind: StreamEventKind::Created {
                response: Box::new(response),
            },
        }
    }

    #[test]
    fn writer_rejects_reuse_after_completion() {
        let mut writer = ResponseWriter::new();
        writer.begin_streaming().expect("idle -> streaming");
        writer.complete().expect("streaming -> completed");
        assert!(writer.begin_streaming().is_err());
    }

    #[test]
    fn non_streaming_response_can_skip_straight_to_completed() {
        let mut writer = ResponseWriter::new();
        assert!(writer.complete().is_ok());
        assert_eq!(writer.state(), WriterState::Completed);
    }

    #[test]
    fn frame_contains_event_and_data_lines() {
        let frame = format_sse_frame(&sample_event()).expect("format");
        assert!(frame.starts_with("event: response.created\n"));
        assert!(frame.contains("data: "));
        assert!(frame.ends_with("\n\n"));
    }
}
