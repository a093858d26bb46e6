use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use antwort_protocol::ApiError;
use antwort_protocol::CreateResponseRequest;
use antwort_protocol::Item;
use antwort_protocol::ItemPayload;
use antwort_protocol::Response;
use antwort_protocol::ResponseStatus;
use antwort_protocol::StreamEvent;
use antwort_protocol::StreamEventKind;
use antwort_protocol::Tool;
use antwort_protocol::ToolChoice;
use antwort_protocol::new_response_id;
use antwort_protocol::validate_request;
use antwort_provider::Provider;
use antwort_provider::ProviderEvent;
use antwort_provider::ProviderRequest;
use antwort_provider::expand_builtin_tools;
use antwort_stream::Synthesizer;
use futures::Stream;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cancellation::CancellationRegistry;
use crate::config::GatewayConfig;
use crate::error::EngineError;
use crate::registry::PendingToolCall;
use crate::registry::ToolExecutorRegistry;
use crate::store::ListParams;
use crate::store::ResponseStore;

/// The `{object: "list", data, has_more, first_id, last_id}` envelope
/// `GET /v1/responses` returns (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct ResponsePage {
    pub object: &'static str,
    pub data: Vec<Response>,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

/// What `Engine::create_response` hands back: a finished snapshot for
/// `stream: false`, or a live event stream for `stream: true`. Both paths
/// run the identical agentic loop underneath (spec §4.4) — a non-streaming
/// caller just drains the stream and keeps the last lifecycle snapshot.
pub enum EngineOutcome {
    Complete(Response),
    Streaming(Pin<Box<dyn Stream<Item = StreamEvent> + Send>>),
}

/// Fields that stay fixed across every turn of one agentic loop, split out
/// of `CreateResponseRequest` so the loop body isn't threading the whole
/// request struct through repeated `.clone()`s.
struct TurnConfig {
    model: String,
    instructions: Option<String>,
    tools: Vec<Tool>,
    tool_choice: ToolChoice,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_output_tokens: Option<u64>,
    parallel_tool_calls: bool,
}

/// Ties together a provider, an optional persistence tier, the tool
/// executor registry, and in-flight cancellation into the single entry
/// point the HTTP surface calls. Analogous to the teacher's `Codex`/
/// `CodexConversation` pairing (`core/src/codex.rs`) but built around a
/// request/response call instead of a submission queue.
pub struct Engine {
    config: GatewayConfig,
    provider: Arc<dyn Provider>,
    store: Option<Arc<dyn ResponseStore>>,
    tool_registry: Arc<ToolExecutorRegistry>,
    cancellations: Arc<CancellationRegistry>,
}

impl Engine {
    pub fn new(
        config: GatewayConfig,
        provider: Arc<dyn Provider>,
        store: Option<Arc<dyn ResponseStore>>,
        tool_registry: Arc<ToolExecutorRegistry>,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            tool_registry,
            cancellations: Arc::new(CancellationRegistry::new()),
        }
    }

    fn require_store(&self) -> Result<&Arc<dyn ResponseStore>, EngineError> {
        self.store.as_ref().ok_or(EngineError::StoreUnavailable)
    }

    async fn reconstruct_conversation(
        &self,
        request: &CreateResponseRequest,
    ) -> Result<Vec<Item>, EngineError> {
        let mut conversation = Vec::new();
        if let Some(prev_id) = &request.previous_response_id {
            let store = self.require_store()?;
            let chain = store.get_for_chain(prev_id).await?;
            for response in &chain {
                conversation.extend(store.get_input_items(&response.id).await?);
                conversation.extend(response.output.clone());
            }
        }
        Ok(conversation)
    }

    /// Validates, reconstructs any `previous_response_id` chain, and starts
    /// the agentic loop. The loop itself (turn dispatch, tool-call
    /// execution, lifecycle events) runs identically whether the caller
    /// asked for `stream: true` or not.
    pub async fn create_response(
        &self,
        request: CreateResponseRequest,
    ) -> Result<EngineOutcome, EngineError> {
        validate_request(&request, &self.config.validation_limits)?;

        let mut conversation = self.reconstruct_conversation(&request).await?;
        let request_input = request.input.clone();
        conversation.extend(request.input.clone());

        let turn_config = TurnConfig {
            model: request.model.clone(),
            instructions: request.instructions.clone(),
            tools: request.tools.clone(),
            tool_choice: request.tool_choice.clone(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: request.max_output_tokens,
            parallel_tool_calls: request.parallel_tool_calls,
        };

        let shell = Response {
            id: new_response_id(),
            object: "response".to_string(),
            status: ResponseStatus::Queued,
            output: vec![],
            model: turn_config.model.clone(),
            created_at: now_unix(),
            usage: None,
            error: None,
            previous_response_id: request.previous_response_id.clone(),
            incomplete_details: None,
            instructions: turn_config.instructions.clone(),
            tools: turn_config.tools.clone(),
            tool_choice: turn_config.tool_choice.clone(),
            store: request.store,
            truncation: request.truncation,
            temperature: turn_config.temperature,
            top_p: turn_config.top_p,
            max_output_tokens: turn_config.max_output_tokens,
            metadata: request.metadata.clone(),
            parallel_tool_calls: turn_config.parallel_tool_calls,
        };

        let cancel_token = self.cancellations.register(shell.id.clone());
        let event_stream = agentic_loop(
            shell,
            conversation,
            turn_config,
            self.provider.clone(),
            self.tool_registry.clone(),
            self.store.clone(),
            self.cancellations.clone(),
            cancel_token,
            request_input,
            request.store,
            self.config.max_agentic_turns,
            self.config.provider_call_deadline,
        );

        if request.stream {
            return Ok(EngineOutcome::Streaming(Box::pin(event_stream)));
        }

        futures::pin_mut!(event_stream);
        let mut last_snapshot = None;
        while let Some(event) = event_stream.next().await {
            if let Some(response) = terminal_response(&event.kind) {
                last_snapshot = Some(response);
            }
        }
        last_snapshot.map(EngineOutcome::Complete).ok_or(EngineError::NoTerminalEvent)
    }

    /// Signals cancellation to a running turn. Returns an error if no
    /// matching in-flight registration exists (already finished, or never
    /// started).
    pub fn cancel(&self, response_id: &str) -> Result<(), EngineError> {
        if self.cancellations.cancel(response_id) {
            Ok(())
        } else {
            Err(EngineError::NothingToCancel(response_id.to_string()))
        }
    }

    pub async fn get_response(&self, id: &str) -> Result<Response, EngineError> {
        Ok(self.require_store()?.get(id).await?)
    }

    pub async fn delete_response(&self, id: &str) -> Result<bool, EngineError> {
        Ok(self.require_store()?.delete(id).await?)
    }

    pub async fn list_input_items(&self, id: &str) -> Result<Vec<Item>, EngineError> {
        Ok(self.require_store()?.get_input_items(id).await?)
    }

    /// Lists stored responses (spec §6). `after`/`before` are mutually
    /// exclusive cursors; supplying both is a validation error, not a store
    /// query.
    pub async fn list_responses(&self, params: ListParams) -> Result<ResponsePage, EngineError> {
        if params.after.is_some() && params.before.is_some() {
            return Err(EngineError::Validation(
                ApiError::invalid_request("`after` and `before` are mutually exclusive").with_param("after"),
            ));
        }
        let store = self.require_store()?;
        let (data, has_more) = store.list(params).await?;
        let first_id = data.first().map(|r| r.id.clone());
        let last_id = data.last().map(|r| r.id.clone());
        Ok(ResponsePage {
            object: "list",
            data,
            has_more,
            first_id,
            last_id,
        })
    }

    pub async fn list_models(&self) -> Result<Vec<antwort_provider::ModelInfo>, EngineError> {
        Ok(self.provider.list_models().await?)
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn terminal_response(kind: &StreamEventKind) -> Option<Response> {
    match kind {
        StreamEventKind::Completed { response }
        | StreamEventKind::Failed { response }
        | StreamEventKind::Cancelled { response }
        | StreamEventKind::Incomplete { response }
        | StreamEventKind::RequiresAction { response } => Some(response.as_ref().clone()),
        _ => None,
    }
}

/// The multi-turn agentic loop, grounded on the teacher's submission/event
/// pattern (`core/src/protocol.rs`'s `Op`/`EventMsg`) but implemented as a
/// single long-lived generator so token-level deltas from every turn
/// reach the caller live, rather than being batched per turn. Runs a
/// provider turn, streams its deltas through the synthesizer, collects any
/// `function_call` items the turn produced, dispatches them through the
/// tool registry, folds the results back into the conversation, and loops
/// until a turn produces no pending tool calls or `max_turns` is exceeded.
fn agentic_loop(
    shell: Response,
    mut conversation: Vec<Item>,
    turn_config: TurnConfig,
    provider: Arc<dyn Provider>,
    tool_registry: Arc<ToolExecutorRegistry>,
    store: Option<Arc<dyn ResponseStore>>,
    cancellations: Arc<CancellationRegistry>,
    cancel_token: CancellationToken,
    request_input: Vec<Item>,
    should_store: bool,
    max_turns: u32,
    deadline: Duration,
) -> impl Stream<Item = StreamEvent> {
    async_stream::stream! {
        let response_id = shell.id.clone();
        let mut synth = Synthesizer::new(shell);
        yield synth.created();
        yield synth.in_progress();

        let expanded_tools = expand_builtin_tools(&turn_config.tools);
        let mut turns_run = 0u32;

        let terminal = 'turns: loop {
            if cancel_token.is_cancelled() {
                break 'turns synth.cancelled();
            }
            if turns_run >= max_turns {
                break 'turns synth.incomplete("max_agentic_turns_exceeded");
            }
            turns_run += 1;

            let provider_request = ProviderRequest {
                model: turn_config.model.clone(),
                input: conversation.clone(),
                instructions: turn_config.instructions.clone(),
                tools: expanded_tools.clone(),
                tool_choice: turn_config.tool_choice.clone(),
                temperature: turn_config.temperature,
                top_p: turn_config.top_p,
                max_output_tokens: turn_config.max_output_tokens,
                parallel_tool_calls: turn_config.parallel_tool_calls,
            };

            let provider_stream = match tokio::time::timeout(deadline, provider.stream(provider_request)).await {
                Err(_) => break 'turns synth.failed("provider call exceeded its configured deadline"),
                Ok(Err(err)) => break 'turns synth.failed(err.to_string()),
                Ok(Ok(s)) => s,
            };
            futures::pin_mut!(provider_stream);

            let mut turn_calls: Vec<PendingToolCall> = Vec::new();
            let mut usage = None;
            let mut turn_error = None;
            let mut turn_truncated = false;

            loop {
                if cancel_token.is_cancelled() {
                    break;
                }
                match tokio::time::timeout(deadline, provider_stream.next()).await {
                    Err(_) => break 'turns synth.failed(EngineError::DeadlineExceeded.to_string()),
                    Ok(None) => break,
                    Ok(Some(Err(err))) => {
                        turn_error = Some(err);
                        break;
                    }
                    Ok(Some(Ok(ProviderEvent::Completed { usage: turn_usage, truncated }))) => {
                        usage = turn_usage;
                        turn_truncated = truncated;
                        break;
                    }
                    Ok(Some(Ok(event))) => {
                        if let ProviderEvent::OutputItemDone { item } = &event {
                            if let ItemPayload::FunctionCall { name, call_id, arguments } = &item.payload {
                                turn_calls.push(PendingToolCall {
                                    name: name.clone(),
                                    call_id: call_id.clone(),
                                    arguments: arguments.clone(),
                                });
                            }
                            conversation.push(item.clone());
                        }
                        for ev in synth.on_provider_event(event) {
                            yield ev;
                        }
                    }
                }
            }

            if cancel_token.is_cancelled() {
                break 'turns synth.cancelled();
            }
            if let Some(err) = turn_error {
                break 'turns synth.failed(err.to_string());
            }
            if turn_truncated {
                break 'turns synth.incomplete("max_output_tokens");
            }
            if turn_calls.is_empty() {
                break 'turns synth.completed(usage);
            }

            let outputs = if turn_config.parallel_tool_calls {
                tool_registry.dispatch_parallel(turn_calls).await
            } else {
                tool_registry.dispatch_sequential(turn_calls).await
            };

            // Tool results feed the next turn's input but are never emitted
            // on the client stream as output items and never join
            // `response.output` — only the model's own output items do.
            for output_item in outputs {
                conversation.push(output_item);
            }
        };

        yield terminal;

        if should_store {
            if let Some(store) = &store {
                if let Err(err) = store.save(synth.response_snapshot().clone(), request_input.clone()).await {
                    tracing::warn!(response_id = %response_id, error = %err, "failed to persist completed response");
                }
            }
        }
        cancellations.remove(&response_id);
    }
}
