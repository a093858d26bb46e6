use std::collections::BTreeMap;
use std::time::Duration;

use antwort_protocol::ContentPart;
use antwort_protocol::Item;
use antwort_protocol::ItemPayload;
use antwort_protocol::ItemStatus;
use antwort_protocol::Role;
use antwort_protocol::Tool;
use antwort_protocol::ToolChoice;
use antwort_protocol::Usage;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::Provider;
use crate::ProviderEventStream;
use crate::builtin_tools::expand_builtin_tools;
use crate::error::ProviderError;
use crate::http_retry::send_with_retry;
use crate::types::ModelInfo;
use crate::types::ProviderCapabilities;
use crate::types::ProviderEvent;
use crate::types::ProviderRequest;
use crate::types::ProviderResponse;

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Adapter for the Chat Completions wire protocol (`/v1/chat/completions`),
/// grounded directly on the teacher's `chat_completions.rs`: message-array
/// construction, SSE token-delta accumulation, and per-index tool-call
/// argument buffering across chunks.
pub struct ChatCompletionsProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatCompletionsProvider {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request_body(&self, request: &ProviderRequest, stream: bool) -> Value {
        let mut messages = Vec::new();
        if let Some(instructions) = &request.instructions {
            messages.push(json!({ "role": "system", "content": instructions }));
        }
        messages.extend(request.input.iter().filter_map(item_to_message));

        let tools = expand_builtin_tools(&request.tools);
        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "stream": stream,
            "parallel_tool_calls": request.parallel_tool_calls,
        });
        if !tools.is_empty() {
            body["tools"] = tools_to_json(&tools);
            body["tool_choice"] = tool_choice_to_json(&request.tool_choice);
        }
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(p) = request.top_p {
            body["top_p"] = json!(p);
        }
        if let Some(max) = request.max_output_tokens {
            body["max_tokens"] = json!(max);
        }
        body
    }
}

fn tools_to_json(tools: &[Tool]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| match tool {
                Tool::Function { function } => json!({
                    "type": "function",
                    "function": {
                        "name": function.name,
                        "description": function.description,
                        "parameters": function.parameters,
                    }
                }),
                // `expand_builtin_tools` turns every built-in stub into a
                // `Function` variant before this is reached.
                _ => unreachable!("built-in tool stubs must be expanded before wire translation"),
            })
            .collect(),
    )
}

fn tool_choice_to_json(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Function { name } => json!({ "type": "function", "function": { "name": name } }),
    }
}

fn item_to_message(item: &Item) -> Option<Value> {
    match &item.payload {
        ItemPayload::Message { role, content } => {
            let text: String = content.iter().filter_map(ContentPart::text).collect();
            Some(json!({ "role": role_str(*role), "content": text }))
        }
        ItemPayload::FunctionCall {
            name,
            call_id,
            arguments,
        } => Some(json!({
            "role": "assistant",
            "content": Value::Null,
            "tool_calls": [{
                "id": call_id,
                "type": "function",
                "function": { "name": name, "arguments": arguments },
            }]
        })),
        ItemPayload::FunctionCallOutput { call_id, output } => Some(json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": output,
        })),
        // Chat Completions has no reasoning-item or arbitrary-extension
        // slot; these simply don't translate to this backend protocol.
        ItemPayload::Reasoning { .. } | ItemPayload::Extension { .. } => None,
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Developer => "developer",
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

impl From<ChatUsage> for Usage {
    fn from(u: ChatUsage) -> Self {
        Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            cached_input_tokens: None,
            reasoning_output_tokens: None,
        }
    }
}

fn chat_response_to_output(response: ChatCompletionResponse) -> ProviderResponse {
    let mut output = Vec::new();
    if let Some(choice) = response.choices.into_iter().next() {
        if let Some(text) = choice.message.content.filter(|s| !s.is_empty()) {
            output.push(Item::new(
                antwort_protocol::new_item_id(),
                ItemStatus::Completed,
                ItemPayload::Message {
                    role: Role::Assistant,
                    content: vec![ContentPart::OutputText {
                        text,
                        annotations: vec![],
                        logprobs: vec![],
                    }],
                },
            ));
        }
        for call in choice.message.tool_calls {
            output.push(Item::new(
                antwort_protocol::new_item_id(),
                ItemStatus::Completed,
                ItemPayload::FunctionCall {
                    name: call.function.name,
                    call_id: call.id,
                    arguments: call.function.arguments,
                },
            ));
        }
    }
    ProviderResponse {
        output,
        usage: response.usage.map(Usage::from),
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    choices: Vec<ChatChunkChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChunkChoice {
    delta: ChatDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCallDelta>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChatFunctionCallDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatFunctionCallDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Accumulates a tool call's `id`/`name`/`arguments` across chunks, keyed by
/// the backend's per-call `index` (the teacher's `FunctionCallState`).
#[derive(Default)]
struct FunctionCallState {
    call_id: String,
    name: String,
    arguments: String,
}

/// Turns the raw SSE byte stream into a `ProviderEvent` stream: token-delta
/// accumulation for text, per-index buffering for tool-call arguments, a
/// synthesized stable `item_id` per output item (Chat Completions does not
/// hand out item ids), and an idle timeout if the backend stalls mid-stream.
fn process_chat_sse(
    provider_name: String,
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> ProviderEventStream {
    let events = byte_stream.eventsource();
    let text_item_id = antwort_protocol::new_item_id();
    let mut text_opened = false;
    let mut calls: BTreeMap<usize, FunctionCallState> = BTreeMap::new();
    let mut call_item_ids: BTreeMap<usize, String> = BTreeMap::new();
    let mut usage: Option<Usage> = None;
    let mut truncated = false;

    let stream = async_stream::try_stream! {
        yield ProviderEvent::Created;

        tokio::pin!(events);
        loop {
            let next = tokio::time::timeout(IDLE_TIMEOUT, events.next()).await.map_err(|_| {
                ProviderError::IdleTimeout { provider: provider_name.clone() }
            })?;
            let Some(event) = next else { break };
            let event = event.map_err(|err| ProviderError::Decode {
                provider: provider_name.clone(),
                message: err.to_string(),
            })?;

            if event.data == "[DONE]" {
                break;
            }

            let chunk: ChatChunk = serde_json::from_str(&event.data).map_err(|err| ProviderError::Decode {
                provider: provider_name.clone(),
                message: err.to_string(),
            })?;
            if let Some(u) = chunk.usage {
                usage = Some(Usage::from(u));
            }

            let Some(choice) = chunk.choices.into_iter().next() else { continue };

            if let Some(delta) = choice.delta.content.filter(|s| !s.is_empty()) {
                text_opened = true;
                yield ProviderEvent::OutputTextDelta {
                    item_id: text_item_id.clone(),
                    delta,
                };
            }

            for call_delta in choice.delta.tool_calls {
                let state = calls.entry(call_delta.index).or_default();
                let item_id = call_item_ids
                    .entry(call_delta.index)
                    .or_insert_with(antwort_protocol::new_item_id)
                    .clone();
                if let Some(id) = call_delta.id {
                    state.call_id = id;
                }
                if let Some(function) = call_delta.function {
                    if let Some(name) = function.name {
                        state.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        state.arguments.push_str(&arguments);
                        yield ProviderEvent::FunctionCallArgumentsDelta {
                            item_id,
                            delta: arguments,
                        };
                    }
                }
            }

            if let Some(finish_reason) = choice.finish_reason {
                truncated = finish_reason == "length";
                break;
            }
        }

        if text_opened {
            yield ProviderEvent::OutputItemDone {
                item: Item::new(
                    text_item_id.clone(),
                    ItemStatus::Completed,
                    ItemPayload::Message {
                        role: Role::Assistant,
                        content: vec![],
                    },
                ),
            };
        }
        for (index, state) in calls {
            let item_id = call_item_ids.remove(&index).unwrap_or_else(antwort_protocol::new_item_id);
            yield ProviderEvent::OutputItemDone {
                item: Item::new(
                    item_id,
                    ItemStatus::Completed,
                    ItemPayload::FunctionCall {
                        name: state.name,
                        call_id: state.call_id,
                        arguments: state.arguments,
                    },
                ),
            };
        }

        yield ProviderEvent::Completed { usage, truncated };
    };

    Box::pin(stream)
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_tools: true,
            supports_reasoning: false,
            supports_streaming: true,
            supports_logprobs: true,
        }
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = self.build_request_body(&request, false);
        let name = self.name.clone();
        let response = send_with_retry(&name, || {
            self.client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| ProviderError::Decode {
            provider: name.clone(),
            message: err.to_string(),
        })?;
        Ok(chat_response_to_output(parsed))
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError> {
        let body = self.build_request_body(&request, true);
        let name = self.name.clone();
        let response = send_with_retry(&name, || {
            self.client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        Ok(process_chat_sse(name, response.bytes_stream()))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelEntry>,
        }
        #[derive(Deserialize)]
        struct ModelEntry {
            id: String,
            #[serde(default = "default_owner")]
            owned_by: String,
        }
        fn default_owner() -> String {
            "unknown".to_string()
        }

        let name = self.name.clone();
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        let response = send_with_retry(&name, || self.client.get(&url).bearer_auth(&self.api_key)).await?;
        let parsed: ModelsResponse = response.json().await.map_err(|err| ProviderError::Decode {
            provider: name.clone(),
            message: err.to_string(),
        })?;
        Ok(parsed
            .data
            .into_iter()
            .map(|entry| ModelInfo {
                id: entry.id,
                owned_by: entry.owned_by,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antwort_protocol::ToolChoice;

    fn sample_request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-test".into(),
            input: vec![Item::new(
                antwort_protocol::new_item_id(),
                ItemStatus::Completed,
                ItemPayload::Message {
                    role: Role::User,
                    content: vec![ContentPart::InputText { text: "hi".into() }],
                },
            )],
            instructions: Some("be terse".into()),
            tools: vec![],
            tool_choice: ToolChoice::Auto,
            temperature: Some(0.2),
            top_p: None,
            max_output_tokens: Some(256),
            parallel_tool_calls: true,
        }
    }

    #[test]
    fn build_request_body_includes_system_and_user_messages() {
        let provider = ChatCompletionsProvider::new("test", "https://example.test/v1", "key");
        let body = provider.build_request_body(&sample_request(), false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn function_call_output_item_becomes_tool_message() {
        let item = Item::new(
            antwort_protocol::new_item_id(),
            ItemStatus::Completed,
            ItemPayload::FunctionCallOutput {
                call_id: "call_1".into(),
                output: "72F".into(),
            },
        );
        let message = item_to_message(&item).expect("tool message");
        assert_eq!(message["role"], "tool");
        assert_eq!(message["tool_call_id"], "call_1");
        assert_eq!(message["content"], "72F");
    }

    #[test]
    fn chat_response_collects_message_and_tool_calls() {
        let response = ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: Some("the weather is nice".into()),
                    tool_calls: vec![ChatToolCall {
                        id: "call_1".into(),
                        function: ChatFunctionCall {
                            name: "get_weather".into(),
                            arguments: "{}".into(),
                        },
                    }],
                },
            }],
            usage: Some(ChatUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        };
        let provider_response = chat_response_to_output(response);
        assert_eq!(provider_response.output.len(), 2);
        assert_eq!(provider_response.usage.expect("usage").total_tokens, 15);
    }
}
