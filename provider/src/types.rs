use antwort_protocol::Item;
use antwort_protocol::Tool;
use antwort_protocol::ToolChoice;
use antwort_protocol::Usage;

/// What the engine asks a `Provider` to do for a single model turn. Already
/// carries the full reconstructed conversation (`input`); the provider is
/// not responsible for chain-walking, only for translating and sending it.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub model: String,
    pub input: Vec<Item>,
    pub instructions: Option<String>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_output_tokens: Option<u64>,
    pub parallel_tool_calls: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub output: Vec<Item>,
    pub usage: Option<Usage>,
}

/// A provider-agnostic turn event. The stream synthesizer (`antwort-stream`)
/// is responsible for all `sequence_number`/`output_index`/`content_index`
/// bookkeeping; these events carry only what the backend actually told us.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    Created,
    OutputItemDone {
        item: Item,
    },
    OutputTextDelta {
        item_id: String,
        delta: String,
    },
    FunctionCallArgumentsDelta {
        item_id: String,
        delta: String,
    },
    ReasoningSummaryTextDelta {
        item_id: String,
        delta: String,
    },
    ReasoningTextDelta {
        item_id: String,
        delta: String,
    },
    Completed {
        usage: Option<Usage>,
        /// Set when the backend stopped generating because it hit the
        /// requested `max_output_tokens` ceiling rather than finishing on
        /// its own (OpenAI's `finish_reason: "length"`, or the Responses
        /// API's `status: "incomplete"` with a matching reason).
        truncated: bool,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderCapabilities {
    pub supports_tools: bool,
    pub supports_reasoning: bool,
    pub supports_streaming: bool,
    pub supports_logprobs: bool,
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub owned_by: String,
}
