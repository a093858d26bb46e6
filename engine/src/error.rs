use antwort_protocol::ApiError;
use antwort_provider::ProviderError;

use crate::registry::ToolExecutionError;
use crate::store::StoreError;

/// Engine-boundary error: wraps a collaborator's error with the call-site
/// context the engine alone has (which response, which turn), then
/// classifies into an `ApiError` at the surface, same split the provider
/// layer uses for its own errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("request failed validation: {0}")]
    Validation(#[from] ApiError),

    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("tool execution failed: {0}")]
    Tool(#[from] ToolExecutionError),

    #[error("response {0} has no in-flight turn to cancel")]
    NothingToCancel(String),

    #[error("provider call did not complete within the configured deadline")]
    DeadlineExceeded,

    #[error("no response store is configured")]
    StoreUnavailable,

    #[error("agentic loop ended without producing a terminal lifecycle event")]
    NoTerminalEvent,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(api_err) => api_err,
            EngineError::Provider(provider_err) => provider_err.into(),
            EngineError::Store(store_err) => store_err.into(),
            EngineError::Tool(tool_err) => ApiError::server_error(tool_err.to_string()),
            EngineError::NothingToCancel(id) => {
                ApiError::not_found(format!("no in-flight turn for response `{id}`"))
                    .with_param("response_id")
            }
            EngineError::DeadlineExceeded => {
                ApiError::server_error("provider call exceeded its deadline")
            }
            EngineError::StoreUnavailable => {
                ApiError::server_error("no response store is configured").with_code("store_unavailable")
            }
            EngineError::NoTerminalEvent => {
                ApiError::server_error("agentic loop ended without a terminal event")
            }
        }
    }
}
