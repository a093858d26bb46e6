//! Provider-protocol translation layer: a backend-agnostic `Provider`
//! trait plus two concrete adapters (Chat Completions, the native
//! Responses API) that translate between Antwort's internal item/event
//! model and whatever shape a given backend actually speaks over HTTP.

mod builtin_tools;
mod chat_completions;
mod error;
mod http_retry;
mod responses_api;
mod types;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use builtin_tools::expand_builtin_tools;
pub use chat_completions::ChatCompletionsProvider;
pub use error::ProviderError;
pub use responses_api::ResponsesApiProvider;
pub use types::ModelInfo;
pub use types::ProviderCapabilities;
pub use types::ProviderEvent;
pub use types::ProviderRequest;
pub use types::ProviderResponse;

pub type ProviderEventStream =
    Pin<Box<dyn Stream<Item = Result<ProviderEvent, ProviderError>> + Send>>;

/// A backend a model turn can be dispatched to. Implementors own their own
/// HTTP client, base URL, auth, and wire-format translation; the engine
/// never sees backend-specific shapes.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Runs one non-streaming turn to completion.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Runs one turn, returning incremental events as the backend produces
    /// them. The returned stream ends after a `ProviderEvent::Completed` or
    /// an `Err`, whichever comes first.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderEventStream, ProviderError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Releases any held resources (connection pools, background tasks).
    /// Most adapters are stateless beyond a `reqwest::Client` and can no-op.
    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
