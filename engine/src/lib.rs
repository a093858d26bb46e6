//! The agentic request engine: configuration, the tool executor registry,
//! the persistence seam (`ResponseStore`), in-flight cancellation, and the
//! `Engine` itself, which drives validated requests through a multi-turn
//! tool-calling loop and emits the OpenResponses lifecycle event sequence.

mod cancellation;
mod config;
mod engine;
mod error;
mod registry;
mod store;

pub use cancellation::CancellationRegistry;
pub use config::GatewayConfig;
pub use config::GatewayConfigBuilder;
pub use engine::Engine;
pub use engine::EngineOutcome;
pub use engine::ResponsePage;
pub use error::EngineError;
pub use registry::PendingToolCall;
pub use registry::ToolExecutionError;
pub use registry::ToolExecutor;
pub use registry::ToolExecutorRegistry;
pub use registry::ToolKind;
pub use store::ListParams;
pub use store::ResponseStore;
pub use store::SortOrder;
pub use store::StoreError;
