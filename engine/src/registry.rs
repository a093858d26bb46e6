use std::sync::Arc;

use antwort_protocol::Item;
use antwort_protocol::ItemPayload;
use antwort_protocol::ItemStatus;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Builtin,
    Mcp,
    Function,
}

#[derive(Debug, Clone)]
pub struct PendingToolCall {
    pub name: String,
    pub call_id: String,
    pub arguments: String,
}

/// A concrete tool backend: built-in (`code_interpreter`/`file_search`/
/// `web_search_preview`), an MCP server, or a caller-registered function.
/// Concrete executors (actually running a sandboxed interpreter, calling
/// out to an MCP server, etc.) are explicitly external collaborators the
/// core does not implement; this trait is the seam they plug into.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Whether this executor owns the given tool name. The registry asks
    /// executors in registration order and dispatches to the first match.
    fn handles(&self, name: &str) -> bool;

    async fn execute(&self, call: &PendingToolCall) -> Result<String, ToolExecutionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolExecutionError {
    #[error("{0}")]
    Failed(String),
}

/// Ordered, first-match-wins collection of `ToolExecutor`s. Dispatch runs
/// each call on its own `tokio::spawn`ed task so a panicking executor
/// cannot take the rest of the turn (or the engine) down with it; a
/// provider failure is never given this treatment; only tool execution is.
#[derive(Default)]
pub struct ToolExecutorRegistry {
    executors: Vec<Arc<dyn ToolExecutor>>,
}

impl ToolExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) {
        if let Some(existing) = self.executors.iter().find(|e| e.kind() == executor.kind()) {
            tracing::debug!(
                kind = ?executor.kind(),
                existing_kind = ?existing.kind(),
                "registering another executor of the same kind; first-match-wins at dispatch time"
            );
        }
        self.executors.push(executor);
    }

    fn find(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.executors.iter().find(|e| e.handles(name)).cloned()
    }

    async fn dispatch_one(&self, call: PendingToolCall) -> Item {
        let Some(executor) = self.find(&call.name) else {
            return error_output(&call, format!("no tool executor registered for `{}`", call.name));
        };

        let call_for_task = call.clone();
        let joined = tokio::spawn(async move { executor.execute(&call_for_task).await }).await;

        match joined {
            Ok(Ok(output)) => Item::new(
                antwort_protocol::new_item_id(),
                ItemStatus::Completed,
                ItemPayload::FunctionCallOutput {
                    call_id: call.call_id,
                    output,
                },
            ),
            Ok(Err(ToolExecutionError::Failed(message))) => error_output(&call, message),
            Err(join_err) if join_err.is_panic() => {
                tracing::warn!(tool = %call.name, call_id = %call.call_id, "tool executor panicked");
                error_output(&call, "tool executor panicked".to_string())
            }
            Err(join_err) => error_output(&call, join_err.to_string()),
        }
    }

    /// Runs every call concurrently. Used when `parallel_tool_calls: true`.
    pub async fn dispatch_parallel(&self, calls: Vec<PendingToolCall>) -> Vec<Item> {
        let futures = calls.into_iter().map(|call| self.dispatch_one(call));
        futures::future::join_all(futures).await
    }

    /// Runs calls one at a time, in order. Used when `parallel_tool_calls:
    /// false` — scoped to calls within a single turn, never across turns
    /// (Open Question 3).
    pub async fn dispatch_sequential(&self, calls: Vec<PendingToolCall>) -> Vec<Item> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(self.dispatch_one(call).await);
        }
        outputs
    }
}

fn error_output(call: &PendingToolCall, message: String) -> Item {
    let output = json!({ "error": message }).to_string();
    Item::new(
        antwort_protocol::new_item_id(),
        ItemStatus::Completed,
        ItemPayload::FunctionCallOutput {
            call_id: call.call_id.clone(),
            output,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl ToolExecutor for EchoTool {
        fn kind(&self) -> ToolKind {
            ToolKind::Function
        }

        fn handles(&self, name: &str) -> bool {
            name == "echo"
        }

        async fn execute(&self, call: &PendingToolCall) -> Result<String, ToolExecutionError> {
            Ok(call.arguments.clone())
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl ToolExecutor for PanickingTool {
        fn kind(&self) -> ToolKind {
            ToolKind::Function
        }

        fn handles(&self, name: &str) -> bool {
            name == "boom"
        }

        async fn execute(&self, _call: &PendingToolCall) -> Result<String, ToolExecutionError> {
            panic!("kaboom");
        }
    }

    #[tokio::test]
    async fn dispatches_to_the_matching_executor() {
        let mut registry = ToolExecutorRegistry::new();
        registry.register(Arc::new(EchoTool));
        let outputs = registry
            .dispatch_parallel(vec![PendingToolCall {
                name: "echo".into(),
                call_id: "call_1".into(),
                arguments: "hello".into(),
            }])
            .await;
        match &outputs[0].payload {
            ItemPayload::FunctionCallOutput { output, call_id } => {
                assert_eq!(output, "hello");
                assert_eq!(call_id, "call_1");
            }
            other => panic!("expected function_call_output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregistered_tool_produces_an_error_output() {
        let registry = ToolExecutorRegistry::new();
        let outputs = registry
            .dispatch_sequential(vec![PendingToolCall {
                name: "missing".into(),
                call_id: "call_1".into(),
                arguments: "{}".into(),
            }])
            .await;
        match &outputs[0].payload {
            ItemPayload::FunctionCallOutput { output, .. } => {
                assert!(output.contains("no tool executor registered"));
            }
            other => panic!("expected function_call_output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_executor_does_not_crash_dispatch() {
        let mut registry = ToolExecutorRegistry::new();
        registry.register(Arc::new(PanickingTool));
        let outputs = registry
            .dispatch_parallel(vec![PendingToolCall {
                name: "boom".into(),
                call_id: "call_1".into(),
                arguments: "{}".into(),
            }])
            .await;
        match &outputs[0].payload {
            ItemPayload::FunctionCallOutput { output, .. } => {
                assert!(output.contains("panicked"));
            }
            other => panic!("expected function_call_output, got {other:?}"),
        }
    }
}
