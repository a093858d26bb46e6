use std::sync::Arc;

use antwort_engine::Engine;
use antwort_engine::GatewayConfig;
use antwort_engine::ToolExecutorRegistry;
use antwort_http::AppState;
use antwort_provider::ChatCompletionsProvider;
use antwort_provider::ResponsesApiProvider;
use antwort_provider::Provider;
use antwort_store_memory::MemoryResponseStore;
use clap::Parser;
use clap::ValueEnum;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum BackendProtocol {
    ChatCompletions,
    ResponsesApi,
}

/// Antwort: an OpenResponses-compliant API gateway fronting a single
/// upstream model provider.
#[derive(Parser, Debug)]
#[command(name = "antwort-http", version, about)]
struct Cli {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "ANTWORT_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Which upstream wire protocol to translate into.
    #[arg(long, value_enum, env = "ANTWORT_BACKEND", default_value = "chat-completions")]
    backend: BackendProtocol,

    /// Upstream provider name, surfaced in `GET /v1/models`.
    #[arg(long, env = "ANTWORT_PROVIDER_NAME", default_value = "upstream")]
    provider_name: String,

    /// Upstream base URL (e.g. `https://api.openai.com`).
    #[arg(long, env = "ANTWORT_BASE_URL")]
    base_url: String,

    /// Upstream API key.
    #[arg(long, env = "ANTWORT_API_KEY")]
    api_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let provider: Arc<dyn Provider> = match cli.backend {
        BackendProtocol::ChatCompletions => Arc::new(ChatCompletionsProvider::new(
            cli.provider_name.clone(),
            cli.base_url.clone(),
            cli.api_key.clone(),
        )),
        BackendProtocol::ResponsesApi => Arc::new(ResponsesApiProvider::new(
            cli.provider_name.clone(),
            cli.base_url.clone(),
            cli.api_key.clone(),
        )),
    };

    let store = Arc::new(MemoryResponseStore::new());
    let tool_registry = Arc::new(ToolExecutorRegistry::new());
    let engine = Arc::new(Engine::new(GatewayConfig::default(), provider, Some(store), tool_registry));

    let state = AppState { engine };
    let app = antwort_http::router(state);

    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!(bind = %cli.bind, backend = ?cli.backend, "antwort-http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
