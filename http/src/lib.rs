//! The HTTP surface: an Axum router exposing the OpenResponses endpoints
//! over `antwort-engine`'s `Engine`, plus request logging and SSE framing
//! for streaming responses. Grounded on the teacher pack's
//! `other_examples/f3fbedb3_Magniquick-codex-serve__src-server-mod.rs.rs`
//! (`router`, `build_sse_stream`/`forward_sse_events`, `log_requests`).

mod error;
mod handlers;

use std::sync::Arc;

use antwort_engine::Engine;
use axum::Router;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use tower_http::trace::TraceLayer;

pub use error::HttpError;

/// Shared state every handler closes over. A thin wrapper around `Engine`
/// so the router stays decoupled from how the engine's collaborators
/// (provider, store, tool registry) were assembled.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Builds the full OpenResponses-compliant router: response lifecycle
/// endpoints, input-item listing, and model listing, wrapped in a
/// request-logging middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/responses", post(handlers::create_response).get(handlers::list_responses))
        .route("/v1/responses/{id}", get(handlers::get_response))
        .route("/v1/responses/{id}", delete(handlers::delete_response))
        .route("/v1/responses/{id}/input_items", get(handlers::list_input_items))
        .route("/v1/models", get(handlers::list_models))
        .layer(middleware::from_fn(handlers::log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
