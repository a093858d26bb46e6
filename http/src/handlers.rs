use std::convert::Infallible;
use std::time::Instant;

use antwort_engine::EngineOutcome;
use antwort_engine::ListParams;
use antwort_engine::ResponsePage;
use antwort_engine::SortOrder;
use antwort_protocol::ApiError;
use antwort_protocol::CreateResponseRequest;
use antwort_protocol::StreamEvent;
use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response as AxumResponse;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use futures::Stream;
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::AppState;
use crate::error::HttpError;

fn to_sse_event(event: &StreamEvent) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event(event.kind.type_tag())
        .json_data(event)
        .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())))
}

/// `POST /v1/responses`. Dispatches through the engine and branches on
/// whether the caller asked for `stream: true`: a non-streaming request
/// returns a plain JSON `Response`; a streaming one returns an SSE body
/// framed the way the teacher's `build_sse_stream`/`chunk_event`/
/// `done_event` trio does, ending in a `[DONE]` sentinel frame.
pub async fn create_response(
    State(state): State<AppState>,
    Json(request): Json<CreateResponseRequest>,
) -> Result<AxumResponse, HttpError> {
    match state.engine.create_response(request).await? {
        EngineOutcome::Complete(response) => Ok(Json(response).into_response()),
        EngineOutcome::Streaming(stream) => {
            let body = stream
                .map(|event| to_sse_event(&event))
                .chain(futures::stream::once(async { Ok(Event::default().data("[DONE]")) }));
            let body: BoxEventStream = Box::pin(body);
            Ok(Sse::new(body).keep_alive(KeepAlive::default()).into_response())
        }
    }
}

type BoxEventStream = std::pin::Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

#[derive(Deserialize)]
pub struct ListResponsesQuery {
    after: Option<String>,
    before: Option<String>,
    model: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
}

/// `GET /v1/responses`. `after`/`before` are resolved against the store's
/// own cursor semantics; mutual exclusivity is enforced by the engine.
pub async fn list_responses(
    State(state): State<AppState>,
    Query(query): Query<ListResponsesQuery>,
) -> Result<Json<ResponsePage>, HttpError> {
    let order = match query.order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };
    let params = ListParams {
        limit: query.limit.unwrap_or(20),
        after: query.after,
        before: query.before,
        model: query.model,
        order,
    };
    Ok(Json(state.engine.list_responses(params).await?))
}

pub async fn get_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<antwort_protocol::Response>, HttpError> {
    Ok(Json(state.engine.get_response(&id).await?))
}

#[derive(Serialize)]
struct DeletedResponse {
    id: String,
    object: &'static str,
    deleted: bool,
}

pub async fn delete_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<AxumResponse, HttpError> {
    // An in-flight turn takes priority: cancelling it is the meaningful
    // action, and there is no stored record yet to report on.
    if state.engine.cancel(&id).is_ok() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let deleted = state.engine.delete_response(&id).await?;
    if !deleted {
        return Err(
            ApiError::not_found(format!("no response with id `{id}`"))
                .with_param("response_id")
                .into(),
        );
    }
    Ok(Json(DeletedResponse {
        id,
        object: "response.deleted",
        deleted,
    })
    .into_response())
}

pub async fn list_input_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let items = state.engine.list_input_items(&id).await?;
    Ok(Json(json!({ "object": "list", "data": items })))
}

#[derive(Serialize)]
struct ModelEntry {
    id: String,
    object: &'static str,
    owned_by: String,
}

pub async fn list_models(State(state): State<AppState>) -> Result<Json<serde_json::Value>, HttpError> {
    let models = state.engine.list_models().await?;
    let data: Vec<ModelEntry> = models
        .into_iter()
        .map(|m| ModelEntry {
            id: m.id,
            object: "model",
            owned_by: m.owned_by,
        })
        .collect();
    Ok(Json(json!({ "object": "list", "data": data })))
}

/// Logs method, path, status, and latency for every request, in the style
/// of the teacher's `log_requests` middleware.
pub async fn log_requests(request: Request, next: Next) -> AxumResponse {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        tracing::error!(%method, %path, %status, elapsed_ms, "request failed");
    } else {
        tracing::info!(%method, %path, %status, elapsed_ms, "request handled");
    }
    response
}
