use antwort_protocol::ApiError;
use antwort_protocol::Item;
use antwort_protocol::Response;
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("response {0} was not found")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => {
                ApiError::not_found(format!("no response with id `{id}`")).with_param("response_id")
            }
            StoreError::Backend(message) => ApiError::server_error(message),
        }
    }
}

/// Sort order for `ResponseStore::list`. Defaults to `Desc` (newest first),
/// matching the endpoint's own default (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for `ResponseStore::list`. `after`/`before` are mutually
/// exclusive cursors — the engine rejects a request carrying both before
/// it ever reaches the store.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub limit: usize,
    pub after: Option<String>,
    pub before: Option<String>,
    pub model: Option<String>,
    pub order: SortOrder,
}

/// Persistence seam for stored (`store: true`) responses. Concrete adapters
/// (`antwort-store-memory`, or a caller's own database-backed
/// implementation) are external collaborators; the engine only knows this
/// trait. `antwort-http`'s `GET`/`DELETE` surfaces return an `ApiError`
/// classified as a server error with a `store_unavailable` code when no
/// store is configured at all (spec: "nil-safe").
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// `input_items` is the request's own `input` array (not the full
    /// reconstructed chain) — `get_input_items` echoes exactly this back.
    async fn save(&self, response: Response, input_items: Vec<Item>) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Response, StoreError>;

    /// Walks the `previous_response_id` chain starting at `id`, returning
    /// responses oldest-first (the root of the chain comes first).
    async fn get_for_chain(&self, id: &str) -> Result<Vec<Response>, StoreError>;

    /// Returns `true` if a response with this id existed and was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Returns one page of stored responses matching `params`, plus whether
    /// any further page exists.
    async fn list(&self, params: ListParams) -> Result<(Vec<Response>, bool), StoreError>;

    async fn get_input_items(&self, id: &str) -> Result<Vec<Item>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
