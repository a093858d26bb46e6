use antwort_engine::EngineError;
use antwort_protocol::ApiError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

/// Newtype around `ApiError` so the HTTP layer can implement `IntoResponse`
/// for it without running into the orphan rule (`ApiError` lives in
/// `antwort-protocol`). Grounded on the teacher's own `ApiError` at
/// `crate::error::ApiError` in `other_examples/..._server-mod.rs.rs`'s
/// `Result<Response, ApiError>` handler signatures.
pub struct HttpError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        HttpError(err)
    }
}

impl From<EngineError> for HttpError {
    fn from(err: EngineError) -> Self {
        HttpError(err.into())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.to_body())).into_response()
    }
}
