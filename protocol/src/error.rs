use serde::Deserialize;
use serde::Serialize;

/// Typed domain error returned by validation, the engine, and provider
/// adapters. Every internal error is wrapped with call-site context and
/// classified into one of these kinds before it reaches a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    ServerError,
    InvalidRequest,
    NotFound,
    ModelError,
    TooManyRequests,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApiErrorKind::ServerError => "server_error",
            ApiErrorKind::InvalidRequest => "invalid_request",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::ModelError => "model_error",
            ApiErrorKind::TooManyRequests => "too_many_requests",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: ApiErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            param: None,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ServerError, message)
    }

    pub fn model_error(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::ModelError, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::TooManyRequests, message)
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Deterministic HTTP status mapping (spec §6). `store_unavailable` is
    /// carried as a `code` rather than its own `ApiErrorKind` since it is
    /// still, semantically, a server error — only the HTTP status it maps to
    /// differs (501 instead of 500).
    pub fn http_status(&self) -> u16 {
        if self.code.as_deref() == Some("store_unavailable") {
            return 501;
        }
        match self.kind {
            ApiErrorKind::InvalidRequest => 400,
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::TooManyRequests => 429,
            ApiErrorKind::ServerError | ApiErrorKind::ModelError => 500,
        }
    }

    /// Wraps this error in the `{"error": {...}}` envelope the wire format
    /// expects at the transport boundary.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({ "error": self })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping_is_deterministic() {
        assert_eq!(ApiError::invalid_request("x").http_status(), 400);
        assert_eq!(ApiError::not_found("x").http_status(), 404);
        assert_eq!(ApiError::too_many_requests("x").http_status(), 429);
        assert_eq!(ApiError::server_error("x").http_status(), 500);
        assert_eq!(ApiError::model_error("x").http_status(), 500);
    }

    #[test]
    fn store_unavailable_code_maps_to_501() {
        let err = ApiError::server_error("no store configured").with_code("store_unavailable");
        assert_eq!(err.http_status(), 501);
    }

    #[test]
    fn body_wraps_in_error_envelope() {
        let err = ApiError::invalid_request("bad input").with_param("model");
        let body = err.to_body();
        assert_eq!(body["error"]["type"], "invalid_request");
        assert_eq!(body["error"]["param"], "model");
        assert!(body["error"]["code"].is_null() || body["error"].get("code").is_none());
    }
}
