use antwort_protocol::ApiError;

/// Transport/backend-facing error. `antwort-engine` classifies these into
/// `ApiError` at the boundary (`From<ProviderError> for ApiError` below),
/// same "wrap with call-site context, classify at the surface" split the
/// rest of the workspace follows.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to {provider} failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned status {status}: {body}")]
    Upstream {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} rate limited the request")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("failed to decode a response from {provider}: {message}")]
    Decode { provider: String, message: String },

    #[error("stream from {provider} stalled past the idle timeout")]
    IdleTimeout { provider: String },

    #[error("{provider} does not support {feature}")]
    Unsupported { provider: String, feature: String },

    #[error("{provider} reported the turn failed: {message}")]
    BackendFailed { provider: String, message: String },
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match &err {
            ProviderError::RateLimited { .. } => ApiError::too_many_requests(err.to_string()),
            ProviderError::Unsupported { .. } => ApiError::invalid_request(err.to_string()),
            ProviderError::Upstream { status, .. } if (400..500).contains(status) => {
                ApiError::model_error(err.to_string())
            }
            ProviderError::BackendFailed { .. } => ApiError::model_error(err.to_string()),
            ProviderError::Http { .. }
            | ProviderError::Upstream { .. }
            | ProviderError::Decode { .. }
            | ProviderError::IdleTimeout { .. } => ApiError::server_error(err.to_string()),
        }
    }
}
