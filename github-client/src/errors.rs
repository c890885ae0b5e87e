//! Crate-wide error hierarchy for github-client.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GithubResult<T> = Result<T, GithubError>;

/// Root error type for the github-client crate.
#[derive(Debug, Error)]
pub enum GithubError {
    /// API (REST/GraphQL) related failure.
    #[error(transparent)]
    Api(#[from] GithubApiError),

    /// Input validation errors (bad IDs, unsupported formats, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// API-level error used inside the client layer.
#[derive(Debug, Error)]
pub enum GithubApiError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of an API response, including GraphQL-level
    /// errors delivered with HTTP 200.
    #[error("invalid api response: {0}")]
    InvalidResponse(String),
}

// ===== Conversions for `?` ergonomics at the crate root =====

impl From<reqwest::Error> for GithubError {
    fn from(e: reqwest::Error) -> Self {
        GithubError::Api(GithubApiError::from(e))
    }
}

// ===== Mapping from reqwest::Error into GithubApiError =====

impl From<reqwest::Error> for GithubApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GithubApiError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => GithubApiError::Unauthorized,
                403 => GithubApiError::Forbidden,
                404 => GithubApiError::NotFound,
                429 => GithubApiError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => GithubApiError::Server(code),
                _ => GithubApiError::HttpStatus(code),
            };
        }

        GithubApiError::Network(e.to_string())
    }
}
