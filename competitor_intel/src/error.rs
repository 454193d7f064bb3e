use thiserror::Error;

/// Errors that stop an analysis run outright. Everything else is recorded
/// inside the [`Report`](crate::Report).
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("home page {url} could not be acquired: {reason}")]
    AcquisitionFailed { url: String, reason: FetchFailure },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Why a single page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP {0}")]
    HttpError(u16),

    #[error("blocked by bot protection")]
    Blocked,
}

impl FetchFailure {
    /// Network-level failures worth one more attempt. HTTP statuses are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchFailure::Timeout | FetchFailure::ConnectionError(_))
    }
}

/// Why a completion request produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelFailure {
    #[error("authentication rejected by the provider")]
    AuthError,

    #[error("rate limited by the provider")]
    RateLimited,

    #[error("timed out")]
    Timeout,

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("model returned an empty completion")]
    EmptyResponse,
}

impl ModelFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelFailure::RateLimited | ModelFailure::Timeout)
    }

    /// Machine-readable name, stable across message changes.
    pub fn code(&self) -> &'static str {
        match self {
            ModelFailure::AuthError => "auth_error",
            ModelFailure::RateLimited => "rate_limited",
            ModelFailure::Timeout => "timeout",
            ModelFailure::ProviderError(_) => "provider_error",
            ModelFailure::EmptyResponse => "empty_response",
        }
    }
}
