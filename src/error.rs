use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReorderError>;

/// Every failure the library reports back to its caller.
///
/// Remote failures are translated into these variants at the client boundary
/// (`api::spotify`), so nothing above it inspects status codes or JSON bodies.
#[derive(Error, Debug)]
pub enum ReorderError {
    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success response with a structured or textual error body.
    #[error("remote api error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    #[error("no playlist matching name {name}")]
    NotFound { name: String },

    /// The playlist snapshot supplied with a write is no longer current.
    #[error("stale snapshot rejected: {message}")]
    ConcurrencyConflict { message: String },

    #[error("rate limited (retry_after={retry_after:?})")]
    RateLimited { retry_after: Option<u64> },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A retried step ran out of attempts. `index` is the position where work stopped.
    #[error("unable to {operation} at index {index} after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        index: usize,
        attempts: u32,
        #[source]
        source: Box<ReorderError>,
    },

    /// A step failed with an error a reissue cannot fix. `index` is the position where work stopped.
    #[error("{operation} stopped at index {index}: {source}")]
    Stalled {
        operation: String,
        index: usize,
        #[source]
        source: Box<ReorderError>,
    },
}

impl ReorderError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Whether a retry loop may reissue the failed request.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ReorderError::NotFound { .. }
                | ReorderError::Auth(_)
                | ReorderError::Config(_)
                | ReorderError::RetryExhausted { .. }
                | ReorderError::Stalled { .. }
        )
    }

    /// Index carried by a `RetryExhausted` or `Stalled` error.
    pub fn stalled_index(&self) -> Option<usize> {
        match self {
            ReorderError::RetryExhausted { index, .. } | ReorderError::Stalled { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The error as the service reported it, below any index wrapper.
    pub fn cause(&self) -> &ReorderError {
        match self {
            ReorderError::RetryExhausted { source, .. } | ReorderError::Stalled { source, .. } => source.cause(),
            other => other,
        }
    }
}

impl From<reqwest::Error> for ReorderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReorderError::Decode(err.to_string())
        } else {
            ReorderError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReorderError {
    fn from(err: serde_json::Error) -> Self {
        ReorderError::Decode(err.to_string())
    }
}
