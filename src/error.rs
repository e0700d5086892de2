use thiserror::Error;

/// Errors raised while fetching a student profile from the backend.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("student {0} not found")]
    NotFound(i64),

    #[error("backend error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid profile payload: {0}")]
    Decode(String),
}
