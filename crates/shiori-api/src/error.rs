use thiserror::Error;

/// Errors from any manga backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session is missing or was rejected. The stored token has already
    /// been cleared when this is returned.
    #[error("unauthorized")]
    Unauthorized,

    /// The backend has no equivalent for the requested operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub(crate) fn not_supported(reason: impl Into<String>) -> Self {
        Self::NotSupported(reason.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}
