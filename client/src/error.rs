use std::fmt;

use crate::location::LocationError;
use crate::utils::storage::StorageError;

/// Errors surfaced by the client core. Every variant is recoverable: callers
/// turn it into a [`Notice`] and keep the app running.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned invalid response")]
    MalformedResponse { status: u16, detail: String },

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("No authentication token found")]
    NotAuthenticated,

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Validation(String),

    #[error("You don't have admin privileges")]
    AccessDenied,

    #[error("{0}")]
    Biometric(String),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(status: u16, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            status,
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code, matching the codes the server uses in
    /// its own error bodies where they overlap.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "REQUEST_FAILED",
            ClientError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            ClientError::Rejected { .. } => "REJECTED",
            ClientError::NotAuthenticated => "UNAUTHORIZED",
            ClientError::Precondition(_) => "PRECONDITION_FAILED",
            ClientError::Validation(_) => "VALIDATION_ERROR",
            ClientError::AccessDenied => "FORBIDDEN",
            ClientError::Biometric(_) => "BIOMETRIC_FAILED",
            ClientError::Location(err) => err.code(),
            ClientError::Storage(_) => "STORAGE_ERROR",
            ClientError::Io(_) => "IO_ERROR",
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            ClientError::Network(_) => Notice::error("Network error"),
            ClientError::AccessDenied => Notice::new("Access Denied", self.to_string()),
            ClientError::Location(err) => err.notice(),
            _ => Notice::error(self.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

/// A blocking alert or transient toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("Success", message)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}
