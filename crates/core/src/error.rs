use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration or user-supplied parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("page size must be one of 20, 50 or 100 (got {0})")]
    InvalidPageSize(u32),

    #[error("percentile must be between 90.0 and 99.9 (got {0})")]
    InvalidPercentile(f64),

    #[error("invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Failure categories surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No response reached the client.
    Network,
    UnreadableFile,
    MissingColumns,
    ScoringFailed,
    InvalidPagination,
    /// Service error with an unrecognized (or no) code.
    Unknown,
    /// Pre-upload gate failure; never reaches the network.
    ClientValidation,
}

impl ErrorKind {
    /// Whether replaying the same request can plausibly succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::ScoringFailed
                | ErrorKind::InvalidPagination
                | ErrorKind::Unknown
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "NetworkError"),
            ErrorKind::UnreadableFile => write!(f, "ServiceError.UnreadableFile"),
            ErrorKind::MissingColumns => write!(f, "ServiceError.MissingColumns"),
            ErrorKind::ScoringFailed => write!(f, "ServiceError.ScoringFailed"),
            ErrorKind::InvalidPagination => write!(f, "ServiceError.InvalidPagination"),
            ErrorKind::Unknown => write!(f, "ServiceError.Unknown"),
            ErrorKind::ClientValidation => write!(f, "ClientValidationError"),
        }
    }
}

/// A user-visible failure, as stored in session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_follows_kind() {
        assert!(ErrorRecord::new(ErrorKind::Network, "down").retryable);
        assert!(ErrorRecord::new(ErrorKind::ScoringFailed, "boom").retryable);
        assert!(!ErrorRecord::new(ErrorKind::MissingColumns, "x").retryable);
        assert!(!ErrorRecord::new(ErrorKind::UnreadableFile, "x").retryable);
        assert!(!ErrorRecord::new(ErrorKind::ClientValidation, "x").retryable);
    }
}
