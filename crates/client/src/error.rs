//! Scoring failure taxonomy.

use scorelens_core::{ErrorKind, ErrorRecord};

/// Structured failure reported by the scoring service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    UnreadableFile { message: String },

    /// Without a column list the service's own message is shown.
    #[error("{}", missing_columns_text(.columns, .message))]
    MissingColumns {
        columns: Vec<String>,
        message: String,
    },

    #[error("{message}")]
    ScoringFailed { message: String },

    #[error("{message}")]
    InvalidPagination { message: String },

    #[error("{message}")]
    Unknown {
        code: Option<String>,
        status: u16,
        message: String,
    },
}

impl ServiceError {
    pub const CSV_READ_FAILED: &'static str = "CSV_READ_FAILED";
    pub const MISSING_COLUMNS: &'static str = "MISSING_COLUMNS";
    pub const SCORING_FAILED: &'static str = "SCORING_FAILED";
    pub const INVALID_PAGE: &'static str = "INVALID_PAGE";
    pub const MALFORMED_RESPONSE: &'static str = "MALFORMED_RESPONSE";

    /// Map a service error code to its variant. Unrecognized codes are kept
    /// verbatim in [`ServiceError::Unknown`].
    pub fn from_code(code: &str, message: String, columns: Vec<String>, status: u16) -> Self {
        match code {
            Self::CSV_READ_FAILED => ServiceError::UnreadableFile { message },
            Self::MISSING_COLUMNS => ServiceError::MissingColumns { columns, message },
            Self::SCORING_FAILED => ServiceError::ScoringFailed { message },
            Self::INVALID_PAGE => ServiceError::InvalidPagination { message },
            other => ServiceError::Unknown {
                code: Some(other.to_string()),
                status,
                message,
            },
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ServiceError::UnreadableFile { .. } => Some(Self::CSV_READ_FAILED),
            ServiceError::MissingColumns { .. } => Some(Self::MISSING_COLUMNS),
            ServiceError::ScoringFailed { .. } => Some(Self::SCORING_FAILED),
            ServiceError::InvalidPagination { .. } => Some(Self::INVALID_PAGE),
            ServiceError::Unknown { code, .. } => code.as_deref(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::UnreadableFile { .. } => ErrorKind::UnreadableFile,
            ServiceError::MissingColumns { .. } => ErrorKind::MissingColumns,
            ServiceError::ScoringFailed { .. } => ErrorKind::ScoringFailed,
            ServiceError::InvalidPagination { .. } => ErrorKind::InvalidPagination,
            ServiceError::Unknown { .. } => ErrorKind::Unknown,
        }
    }
}

fn missing_columns_text(columns: &[String], message: &str) -> String {
    if columns.is_empty() {
        message.to_string()
    } else {
        format!("Missing required columns: {}", columns.join(", "))
    }
}

/// Errors returned by a [`crate::ScoreClient`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    /// No response reached the client.
    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl ScoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoreError::Network(_) => ErrorKind::Network,
            ScoreError::Service(e) => e.kind(),
        }
    }

    /// Session-facing record carrying the formatted message.
    pub fn to_record(&self) -> ErrorRecord {
        let message = match self {
            ScoreError::Network(msg) => format!("Could not reach the scoring service: {msg}"),
            ScoreError::Service(e) => e.to_string(),
        };
        ErrorRecord::new(self.kind(), message)
    }
}

impl From<reqwest::Error> for ScoreError {
    fn from(e: reqwest::Error) -> Self {
        ScoreError::Network(e.to_string())
    }
}
