//! User-facing wording for an [`ErrorRecord`].

use serde::{Deserialize, Serialize};

use scorelens_core::{ErrorKind, ErrorRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub description: String,
    pub hint: String,
}

pub fn present(error: &ErrorRecord) -> ErrorPresentation {
    let (title, hint) = match error.kind {
        ErrorKind::UnreadableFile => (
            "Unreadable CSV File",
            "Upload a valid UTF-8 encoded CSV file.",
        ),
        ErrorKind::MissingColumns => (
            "Invalid CSV Schema",
            "Ensure the CSV follows SAP transaction schema.",
        ),
        ErrorKind::ScoringFailed => (
            "Model Execution Error",
            "The anomaly detection model failed to process this file.",
        ),
        ErrorKind::InvalidPagination => (
            "Pagination Error",
            "Go back to the first page and try again.",
        ),
        ErrorKind::Unknown => ("Processing Error", "Please retry."),
        ErrorKind::Network => (
            "Network Error",
            "Check that the scoring service is running, then retry.",
        ),
        ErrorKind::ClientValidation => (
            "Invalid File",
            "Choose a CSV file that includes every required column.",
        ),
    };

    let description = if error.message.trim().is_empty() {
        "An error occurred.".to_string()
    } else {
        error.message.clone()
    };

    ErrorPresentation {
        title: title.to_string(),
        description,
        hint: hint.to_string(),
    }
}
