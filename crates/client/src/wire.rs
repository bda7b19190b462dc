//! JSON shapes of the `/score_csv` endpoint and their conversion into the
//! shared data model.

use indexmap::IndexMap;
use serde::Deserialize;

use scorelens_core::{FieldValue, PageQuery, PageResult, ScoredRow};

use crate::error::ServiceError;

/// Names of the response fields carrying score and prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub score: String,
    pub prediction: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            score: "anomaly_scored".to_string(),
            prediction: "is_anomaly".to_string(),
        }
    }
}

/// Successful `/score_csv` response body.
#[derive(Debug, Deserialize)]
pub struct ScoreResponse {
    pub data: Vec<IndexMap<String, serde_json::Value>>,
    pub meta: ResponseMeta,
    #[serde(default)]
    pub threshold: Option<ThresholdBody>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMeta {
    pub total_rows: u64,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdBody {
    pub value: f64,
}

/// Error response body: `{ "detail": string | { code, message, ... } }`.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured {
        code: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        columns: Vec<String>,
    },
    Message(String),
    Other(serde_json::Value),
}

impl ScoreResponse {
    /// Convert into a [`PageResult`], assigning page-relative row ids.
    pub fn into_page(
        self,
        query: &PageQuery,
        names: &FieldNames,
    ) -> Result<PageResult, ServiceError> {
        let mut rows = Vec::with_capacity(self.data.len());
        for (index, raw) in self.data.into_iter().enumerate() {
            let score = raw
                .get(&names.score)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| malformed(format!(
                    "row {} has no numeric '{}' field",
                    index + 1,
                    names.score
                )))?;
            let is_anomaly = raw
                .get(&names.prediction)
                .map(prediction_flag)
                .unwrap_or(false);
            let fields = raw
                .into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect();
            rows.push(ScoredRow {
                row_id: query.row_id(index),
                fields,
                score,
                is_anomaly,
            });
        }

        Ok(PageResult {
            rows,
            total_rows: self.meta.total_rows,
            total_pages: self.meta.total_pages,
            threshold_value: self.threshold.map(|t| t.value),
        })
    }
}

/// Accept `1`/`0`, booleans and their string forms.
fn prediction_flag(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true")
        }
        _ => false,
    }
}

fn malformed(message: String) -> ServiceError {
    ServiceError::Unknown {
        code: Some(ServiceError::MALFORMED_RESPONSE.to_string()),
        status: 200,
        message,
    }
}

/// Decode a successful body.
pub fn decode_page(
    body: &str,
    query: &PageQuery,
    names: &FieldNames,
) -> Result<PageResult, ServiceError> {
    let response: ScoreResponse = serde_json::from_str(body)
        .map_err(|e| malformed(format!("failed to parse scoring response: {e}")))?;
    response.into_page(query, names)
}

/// Decode a non-2xx body into a [`ServiceError`].
pub fn decode_error(status: u16, body: &str) -> ServiceError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail);

    match detail {
        Some(ErrorDetail::Structured { code, message, columns }) => {
            let message = message.unwrap_or_else(|| format!("scoring service returned {status}"));
            ServiceError::from_code(&code, message, columns, status)
        }
        Some(ErrorDetail::Message(message)) => ServiceError::Unknown {
            code: None,
            status,
            message,
        },
        Some(ErrorDetail::Other(value)) => ServiceError::Unknown {
            code: None,
            status,
            message: value
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("An error occurred.")
                .to_string(),
        },
        None => {
            let text = body.trim();
            let message = if text.is_empty() {
                format!("scoring service returned HTTP {status}")
            } else {
                format!("scoring service returned HTTP {status}: {text}")
            };
            ServiceError::Unknown {
                code: None,
                status,
                message,
            }
        }
    }
}
