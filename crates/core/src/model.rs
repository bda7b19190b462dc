use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Typed scalar cell values. The service returns JSON scalars; nested values
/// are kept as their JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value. Numeric text (e.g. `"1200.50"`) parses too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Boolean(_) | FieldValue::Null => None,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Null => Ok(()),
        }
    }
}

/// One scored row of the current page.
///
/// `fields` holds every column the service returned, in response order,
/// including the score and prediction columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRow {
    pub row_id: u64,
    pub fields: IndexMap<String, FieldValue>,
    pub score: f64,
    pub is_anomaly: bool,
}

/// One page of scoring results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageResult {
    pub rows: Vec<ScoredRow>,
    pub total_rows: u64,
    pub total_pages: Option<u32>,
    pub threshold_value: Option<f64>,
}

impl PageResult {
    /// Page count as reported by the service, or derived from `total_rows`.
    pub fn page_count(&self, page_size: PageSize) -> u32 {
        match self.total_pages {
            Some(pages) => pages,
            None => self.total_rows.div_ceil(page_size.get() as u64) as u32,
        }
    }

    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.score)
    }
}

/// Rows per page. The service accepts only 20, 50 or 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageSize(u32);

impl PageSize {
    pub const ALLOWED: [u32; 3] = [20, 50, 100];

    pub fn new(size: u32) -> Result<Self, ConfigError> {
        if Self::ALLOWED.contains(&size) {
            Ok(Self(size))
        } else {
            Err(ConfigError::InvalidPageSize(size))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(20)
    }
}

impl TryFrom<u32> for PageSize {
    type Error = ConfigError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Percentile used by the service to derive the anomaly threshold.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percentile(f64);

impl Percentile {
    pub const MIN: f64 = 90.0;
    pub const MAX: f64 = 99.9;

    /// Rounded to one decimal, the precision sent on the wire.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        let rounded = (value * 10.0).round() / 10.0;
        if rounded.is_finite() && (Self::MIN..=Self::MAX).contains(&rounded) {
            Ok(Self(rounded))
        } else {
            Err(ConfigError::InvalidPercentile(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Share of rows the threshold nominally flags, in `[0, 1]`.
    pub fn nominal_rate(self) -> f64 {
        (100.0 - self.0) / 100.0
    }
}

impl Default for Percentile {
    fn default() -> Self {
        Self(95.0)
    }
}

impl TryFrom<f64> for Percentile {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentile> for f64 {
    fn from(p: Percentile) -> Self {
        p.0
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Parameters of one page request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: PageSize,
    pub percentile: Percentile,
}

impl PageQuery {
    /// Row id of the `index`-th row of this page.
    pub fn row_id(&self, index: usize) -> u64 {
        (self.page.max(1) as u64 - 1) * self.page_size.get() as u64 + index as u64 + 1
    }
}

/// A file held in memory for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
