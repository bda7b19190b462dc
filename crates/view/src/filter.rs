//! In-memory filtering of the rows on the current page.

use serde::{Deserialize, Serialize};

use scorelens_core::ScoredRow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    /// Inclusive `(low, high)` score bounds.
    pub score_range: Option<(f64, f64)>,
    pub anomalies_only: bool,
    /// Substring of the row id.
    pub id_query: Option<String>,
}

impl RowFilter {
    pub fn is_active(&self) -> bool {
        self.score_range.is_some()
            || self.anomalies_only
            || self.id_query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }

    pub fn matches(&self, row: &ScoredRow) -> bool {
        if self.anomalies_only && !row.is_anomaly {
            return false;
        }
        if let Some((low, high)) = self.score_range {
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            if !(low..=high).contains(&row.score) {
                return false;
            }
        }
        match self.id_query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => row.row_id.to_string().contains(q),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, rows: &'a [ScoredRow]) -> Vec<&'a ScoredRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}
