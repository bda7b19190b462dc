//! Display columns derived from the first page of a result set.
//!
//! Columns are inferred once per file from a fixed set of field-name rules.
//! The caller caches the result; later pages never re-derive it.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use scorelens_core::{FieldValue, ScoredRow};

/// Field name of the synthetic leading row-number column.
pub const ROW_ID_FIELD: &str = "row_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderKind {
    Plain,
    NumericFormatted,
    ScoreBadge,
    PredictionChip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    pub display_name: String,
    pub render_kind: RenderKind,
}

/// Field-name rules used by [`infer_columns`].
#[derive(Debug, Clone)]
pub struct SchemaRules {
    pub score_field: String,
    pub prediction_field: String,
    /// Exact (case-insensitive) names of currency columns.
    pub currency_fields: Vec<String>,
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self {
            score_field: "anomaly_scored".to_string(),
            prediction_field: "is_anomaly".to_string(),
            currency_fields: vec!["DMBTR".to_string(), "WRBTR".to_string()],
        }
    }
}

impl SchemaRules {
    pub fn new(score_field: impl Into<String>, prediction_field: impl Into<String>) -> Self {
        Self {
            score_field: score_field.into(),
            prediction_field: prediction_field.into(),
            ..Self::default()
        }
    }

    fn is_currency(&self, field: &str) -> bool {
        self.currency_fields.iter().any(|c| c.eq_ignore_ascii_case(field))
            || field.to_ascii_lowercase().contains("amount")
    }

    fn column_for(&self, field: &str) -> ColumnSpec {
        let (display_name, render_kind) = if field == self.score_field {
            ("Anomaly Score".to_string(), RenderKind::ScoreBadge)
        } else if field == self.prediction_field {
            ("Prediction".to_string(), RenderKind::PredictionChip)
        } else if self.is_currency(field) {
            (display_name(field), RenderKind::NumericFormatted)
        } else {
            (display_name(field), RenderKind::Plain)
        };
        ColumnSpec {
            field: field.to_string(),
            display_name,
            render_kind,
        }
    }
}

fn display_name(field: &str) -> String {
    match field {
        "BELNR" => "Document Number".to_string(),
        "DMBTR" => "Amount (Local)".to_string(),
        "WRBTR" => "Amount (Document)".to_string(),
        other => other.to_string(),
    }
}

/// Infer the column set from the first page of a new file.
///
/// The row number comes first, followed by every field in order of first
/// appearance across the page.
pub fn infer_columns(first_page: &[ScoredRow], rules: &SchemaRules) -> Vec<ColumnSpec> {
    let fields: IndexSet<&str> = first_page
        .iter()
        .flat_map(|row| row.fields.keys().map(String::as_str))
        .filter(|f| *f != ROW_ID_FIELD)
        .collect();

    let mut columns = Vec::with_capacity(fields.len() + 1);
    columns.push(ColumnSpec {
        field: ROW_ID_FIELD.to_string(),
        display_name: "#".to_string(),
        render_kind: RenderKind::Plain,
    });
    columns.extend(fields.into_iter().map(|f| rules.column_for(f)));
    columns
}

/// Text of one cell. Fields missing from `row` render empty.
pub fn format_cell(column: &ColumnSpec, row: &ScoredRow) -> String {
    if column.field == ROW_ID_FIELD {
        return row.row_id.to_string();
    }
    match column.render_kind {
        RenderKind::ScoreBadge => format!("{:.4}", row.score),
        RenderKind::PredictionChip => {
            let label = if row.is_anomaly { "Anomaly" } else { "Normal" };
            label.to_string()
        }
        RenderKind::NumericFormatted => match row.fields.get(&column.field) {
            Some(value) => match value.as_f64() {
                Some(v) => thousands(v),
                None => value.to_string(),
            },
            None => String::new(),
        },
        RenderKind::Plain => row
            .fields
            .get(&column.field)
            .map(FieldValue::to_string)
            .unwrap_or_default(),
    }
}

/// `1234567.891` → `1,234,567.89`.
pub fn thousands(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && !text.trim_matches(|c| c == '0' || c == '.').is_empty() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}
