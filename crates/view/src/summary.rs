//! Per-page aggregates: counts, anomaly rate, severity mix and a histogram.

use serde::{Deserialize, Serialize};

use scorelens_core::{Percentile, ScoredRow};

use crate::color::{color_for, Severity};
use crate::range::RangeState;

pub const DEFAULT_BINS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityCounts {
    fn bump(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub rows: usize,
    pub anomalies: usize,
    pub normal: usize,
    /// Flagged rows over rows on this page; 0 for an empty page.
    pub flagged_ratio: f64,
    /// Share of rows the percentile is expected to flag.
    pub nominal_rate: f64,
    pub severity: SeverityCounts,
}

pub fn summarize(rows: &[ScoredRow], range: &RangeState, percentile: Percentile) -> PageSummary {
    let anomalies = rows.iter().filter(|r| r.is_anomaly).count();
    let mut severity = SeverityCounts::default();
    for row in rows {
        severity.bump(color_for(row.score, range).severity);
    }

    PageSummary {
        rows: rows.len(),
        anomalies,
        normal: rows.len() - anomalies,
        flagged_ratio: if rows.is_empty() {
            0.0
        } else {
            anomalies as f64 / rows.len() as f64
        },
        nominal_rate: percentile.nominal_rate(),
        severity,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
    pub count: usize,
}

/// Equal-width bins spanning the observed range. The last bin is closed on
/// both ends; scores outside the range land in the nearest edge bin.
/// Empty while the range is unset.
pub fn histogram(rows: &[ScoredRow], range: &RangeState, bins: usize) -> Vec<HistogramBin> {
    let Some((min, max)) = range.bounds() else {
        return Vec::new();
    };
    let bins = if max > min { bins.max(1) } else { 1 };
    let width = (max - min) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| {
            let lower = min + width * i as f64;
            let upper = if i + 1 == bins { max } else { min + width * (i + 1) as f64 };
            HistogramBin {
                lower,
                upper,
                label: format!("{lower:.3}..{upper:.3}"),
                count: 0,
            }
        })
        .collect();

    for score in rows.iter().map(|r| r.score).filter(|s| s.is_finite()) {
        let idx = if width > 0.0 {
            ((score - min) / width).floor().clamp(0.0, (bins - 1) as f64) as usize
        } else {
            0
        };
        out[idx].count += 1;
    }
    out
}
