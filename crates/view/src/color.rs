//! Score → colour/severity mapping.
//!
//! Scores are log-compressed, normalized against the running range, bent by
//! a `t^0.75` gamma and mapped onto the green (120°) → red (0°) hue arc.

use serde::{Deserialize, Serialize};

use crate::range::RangeState;

/// Gamma applied to the normalized position.
pub const GAMMA: f64 = 0.75;
/// Hue at the low end of the scale (green).
pub const HUE_LOW: f64 = 120.0;
pub const SATURATION: u8 = 85;
pub const LIGHTNESS: u8 = 50;

/// Coarse classification used in summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_position(t: f64) -> Self {
        if t < 0.33 {
            Severity::Low
        } else if t < 0.66 {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Opaque colour handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColorToken {
    /// No range known yet.
    Neutral,
    Hsl { hue: f64, saturation: u8, lightness: u8 },
}

impl ColorToken {
    pub fn hue(&self) -> Option<f64> {
        match self {
            ColorToken::Neutral => None,
            ColorToken::Hsl { hue, .. } => Some(*hue),
        }
    }

    /// CSS colour string (`#fff` or `hsl(h, s%, l%)`).
    pub fn css(&self) -> String {
        match self {
            ColorToken::Neutral => "#fff".to_string(),
            ColorToken::Hsl { hue, saturation, lightness } => {
                format!("hsl({hue}, {saturation}%, {lightness}%)")
            }
        }
    }

    /// 8-bit RGB, for renderers without HSL support.
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        match *self {
            ColorToken::Neutral => (255, 255, 255),
            ColorToken::Hsl { hue, saturation, lightness } => {
                hsl_to_rgb(hue, saturation as f64 / 100.0, lightness as f64 / 100.0)
            }
        }
    }
}

/// Result of [`color_for`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreColor {
    pub severity: Severity,
    pub token: ColorToken,
}

/// Log-scaled position of `score` within `range`, in `[0, 1]` (before gamma).
/// `None` while the range is unset.
pub fn normalized(score: f64, range: &RangeState) -> Option<f64> {
    let (min, max) = range.bounds()?;
    let log_score = (score + 1.0).ln();
    let log_min = (min + 1.0).ln();
    let log_max = (max + 1.0).ln();

    let t = (log_score - log_min) / (log_max - log_min).max(f64::EPSILON);
    if t.is_finite() {
        Some(t.clamp(0.0, 1.0))
    } else {
        Some(0.0)
    }
}

/// Map a raw score to its colour and severity. Pure; same inputs give the
/// same output.
pub fn color_for(score: f64, range: &RangeState) -> ScoreColor {
    let Some(t) = normalized(score, range) else {
        return ScoreColor {
            severity: Severity::Low,
            token: ColorToken::Neutral,
        };
    };

    let t = t.powf(GAMMA);
    ScoreColor {
        severity: Severity::from_position(t),
        token: ColorToken::Hsl {
            hue: HUE_LOW * (1.0 - t),
            saturation: SATURATION,
            lightness: LIGHTNESS,
        },
    }
}

fn hsl_to_rgb(hue: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = (hue.rem_euclid(360.0)) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
