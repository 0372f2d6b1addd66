// ── Unit conversion and trend encoding ──
//
// Pure functions from the provider's metric readings to the display
// scale. Rounding is half-up by truncation, so negative values round
// toward zero after the +0.5 shift (-0.25 at one decimal gives -0.2).

use thiserror::Error;

use crate::model::FieldValue;

/// hPa to inHg.
const HPA_TO_INHG: f64 = 0.029_53;

/// A raw value that cannot be converted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value}: {reason}")]
pub struct ConversionError {
    pub value: f64,
    pub reason: &'static str,
}

/// `trunc(value * 10^decimals + 0.5) / 10^decimals`.
pub fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor + 0.5).trunc() / factor
}

fn checked(raw: f64, convert: impl FnOnce(f64) -> f64) -> Result<f64, ConversionError> {
    if !raw.is_finite() {
        return Err(ConversionError {
            value: raw,
            reason: "not a finite number",
        });
    }
    let out = convert(raw);
    if out.is_finite() {
        Ok(out)
    } else {
        Err(ConversionError {
            value: raw,
            reason: "out of range",
        })
    }
}

/// Celsius to Fahrenheit, one decimal.
pub fn convert_temperature(raw: f64) -> Result<f64, ConversionError> {
    checked(raw, |c| round_half_up(c / 5.0 * 9.0 + 32.0, 1))
}

/// hPa to inHg, two decimals.
pub fn convert_pressure(raw: f64) -> Result<f64, ConversionError> {
    checked(raw, |hpa| round_half_up(hpa * HPA_TO_INHG, 2))
}

// ── Trends ───────────────────────────────────────────────────────────

/// Encoded trend indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Stable,
    Up,
    /// Any other reported direction (in practice "down").
    Other,
    /// Absent or unreadable.
    Unknown,
}

impl Trend {
    pub fn code(self) -> i64 {
        match self {
            Self::Stable => 0,
            Self::Up => 1,
            Self::Other => 2,
            Self::Unknown => 99,
        }
    }
}

/// Encode a `temp_trend` / `pressure_trend` field. Never fails.
pub fn encode_trend(value: Option<&FieldValue>) -> Trend {
    match value {
        Some(FieldValue::Text(s)) if s == "stable" => Trend::Stable,
        Some(FieldValue::Text(s)) if s == "up" => Trend::Up,
        Some(FieldValue::Text(s)) if !s.is_empty() => Trend::Other,
        _ => Trend::Unknown,
    }
}
