use crate::error::{ChartError, Result};
use crate::schema::LineItem;
use std::collections::HashSet;

const MAGNITUDE_SUFFIXES: [(f64, &str); 4] = [(1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

/// Formats a value with a K/M/B/T suffix chosen at powers of 1000.
///
/// # Examples
/// - `format_magnitude(205_500_000_000.0, 1)` -> `"205.5B"`
/// - `format_magnitude(999_999.0, 1)` -> `"1.0M"` (rounding promotes the suffix)
/// - `format_magnitude(950.0, 1)` -> `"950"`
pub fn format_magnitude(value: f64, decimals: usize) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    let mut unit = MAGNITUDE_SUFFIXES.iter().rposition(|&(threshold, _)| abs >= threshold);

    // A value that rounds to 1000 of one unit is shown in the next one.
    loop {
        let scaled = unit.map_or(abs, |i| abs / MAGNITUDE_SUFFIXES[i].0);
        let next = unit.map_or(Some(0), |i| (i + 1 < MAGNITUDE_SUFFIXES.len()).then_some(i + 1));
        match next {
            Some(next) if round_to(scaled, decimals) >= 1000.0 => unit = Some(next),
            _ => break,
        }
    }

    match unit {
        Some(i) => {
            let (threshold, suffix) = MAGNITUDE_SUFFIXES[i];
            format!("{}{:.*}{}", sign, decimals, abs / threshold, suffix)
        }
        None if abs.fract() == 0.0 => format!("{}{:.0}", sign, abs),
        None => format!("{}{:.*}", sign, decimals, abs),
    }
}

/// `format_magnitude` with a currency symbol placed after the sign.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let formatted = format_magnitude(value, 1);
    match formatted.strip_prefix('-') {
        Some(rest) => format!("-{}{}", symbol, rest),
        None => format!("{}{}", symbol, formatted),
    }
}

/// Signed percentage label, e.g. `"+5.0%"` / `"-3.2%"`.
pub fn format_percent(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.1}%", sign, value)
}

/// Period-over-period growth in percent. `None` when the previous value is
/// zero; negative bases are measured against their magnitude.
pub fn growth_rate(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous.abs() * 100.0)
}

pub fn sum_amounts(items: &[LineItem]) -> f64 {
    items.iter().map(|item| item.amount).sum()
}

const NEGLIGIBLE_RATIO: f64 = 1e-9;

/// Snaps `value` to zero when it is within floating-point noise of zero,
/// measured relative to `scale` (at least 1.0).
///
/// `0.3 - 0.1 - 0.2` is `-5.55e-17`, not a loss.
pub fn snap_negligible(value: f64, scale: f64) -> f64 {
    if value.abs() <= NEGLIGIBLE_RATIO * scale.abs().max(1.0) {
        0.0
    } else {
        value
    }
}

/// Quotes a CSV field when it contains a delimiter, quote or line break.
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub(crate) fn validate_label(context: &str, label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(ChartError::input_shape(context, "labels must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_amount(context: &str, label: &str, amount: f64) -> Result<()> {
    if !amount.is_finite() {
        return Err(ChartError::input_shape(
            context,
            format!("amount for '{}' is not a finite number ({})", label, amount),
        ));
    }
    Ok(())
}

pub(crate) fn validate_non_negative(context: &str, label: &str, amount: f64) -> Result<()> {
    validate_amount(context, label, amount)?;
    if amount < 0.0 {
        return Err(ChartError::input_shape(
            context,
            format!("amount for '{}' must be non-negative, got {}", label, amount),
        ));
    }
    Ok(())
}

/// Rejects the first label that appears twice.
pub(crate) fn validate_unique_labels<'a>(
    context: &str,
    labels: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(ChartError::input_shape(
                context,
                format!("label '{}' is used more than once", label),
            ));
        }
    }
    Ok(())
}
