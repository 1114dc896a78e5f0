//! Percentage arithmetic shared by the API and the terminal view.
//!
//! A zero (or negative) denominator has no meaningful percentage, so
//! [`percentage`] returns `None` for it. The API serialises `None` as `0.0`
//! through [`percentage_or_zero`]; the terminal view renders it as `N/A`
//! through [`format_percentage`].

/// `part / whole * 100`, or `None` when `whole` is not positive.
pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    if whole > 0.0 && whole.is_finite() && part.is_finite() {
        Some(part / whole * 100.0)
    } else {
        None
    }
}

pub fn percentage_or_zero(part: f64, whole: f64) -> f64 {
    percentage(part, whole).unwrap_or(0.0)
}

/// Arithmetic mean, `None` for an empty sample.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "N/A".to_string(),
    }
}
