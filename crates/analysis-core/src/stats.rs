//! Small numeric helpers shared by the analysis crates.
//!
//! Everything here returns `None` instead of NaN/inf so callers can store the
//! result straight into an optional metric field.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two points.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let m = mean(data)?;
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Division that refuses missing, zero, or non-finite denominators.
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let num = numerator?;
    let den = denominator?;
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return None;
    }
    let value = num / den;
    value.is_finite().then_some(value)
}

/// Percentage change from `previous` to `current`.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    safe_div(Some(current - previous), Some(previous)).map(|r| r * 100.0)
}

/// Simple period-over-period returns (`p[i] / p[i-1] - 1`), skipping zero bases.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| safe_div(Some(w[1] - w[0]), Some(w[0])))
        .collect()
}

/// Largest peak-to-trough decline as a positive percentage.
pub fn max_drawdown_pct(values: &[f64]) -> Option<f64> {
    let mut peak = *values.first()?;
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            worst = worst.max((peak - v) / peak);
        }
    }
    Some(worst * 100.0)
}
