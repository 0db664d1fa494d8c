//! Rolling indicators over a close (or volume) column.
//!
//! Every function returns only the defined values: the first element belongs
//! to the earliest index where the indicator has enough history, the last to
//! the newest input. An input too short for the window gives an empty vector.

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    data.windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Exponential Moving Average, seeded with the SMA of the first `period` values.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &value in &data[period..] {
        prev = (value - prev) * multiplier + prev;
        result.push(prev);
    }

    result
}

/// Relative Strength Index using simple rolling means of gains and losses.
///
/// Needs `period + 1` points. A window with no losses scores 100, a window
/// with neither gains nor losses scores 50.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for pair in data.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    gains
        .windows(period)
        .zip(losses.windows(period))
        .map(|(g, l)| {
            let avg_gain = g.iter().sum::<f64>() / period as f64;
            let avg_loss = l.iter().sum::<f64>() / period as f64;

            if avg_loss == 0.0 {
                if avg_gain == 0.0 {
                    50.0
                } else {
                    100.0
                }
            } else {
                let rs = avg_gain / avg_loss;
                (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
            }
        })
        .collect()
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone, Default)]
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// `macd_line` starts once the slow EMA exists; `signal_line` and `histogram`
/// are aligned with the tail of `macd_line`.
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || signal_period == 0 || slow_period <= fast_period {
        return MacdResult::default();
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);
    if ema_slow.is_empty() {
        return MacdResult::default();
    }

    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);
    let hist_offset = macd_line.len() - signal_line.len();
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, signal)| macd_line[i + hist_offset] - signal)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
#[derive(Debug, Clone, Default)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// SMA(`period`) plus/minus `std_dev` sample standard deviations of the same window.
pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period < 2 || data.len() < period {
        return BollingerBands::default();
    }

    let middle = sma(data, period);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());

    for (window, &mean) in data.windows(period).zip(middle.iter()) {
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        let std = variance.sqrt();

        upper.push(mean + std_dev * std);
        lower.push(mean - std_dev * std);
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
