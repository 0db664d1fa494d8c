use analysis_core::stats::{max_drawdown_pct, percent_change, simple_returns};
use analysis_core::{PerformanceMetrics, PriceSeries, StockDataError};
use statrs::statistics::Statistics;

pub const TRADING_DAYS: f64 = 252.0;

/// Return, growth and risk figures for one price series.
///
/// Returns are simple close-to-close changes. Mean, std and volatility are
/// reported in percent; Sharpe is annualized with a zero risk-free rate.
pub fn calculate_performance(series: &PriceSeries) -> Result<PerformanceMetrics, StockDataError> {
    if let Some(bad) = series.bars().iter().find(|b| !b.close.is_finite() || !b.volume.is_finite()) {
        return Err(StockDataError::DataProcessing(format!(
            "{}: non-finite close/volume at {}",
            series.symbol(),
            bad.timestamp
        )));
    }

    let closes = series.closes();
    let volumes = series.volumes();
    let returns = simple_returns(&closes);

    let mean = (!returns.is_empty()).then(|| returns.as_slice().mean());
    let std = (returns.len() >= 2).then(|| returns.as_slice().std_dev());

    let sharpe_ratio = match (mean, std) {
        (Some(m), Some(s)) if s > 0.0 => Some(m / s * TRADING_DAYS.sqrt()),
        _ => None,
    };

    let last_two = |values: &[f64]| -> Option<f64> {
        match values {
            [.., previous, current] => percent_change(*current, *previous),
            _ => None,
        }
    };

    Ok(PerformanceMetrics {
        daily_return_mean: mean.map(|m| m * 100.0),
        daily_return_std: std.map(|s| s * 100.0),
        sharpe_ratio,
        price_growth: last_two(&closes),
        volume_growth: last_two(&volumes),
        volatility: std.map(|s| s * 100.0),
        max_drawdown: if closes.len() >= 2 { max_drawdown_pct(&closes) } else { None },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Bar, Symbol};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn series(points: &[(f64, f64)]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bars = points
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect();
        PriceSeries::new(Symbol::parse("PERF").unwrap(), bars).unwrap()
    }

    #[test]
    fn test_performance_metrics() {
        let s = series(&[(100.0, 1000.0), (110.0, 1500.0), (99.0, 1200.0), (108.9, 1800.0)]);
        let m = calculate_performance(&s).unwrap();

        // returns: +10%, -10%, +10%
        assert_relative_eq!(m.daily_return_mean.unwrap(), 10.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(m.daily_return_std.unwrap(), 11.547005383792516, epsilon = 1e-9);
        assert_relative_eq!(m.price_growth.unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(m.volume_growth.unwrap(), 50.0, epsilon = 1e-9);
        assert_relative_eq!(m.max_drawdown.unwrap(), 10.0, epsilon = 1e-9);

        let expected_sharpe = (0.1 / 3.0) / 0.11547005383792516 * 252f64.sqrt();
        assert_relative_eq!(m.sharpe_ratio.unwrap(), expected_sharpe, epsilon = 1e-9);
    }

    #[test]
    fn test_short_series_leaves_fields_absent() {
        let m = calculate_performance(&series(&[(100.0, 1000.0)])).unwrap();
        assert_eq!(m, PerformanceMetrics::default());

        let m = calculate_performance(&series(&[(100.0, 0.0), (101.0, 10.0)])).unwrap();
        assert!(m.daily_return_mean.is_some());
        assert!(m.daily_return_std.is_none());
        assert!(m.sharpe_ratio.is_none());
        assert!(m.volume_growth.is_none());
    }

    #[test]
    fn test_flat_series_has_no_sharpe() {
        let m = calculate_performance(&series(&[(50.0, 1.0), (50.0, 1.0), (50.0, 1.0)])).unwrap();
        assert_eq!(m.daily_return_std, Some(0.0));
        assert!(m.sharpe_ratio.is_none());
        assert_eq!(m.max_drawdown, Some(0.0));
    }
}
