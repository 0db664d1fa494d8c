use analysis_core::{PriceSeries, StockDataError, TechnicalIndicators, TechnicalSignals};
use serde::Serialize;

use crate::indicators::*;
use crate::signals::generate_signals;

pub const SMA_SHORT: usize = 20;
pub const SMA_MEDIUM: usize = 50;
pub const SMA_LONG: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const VOLUME_SMA_PERIOD: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TechnicalReport {
    pub indicators: TechnicalIndicators,
    pub signals: TechnicalSignals,
}

/// Latest value of every indicator for a price series, plus the derived signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct TechnicalAnalysisEngine;

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate_indicators(&self, series: &PriceSeries) -> Result<TechnicalIndicators, StockDataError> {
        if let Some(bad) = series
            .bars()
            .iter()
            .find(|b| !b.close.is_finite() || !b.volume.is_finite())
        {
            return Err(StockDataError::DataProcessing(format!(
                "{}: non-finite close/volume at {}",
                series.symbol(),
                bad.timestamp
            )));
        }

        let closes = series.closes();
        let volumes = series.volumes();

        let macd_result = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        let bb = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV);

        Ok(TechnicalIndicators {
            current_price: closes.last().copied(),
            sma_20: sma(&closes, SMA_SHORT).last().copied(),
            sma_50: sma(&closes, SMA_MEDIUM).last().copied(),
            sma_200: sma(&closes, SMA_LONG).last().copied(),
            rsi: rsi(&closes, RSI_PERIOD).last().copied(),
            macd: macd_result.macd_line.last().copied(),
            macd_signal: macd_result.signal_line.last().copied(),
            macd_histogram: macd_result.histogram.last().copied(),
            bb_upper: bb.upper.last().copied(),
            bb_middle: bb.middle.last().copied(),
            bb_lower: bb.lower.last().copied(),
            volume: volumes.last().copied(),
            volume_sma: sma(&volumes, VOLUME_SMA_PERIOD).last().copied(),
        })
    }

    pub fn analyze(&self, series: &PriceSeries) -> Result<TechnicalReport, StockDataError> {
        let indicators = self.calculate_indicators(series)?;
        let signals = generate_signals(&indicators);

        tracing::debug!(
            "{}: technical analysis over {} bars (trend: {})",
            series.symbol(),
            series.len(),
            signals.trend.map(|t| t.to_label()).unwrap_or("n/a")
        );

        Ok(TechnicalReport { indicators, signals })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Bar, Symbol, TrendDirection};
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0 + i as f64,
            })
            .collect();
        PriceSeries::new(Symbol::parse("TEST").unwrap(), bars).unwrap()
    }

    #[test]
    fn test_short_series_leaves_long_indicators_absent() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let indicators = TechnicalAnalysisEngine::new().calculate_indicators(&series(&closes)).unwrap();

        assert_eq!(indicators.current_price, Some(129.0));
        assert!(indicators.sma_20.is_some());
        assert!(indicators.sma_50.is_none());
        assert!(indicators.sma_200.is_none());
        assert!(indicators.macd.is_some());
        assert!(indicators.macd_signal.is_none());
        assert!(indicators.rsi.is_some());
    }

    #[test]
    fn test_sma_is_deterministic() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let s = series(&closes);
        let engine = TechnicalAnalysisEngine::new();

        let first = engine.calculate_indicators(&s).unwrap().sma_20.unwrap();
        let second = engine.calculate_indicators(&s).unwrap().sma_20.unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_uptrend_report() {
        let closes: Vec<f64> = (0..220).map(|i| 100.0 + i as f64).collect();
        let report = TechnicalAnalysisEngine::new().analyze(&series(&closes)).unwrap();

        let trend = report.signals.trend.unwrap();
        assert_eq!(trend.direction, TrendDirection::Bullish);
        assert_eq!(trend.to_label(), "Strong Bullish");
        assert_eq!(report.indicators.rsi, Some(100.0));
        assert!(report.signals.momentum.is_some());
    }

    #[test]
    fn test_non_finite_close_rejected() {
        let mut closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
        closes[10] = f64::NAN;
        let err = TechnicalAnalysisEngine::new().analyze(&series(&closes)).unwrap_err();
        assert!(matches!(err, StockDataError::DataProcessing(_)));
    }

    #[test]
    fn test_empty_series_has_no_indicators() {
        let empty = PriceSeries::new(Symbol::parse("TEST").unwrap(), vec![]).unwrap();
        let report = TechnicalAnalysisEngine::new().analyze(&empty).unwrap();
        assert_eq!(report.indicators, TechnicalIndicators::default());
        assert_eq!(report.signals, TechnicalSignals::default());
    }
}
