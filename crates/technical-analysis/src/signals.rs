use analysis_core::{
    MomentumSignal, TechnicalIndicators, TechnicalSignals, TrendDirection, TrendSignal, TrendStrength,
    VolatilitySignal, VolumeSignal,
};

pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;
pub const HIGH_VOLUME_RATIO: f64 = 1.5;
pub const LOW_VOLUME_RATIO: f64 = 0.5;

/// Moving-average stack. SMA-200 only upgrades a signal to `Strong`.
pub fn trend_signal(
    price: Option<f64>,
    sma_20: Option<f64>,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
) -> Option<TrendSignal> {
    let (price, sma_20, sma_50) = (price?, sma_20?, sma_50?);

    let signal = if price > sma_20 && sma_20 > sma_50 {
        let strength = match sma_200 {
            Some(sma_200) if sma_50 > sma_200 => TrendStrength::Strong,
            _ => TrendStrength::Moderate,
        };
        TrendSignal { direction: TrendDirection::Bullish, strength }
    } else if price < sma_20 && sma_20 < sma_50 {
        let strength = match sma_200 {
            Some(sma_200) if sma_50 < sma_200 => TrendStrength::Strong,
            _ => TrendStrength::Moderate,
        };
        TrendSignal { direction: TrendDirection::Bearish, strength }
    } else {
        TrendSignal {
            direction: TrendDirection::Neutral,
            strength: TrendStrength::Weak,
        }
    };

    Some(signal)
}

pub fn momentum_signal(rsi: Option<f64>) -> Option<MomentumSignal> {
    let rsi = rsi?;
    Some(if rsi > RSI_OVERBOUGHT {
        MomentumSignal::Overbought
    } else if rsi < RSI_OVERSOLD {
        MomentumSignal::Oversold
    } else {
        MomentumSignal::Neutral
    })
}

pub fn volatility_signal(price: Option<f64>, upper: Option<f64>, lower: Option<f64>) -> Option<VolatilitySignal> {
    let (price, upper, lower) = (price?, upper?, lower?);
    Some(if price > upper {
        VolatilitySignal::AboveUpperBand
    } else if price < lower {
        VolatilitySignal::BelowLowerBand
    } else {
        VolatilitySignal::Normal
    })
}

pub fn volume_signal(volume: Option<f64>, volume_sma: Option<f64>) -> Option<VolumeSignal> {
    let (volume, average) = (volume?, volume_sma?);
    if average <= 0.0 {
        return None;
    }
    Some(if volume > average * HIGH_VOLUME_RATIO {
        VolumeSignal::High
    } else if volume < average * LOW_VOLUME_RATIO {
        VolumeSignal::Low
    } else {
        VolumeSignal::Normal
    })
}

pub fn generate_signals(indicators: &TechnicalIndicators) -> TechnicalSignals {
    TechnicalSignals {
        trend: trend_signal(
            indicators.current_price,
            indicators.sma_20,
            indicators.sma_50,
            indicators.sma_200,
        ),
        momentum: momentum_signal(indicators.rsi),
        volatility: volatility_signal(indicators.current_price, indicators.bb_upper, indicators.bb_lower),
        volume: volume_signal(indicators.volume, indicators.volume_sma),
    }
}
