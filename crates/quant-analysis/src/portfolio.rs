use analysis_core::stats::{max_drawdown_pct, safe_div};
use analysis_core::{Bar, PriceSeries, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};

use crate::returns::TRADING_DAYS;

pub const RISK_FREE_RATE: f64 = 0.02;
pub const RECENT_WINDOW: usize = 30;
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// A holding: share count and per-share cost basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub shares: f64,
    pub cost_basis: f64,
    #[serde(default)]
    pub sector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMetrics {
    pub symbol: Symbol,
    pub shares: f64,
    pub cost_basis: f64,
    pub current_price: f64,
    pub position_value: f64,
    /// Percent gain over cost basis; absent when the cost basis is not positive
    pub return_pct: Option<f64>,
    pub sector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub positions: Vec<PositionMetrics>,
    pub total_value: f64,
    /// Sector name to percent of total value
    pub sector_allocation: BTreeMap<String, f64>,
    /// Annualized, percent
    pub volatility: Option<f64>,
    pub beta: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    /// Sum of position returns, percent
    pub total_return: Option<f64>,
    pub thirty_day_return: Option<f64>,
    pub max_drawdown: Option<f64>,
    /// Positions left out because no prices were available
    pub skipped: Vec<Symbol>,
}

impl PortfolioMetrics {
    /// Plain-language warnings about concentration, risk and drawdown.
    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();

        for (sector, pct) in &self.sector_allocation {
            if *pct > 30.0 {
                out.push(format!(
                    "High concentration in {} sector ({:.1}%). Consider diversifying.",
                    sector, pct
                ));
            }
        }
        if self.volatility.is_some_and(|v| v > 20.0) {
            out.push("High portfolio volatility. Consider adding more defensive positions.".to_string());
        }
        if self.beta.is_some_and(|b| b > 1.2) {
            out.push("High market sensitivity. Consider adding low-beta positions.".to_string());
        }
        if self.max_drawdown.is_some_and(|d| d > 20.0) {
            out.push("Large drawdown risk. Consider implementing stop-loss orders.".to_string());
        }

        out
    }
}

/// Returns keyed by the timestamp of the later bar.
fn dated_returns(bars: &[Bar]) -> Vec<(DateTime<Utc>, f64)> {
    bars.windows(2)
        .filter_map(|w| safe_div(Some(w[1].close - w[0].close), Some(w[0].close)).map(|r| (w[1].timestamp, r)))
        .collect()
}

/// Value-weighted sum of position returns per timestamp. A position with no
/// bar on a date contributes nothing to that date.
fn weighted_returns<'a, I>(legs: I) -> BTreeMap<DateTime<Utc>, f64>
where
    I: IntoIterator<Item = (&'a [Bar], f64)>,
{
    let mut combined = BTreeMap::new();
    for (bars, weight) in legs {
        for (ts, r) in dated_returns(bars) {
            *combined.entry(ts).or_insert(0.0) += r * weight;
        }
    }
    combined
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let std = values.std_dev();
    std.is_finite().then_some(std)
}

fn beta_against(portfolio: &[f64], market: &[f64]) -> Option<f64> {
    if portfolio.len() < 2 {
        return None;
    }
    let market_variance = market.variance();
    if market_variance.is_nan() || market_variance <= 0.0 {
        return None;
    }
    safe_div(Some(portfolio.covariance(market)), Some(market_variance))
}

fn sharpe(returns: &[f64]) -> Option<f64> {
    let daily_rf = RISK_FREE_RATE / TRADING_DAYS;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let std = sample_std(&excess)?;
    safe_div(Some(excess.as_slice().mean()), Some(std)).map(|r| r * TRADING_DAYS.sqrt())
}

/// Valuation, allocation, risk and recent performance for a set of positions.
///
/// `prices` holds one series per symbol; positions without a non-empty series
/// are listed in `skipped`. Beta needs `market`; Sharpe uses the dates shared
/// with `market` when one is given, otherwise every portfolio date.
pub fn calculate_portfolio_metrics(
    positions: &[Position],
    prices: &HashMap<Symbol, PriceSeries>,
    market: Option<&PriceSeries>,
) -> PortfolioMetrics {
    let mut metrics = PortfolioMetrics::default();
    let mut held: Vec<(&PriceSeries, f64)> = Vec::new();

    for position in positions {
        let Some((series, last)) = prices
            .get(&position.symbol)
            .and_then(|s| s.last().map(|bar| (s, bar.close)))
        else {
            tracing::warn!("No prices for {}, leaving it out of portfolio metrics", position.symbol);
            metrics.skipped.push(position.symbol.clone());
            continue;
        };

        let position_value = position.shares * last;
        let return_pct = if position.cost_basis > 0.0 {
            Some((last - position.cost_basis) / position.cost_basis * 100.0)
        } else {
            None
        };

        metrics.total_value += position_value;
        metrics.positions.push(PositionMetrics {
            symbol: position.symbol.clone(),
            shares: position.shares,
            cost_basis: position.cost_basis,
            current_price: last,
            position_value,
            return_pct,
            sector: position.sector.clone().unwrap_or_else(|| UNKNOWN_SECTOR.to_string()),
        });
        held.push((series, position_value));
    }

    if metrics.positions.is_empty() {
        return metrics;
    }

    let returns: Vec<f64> = metrics.positions.iter().filter_map(|p| p.return_pct).collect();
    metrics.total_return = (!returns.is_empty()).then(|| returns.iter().sum());

    if metrics.total_value <= 0.0 {
        return metrics;
    }
    let total = metrics.total_value;

    for p in &metrics.positions {
        *metrics.sector_allocation.entry(p.sector.clone()).or_insert(0.0) += p.position_value / total * 100.0;
    }

    let daily = weighted_returns(held.iter().map(|(s, v)| (s.bars(), v / total)));
    let daily_values: Vec<f64> = daily.values().copied().collect();
    metrics.volatility = sample_std(&daily_values).map(|s| s * TRADING_DAYS.sqrt() * 100.0);

    match market {
        Some(market) => {
            let market_returns: BTreeMap<_, _> = dated_returns(market.bars()).into_iter().collect();
            let (aligned_p, aligned_m): (Vec<f64>, Vec<f64>) = daily
                .iter()
                .filter_map(|(ts, p)| market_returns.get(ts).map(|m| (*p, *m)))
                .unzip();
            metrics.beta = beta_against(&aligned_p, &aligned_m);
            metrics.sharpe_ratio = sharpe(&aligned_p);
        }
        None => {
            metrics.sharpe_ratio = sharpe(&daily_values);
        }
    }

    let recent = weighted_returns(held.iter().map(|(s, v)| (s.tail(RECENT_WINDOW), v / total)));
    if !recent.is_empty() {
        let mut growth = Vec::with_capacity(recent.len() + 1);
        growth.push(1.0);
        for r in recent.values() {
            let prev = growth.last().copied().unwrap_or(1.0);
            growth.push(prev * (1.0 + r));
        }
        metrics.thirty_day_return = growth.last().map(|g| (g - 1.0) * 100.0);
        metrics.max_drawdown = max_drawdown_pct(&growth);
    }

    metrics
}
