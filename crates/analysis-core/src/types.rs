use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StockDataError;

const MAX_SYMBOL_LEN: usize = 12;

/// Uppercase ticker identifier, used as the aggregation key.
///
/// Accepts ASCII alphanumerics with `.`/`-` class separators (`BRK.B`) and a
/// leading `^` for index tickers (`^GSPC`). Input is trimmed and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, StockDataError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(StockDataError::InvalidSymbol("empty symbol".to_string()));
        }
        if normalized.len() > MAX_SYMBOL_LEN {
            return Err(StockDataError::InvalidSymbol(format!(
                "{} exceeds {} characters",
                normalized, MAX_SYMBOL_LEN
            )));
        }

        let mut chars = normalized.chars();
        let first_ok = chars
            .next()
            .map(|c| c.is_ascii_alphanumeric() || c == '^')
            .unwrap_or(false);
        let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        let has_alnum = normalized.chars().any(|c| c.is_ascii_alphanumeric());

        if !(first_ok && rest_ok && has_alnum) {
            return Err(StockDataError::InvalidSymbol(normalized));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = StockDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = StockDataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bars for one symbol, strictly increasing by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: Symbol,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, bars: Vec<Bar>) -> Result<Self, StockDataError> {
        if let Some(pos) = bars.windows(2).position(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(StockDataError::DataProcessing(format!(
                "{}: timestamps not strictly increasing at bar {} ({} then {})",
                symbol,
                pos + 1,
                bars[pos].timestamp,
                bars[pos + 1].timestamp
            )));
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// The last `n` bars (or all of them when fewer exist).
    pub fn tail(&self, n: usize) -> &[Bar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

/// How much history to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoricalPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl HistoricalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricalPeriod::OneDay => "1d",
            HistoricalPeriod::FiveDays => "5d",
            HistoricalPeriod::OneMonth => "1mo",
            HistoricalPeriod::ThreeMonths => "3mo",
            HistoricalPeriod::SixMonths => "6mo",
            HistoricalPeriod::OneYear => "1y",
            HistoricalPeriod::TwoYears => "2y",
            HistoricalPeriod::FiveYears => "5y",
            HistoricalPeriod::TenYears => "10y",
            HistoricalPeriod::YearToDate => "ytd",
            HistoricalPeriod::Max => "max",
        }
    }
}

impl FromStr for HistoricalPeriod {
    type Err = StockDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(HistoricalPeriod::OneDay),
            "5d" => Ok(HistoricalPeriod::FiveDays),
            "1mo" => Ok(HistoricalPeriod::OneMonth),
            "3mo" => Ok(HistoricalPeriod::ThreeMonths),
            "6mo" => Ok(HistoricalPeriod::SixMonths),
            "1y" => Ok(HistoricalPeriod::OneYear),
            "2y" => Ok(HistoricalPeriod::TwoYears),
            "5y" => Ok(HistoricalPeriod::FiveYears),
            "10y" => Ok(HistoricalPeriod::TenYears),
            "ytd" => Ok(HistoricalPeriod::YearToDate),
            "max" => Ok(HistoricalPeriod::Max),
            other => Err(StockDataError::Config(format!("unknown historical period '{}'", other))),
        }
    }
}

impl fmt::Display for HistoricalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1wk")]
    Week1,
    #[serde(rename = "1mo")]
    Month1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day1 => "1d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
        }
    }
}

impl FromStr for Interval {
    type Err = StockDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Interval::Day1),
            "1wk" => Ok(Interval::Week1),
            "1mo" => Ok(Interval::Month1),
            other => Err(StockDataError::Config(format!("unknown interval '{}'", other))),
        }
    }
}

/// Descriptive company facts plus the quote-level figures fundamental ratios need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: Symbol,
    pub name: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub market_cap: Option<f64>,
    pub employees: Option<u64>,
    pub trailing_eps: Option<f64>,
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

impl CompanyInfo {
    /// Placeholder used when the profile fetch failed: the name is the ticker itself.
    pub fn minimal(symbol: &Symbol) -> Self {
        Self {
            symbol: symbol.clone(),
            name: symbol.to_string(),
            sector: None,
            industry: None,
            website: None,
            description: None,
            country: None,
            currency: None,
            exchange: None,
            market_cap: None,
            employees: None,
            trailing_eps: None,
            dividend_rate: None,
            dividend_yield: None,
            beta: None,
            shares_outstanding: None,
        }
    }
}

/// Latest annual statement line items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub fiscal_year: Option<i32>,
    pub revenue: Option<f64>,
    pub cost_of_revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub stockholders_equity: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub inventory: Option<f64>,
    pub total_debt: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub investing_cash_flow: Option<f64>,
    pub financing_cash_flow: Option<f64>,
    pub capital_expenditures: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub current_price: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volume: Option<f64>,
    pub volume_sma: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSignal {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
}

impl TrendSignal {
    pub fn to_label(&self) -> &'static str {
        match (self.direction, self.strength) {
            (TrendDirection::Bullish, TrendStrength::Strong) => "Strong Bullish",
            (TrendDirection::Bullish, _) => "Bullish",
            (TrendDirection::Bearish, TrendStrength::Strong) => "Strong Bearish",
            (TrendDirection::Bearish, _) => "Bearish",
            (TrendDirection::Neutral, _) => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MomentumSignal {
    Overbought,
    Oversold,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilitySignal {
    AboveUpperBand,
    BelowLowerBand,
    Normal,
}

impl VolatilitySignal {
    pub fn to_label(&self) -> &'static str {
        match self {
            VolatilitySignal::AboveUpperBand => "High Volatility (Upper Band)",
            VolatilitySignal::BelowLowerBand => "High Volatility (Lower Band)",
            VolatilitySignal::Normal => "Normal Volatility",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeSignal {
    High,
    Low,
    Normal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub trend: Option<TrendSignal>,
    pub momentum: Option<MomentumSignal>,
    pub volatility: Option<VolatilitySignal>,
    pub volume: Option<VolumeSignal>,
}

/// Statement line items plus the ratios derived from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub revenue: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub total_equity: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub investing_cash_flow: Option<f64>,
    pub financing_cash_flow: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub eps: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub profit_margin: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub asset_turnover: Option<f64>,
    pub inventory_turnover: Option<f64>,
}

/// Return and growth figures derived from a price series (percentages unless noted)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub daily_return_mean: Option<f64>,
    pub daily_return_std: Option<f64>,
    /// Annualized, risk-free rate 0
    pub sharpe_ratio: Option<f64>,
    pub price_growth: Option<f64>,
    pub volume_growth: Option<f64>,
    pub volatility: Option<f64>,
    pub max_drawdown: Option<f64>,
}

/// News article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub publisher: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Price data and financial statements both arrived
    Success,
    /// Price data arrived, financial statements did not
    Partial,
    /// No usable price data
    Failed,
}

/// Per-symbol analysis result handed to report / UI collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: Symbol,
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub error: Option<StockDataError>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub company: CompanyInfo,
    pub technical: TechnicalIndicators,
    pub signals: TechnicalSignals,
    pub fundamentals: FinancialMetrics,
    pub performance: PerformanceMetrics,
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

impl StockRecord {
    pub fn failed(symbol: Symbol, provider: impl Into<String>, error: StockDataError) -> Self {
        Self {
            company: CompanyInfo::minimal(&symbol),
            symbol,
            provider: provider.into(),
            fetched_at: Utc::now(),
            status: RecordStatus::Failed,
            error: Some(error),
            warnings: Vec::new(),
            technical: TechnicalIndicators::default(),
            signals: TechnicalSignals::default(),
            fundamentals: FinancialMetrics::default(),
            performance: PerformanceMetrics::default(),
            news: Vec::new(),
        }
    }
}
