use analysis_core::{
    CompanyInfo, HistoricalPeriod, Interval, PriceSeries, RecordStatus, StockDataError, StockDataProvider,
    StockRecord, Symbol,
};
use chrono::Utc;
use fundamental_analysis::FundamentalAnalysisEngine;
use futures_util::stream::{self, StreamExt};
use quant_analysis::{calculate_performance, calculate_portfolio_metrics, PortfolioMetrics, Position};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use technical_analysis::{TechnicalAnalysisEngine, TechnicalReport};

pub mod progress;
pub use progress::{LoggingObserver, ProgressEvent, ProgressObserver, ProgressUpdate};


pub const DEFAULT_NEWS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Symbols in flight at once; 1 processes the batch in order.
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub metrics: PortfolioMetrics,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
}

/// Fetches data through a provider and assembles per-symbol records.
pub struct AnalysisOrchestrator {
    provider: Arc<dyn StockDataProvider>,
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
    observer: Arc<dyn ProgressObserver>,
    period: HistoricalPeriod,
    interval: Interval,
    news_limit: usize,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn StockDataProvider>) -> Self {
        Self {
            provider,
            technical_analyzer: TechnicalAnalysisEngine::new(),
            fundamental_analyzer: FundamentalAnalysisEngine::new(),
            observer: Arc::new(LoggingObserver),
            period: HistoricalPeriod::default(),
            interval: Interval::default(),
            news_limit: DEFAULT_NEWS_LIMIT,
        }
    }

    pub fn with_period(mut self, period: HistoricalPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_news_limit(mut self, limit: usize) -> Self {
        self.news_limit = limit;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Full record for one symbol.
    ///
    /// The price series is required and its error is returned as-is. The other
    /// sub-fetches only degrade the record: missing financials make it
    /// `Partial`, missing company info or news add a warning.
    pub async fn analyze_symbol(&self, symbol: &Symbol) -> Result<StockRecord, StockDataError> {
        tracing::info!("Starting analysis for {} ({} / {})", symbol, self.period, self.interval.as_str());

        let series = self
            .provider
            .fetch_price_series(symbol, self.period, self.interval)
            .await?;
        if series.is_empty() {
            return Err(StockDataError::DataProcessing(format!("{}: provider returned no bars", symbol)));
        }

        let (company_result, financials_result, news_result) = tokio::join!(
            self.provider.fetch_company_info(symbol),
            self.provider.fetch_financials(symbol),
            self.provider.fetch_news(symbol, self.news_limit),
        );

        let mut warnings = Vec::new();
        let mut status = RecordStatus::Success;
        let mut error = None;

        let company = match company_result {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("Company info for {} unavailable: {}", symbol, e);
                warnings.push(format!("company info unavailable: {}", e));
                None
            }
        };

        let financials = match financials_result {
            Ok(statement) => Some(statement),
            Err(e) => {
                tracing::warn!("Financial statements for {} unavailable: {}", symbol, e);
                status = RecordStatus::Partial;
                error = Some(e);
                None
            }
        };

        let news = news_result.unwrap_or_else(|e| {
            tracing::warn!("News for {} unavailable: {}", symbol, e);
            warnings.push(format!("news unavailable: {}", e));
            Vec::new()
        });

        let technical = self.technical_report(&series, &mut warnings);
        let performance = calculate_performance(&series).unwrap_or_else(|e| {
            tracing::warn!("Performance metrics for {} skipped: {}", symbol, e);
            warnings.push(format!("performance metrics skipped: {}", e));
            Default::default()
        });
        let fundamentals = self.fundamental_analyzer.calculate(
            financials.as_ref(),
            company.as_ref(),
            technical.indicators.current_price,
        );

        tracing::info!("Finished {} with status {:?} ({} warnings)", symbol, status, warnings.len());

        Ok(StockRecord {
            symbol: symbol.clone(),
            provider: self.provider.name().to_string(),
            fetched_at: Utc::now(),
            status,
            error,
            warnings,
            company: company.unwrap_or_else(|| CompanyInfo::minimal(symbol)),
            technical: technical.indicators,
            signals: technical.signals,
            fundamentals,
            performance,
            news,
        })
    }

    fn technical_report(&self, series: &PriceSeries, warnings: &mut Vec<String>) -> TechnicalReport {
        match self.technical_analyzer.analyze(series) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Technical analysis for {} skipped: {}", series.symbol(), e);
                warnings.push(format!("technical analysis skipped: {}", e));
                TechnicalReport::default()
            }
        }
    }

    /// Sequential batch; see [`fetch_and_analyze_with`](Self::fetch_and_analyze_with).
    pub async fn fetch_and_analyze(&self, symbols: &[Symbol]) -> BTreeMap<Symbol, StockRecord> {
        self.fetch_and_analyze_with(symbols, BatchOptions::default()).await
    }

    /// Analyze every distinct symbol. Never fails: a symbol whose analysis
    /// errors gets a `Failed` record carrying the error.
    pub async fn fetch_and_analyze_with(
        &self,
        symbols: &[Symbol],
        options: BatchOptions,
    ) -> BTreeMap<Symbol, StockRecord> {
        let mut seen = HashSet::new();
        let unique: Vec<&Symbol> = symbols.iter().filter(|s| seen.insert(*s)).collect();
        let total = unique.len();
        let concurrency = options.concurrency.max(1);

        tracing::info!("Analyzing {} symbols (concurrency {})", total, concurrency);

        let records: Vec<StockRecord> = stream::iter(unique.into_iter().enumerate())
            .map(|(i, symbol)| self.analyze_tracked(symbol, i + 1, total))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let failed = records.iter().filter(|r| r.status == RecordStatus::Failed).count();
        tracing::info!("Batch complete: {} analyzed, {} failed", total - failed, failed);

        records.into_iter().map(|r| (r.symbol.clone(), r)).collect()
    }

    async fn analyze_tracked(&self, symbol: &Symbol, position: usize, total: usize) -> StockRecord {
        let notify = |event: ProgressEvent| {
            self.observer.on_progress(&ProgressUpdate {
                symbol: symbol.clone(),
                position,
                total,
                event,
            })
        };

        notify(ProgressEvent::Started);
        match self.analyze_symbol(symbol).await {
            Ok(record) => {
                notify(ProgressEvent::Completed(record.status));
                record
            }
            Err(e) => {
                notify(ProgressEvent::Failed(e.clone()));
                StockRecord::failed(symbol.clone(), self.provider.name(), e)
            }
        }
    }

    /// Portfolio metrics for `positions`, optionally against a benchmark series
    /// such as `^GSPC`. Symbols whose prices cannot be fetched are skipped.
    pub async fn analyze_portfolio(&self, positions: &[Position], benchmark: Option<&Symbol>) -> PortfolioReport {
        let mut warnings = Vec::new();
        let mut prices: HashMap<Symbol, PriceSeries> = HashMap::new();

        for position in positions {
            if prices.contains_key(&position.symbol) {
                continue;
            }
            match self
                .provider
                .fetch_price_series(&position.symbol, self.period, self.interval)
                .await
            {
                Ok(series) => {
                    prices.insert(position.symbol.clone(), series);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} in portfolio: {}", position.symbol, e);
                    warnings.push(format!("{}: {}", position.symbol, e));
                }
            }
        }

        let market = match benchmark {
            Some(symbol) => match self.provider.fetch_price_series(symbol, self.period, self.interval).await {
                Ok(series) => Some(series),
                Err(e) => {
                    tracing::warn!("Benchmark {} unavailable: {}", symbol, e);
                    warnings.push(format!("benchmark {}: {}", symbol, e));
                    None
                }
            },
            None => None,
        };

        let metrics = calculate_portfolio_metrics(positions, &prices, market.as_ref());
        let recommendations = metrics.recommendations();

        PortfolioReport {
            metrics,
            recommendations,
            warnings,
        }
    }
}
