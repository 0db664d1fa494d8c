use async_trait::async_trait;

use crate::{CompanyInfo, FinancialStatement, HistoricalPeriod, Interval, NewsItem, PriceSeries, StockDataError, Symbol};

/// A source of market and company data.
///
/// Implementations normalize their upstream payloads into the shared types and
/// map upstream failures onto [`StockDataError`].
#[async_trait]
pub trait StockDataProvider: Send + Sync {
    /// Registry name, recorded on every `StockRecord` built from this provider.
    fn name(&self) -> &str;

    async fn fetch_price_series(
        &self,
        symbol: &Symbol,
        period: HistoricalPeriod,
        interval: Interval,
    ) -> Result<PriceSeries, StockDataError>;

    async fn fetch_company_info(&self, symbol: &Symbol) -> Result<CompanyInfo, StockDataError>;

    /// Most recent annual statements.
    async fn fetch_financials(&self, symbol: &Symbol) -> Result<FinancialStatement, StockDataError>;

    async fn fetch_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>, StockDataError>;
}
