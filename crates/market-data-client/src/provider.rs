use analysis_core::{
    CompanyInfo, FinancialStatement, HistoricalPeriod, Interval, NewsItem, PriceSeries, StockDataError,
    StockDataProvider, Symbol,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::FetchConfig;
use crate::fetch::{FetchClient, RequestKind};
use crate::rate_limiter::CooldownLimiter;
use crate::yahoo::{self, YahooTransport};

/// Yahoo Finance behind the shared limiter and retry policy.
pub struct YahooProvider {
    client: FetchClient,
}

impl YahooProvider {
    pub const NAME: &'static str = "yahoo_finance";

    pub fn new(client: FetchClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig, limiter: Arc<CooldownLimiter>) -> Result<Self, StockDataError> {
        let transport = YahooTransport::new(config.request_timeout, &config.user_agent)?
            .with_base_url(config.base_url.clone())
            .with_session_url(config.session_url.clone());
        let client = FetchClient::new(Arc::new(transport), limiter, config.retry)
            .with_request_timeout(config.request_timeout);
        Ok(Self::new(client))
    }
}

#[async_trait]
impl StockDataProvider for YahooProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn fetch_price_series(
        &self,
        symbol: &Symbol,
        period: HistoricalPeriod,
        interval: Interval,
    ) -> Result<PriceSeries, StockDataError> {
        let payload = self
            .client
            .fetch(symbol, RequestKind::History { period, interval })
            .await?;
        let series = yahoo::parse_chart(symbol, &payload.body)?;
        tracing::debug!("{}: {} bars ({} / {})", symbol, series.len(), period, interval.as_str());
        Ok(series)
    }

    async fn fetch_company_info(&self, symbol: &Symbol) -> Result<CompanyInfo, StockDataError> {
        let payload = self.client.fetch(symbol, RequestKind::CompanyProfile).await?;
        yahoo::parse_company_info(symbol, &payload.body)
    }

    async fn fetch_financials(&self, symbol: &Symbol) -> Result<FinancialStatement, StockDataError> {
        let payload = self.client.fetch(symbol, RequestKind::Financials).await?;
        yahoo::parse_financials(symbol, &payload.body)
    }

    async fn fetch_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>, StockDataError> {
        let payload = self.client.fetch(symbol, RequestKind::News { limit }).await?;
        Ok(yahoo::parse_news(&payload.body, limit))
    }
}
