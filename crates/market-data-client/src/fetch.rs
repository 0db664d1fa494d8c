use analysis_core::{HistoricalPeriod, Interval, StockDataError, Symbol};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::rate_limiter::CooldownLimiter;
use crate::retry::RetryPolicy;

/// What a single upstream request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    History { period: HistoricalPeriod, interval: Interval },
    CompanyProfile,
    Financials,
    News { limit: usize },
}

impl RequestKind {
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::History { .. } => "history",
            RequestKind::CompanyProfile => "company_profile",
            RequestKind::Financials => "financials",
            RequestKind::News { .. } => "news",
        }
    }
}

/// Provider-native response body, tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuotePayload {
    pub kind: RequestKind,
    pub body: serde_json::Value,
}

/// One outbound request, no retrying or spacing.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError>;
}

/// Rate-limited, retrying front for a [`Transport`].
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    limiter: Arc<CooldownLimiter>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    request_timeout: Option<Duration>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<CooldownLimiter>, retry: RetryPolicy) -> Self {
        let clock = limiter.clock();
        Self {
            transport,
            limiter,
            retry,
            clock,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Per-attempt bound on the outbound request, counted from the moment the
    /// limiter lets it go. Time spent queued behind other callers is not
    /// included; use [`fetch_with_deadline`](Self::fetch_with_deadline) to
    /// bound that too. `None` disables it.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn limiter(&self) -> &Arc<CooldownLimiter> {
        &self.limiter
    }

    pub async fn fetch(&self, symbol: &Symbol, request: RequestKind) -> Result<RawQuotePayload, StockDataError> {
        let attempts = self.retry.attempts();
        let mut attempt = 0u32;

        loop {
            match self.attempt(symbol, &request).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        "{} {} failed ({}), retry {}/{} in {:.1}s",
                        symbol,
                        request.label(),
                        e,
                        attempt + 1,
                        attempts - 1,
                        delay.as_secs_f64()
                    );
                    self.clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!("{} {} giving up after {} attempts: {}", symbol, request.label(), attempts, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Like [`fetch`](Self::fetch), but the whole call (limiter queueing and
    /// retries included) must finish within `deadline`; the in-flight attempt
    /// is dropped otherwise.
    pub async fn fetch_with_deadline(
        &self,
        symbol: &Symbol,
        request: RequestKind,
        deadline: Duration,
    ) -> Result<RawQuotePayload, StockDataError> {
        match tokio::time::timeout(deadline, self.fetch(symbol, request)).await {
            Ok(result) => result,
            Err(_) => Err(StockDataError::Timeout(format!(
                "{} {} exceeded deadline of {:.1}s",
                symbol,
                request.label(),
                deadline.as_secs_f64()
            ))),
        }
    }

    async fn attempt(&self, symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError> {
        self.limiter.acquire().await;
        let call = self.transport.send(symbol, request);

        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(StockDataError::Timeout(format!(
                    "{} {} took longer than {:.1}s",
                    symbol,
                    request.label(),
                    limit.as_secs_f64()
                )))
            }),
            None => call.await,
        }
    }
}
