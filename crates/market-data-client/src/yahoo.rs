use analysis_core::{
    Bar, CompanyInfo, FinancialStatement, NewsItem, PriceSeries, StockDataError, Symbol,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::fetch::{RawQuotePayload, RequestKind, Transport};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_SESSION_URL: &str = "https://fc.yahoo.com";

const PROFILE_MODULES: &str = "assetProfile,price,summaryDetail,defaultKeyStatistics,financialData";
const FINANCIAL_MODULES: &str =
    "incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory,financialData";

/// HTTP transport for the public Yahoo Finance JSON endpoints.
///
/// `quoteSummary` only answers requests carrying a crumb tied to the session
/// cookie, so the transport keeps a cookie store and a cached crumb. The crumb
/// is fetched on first use and refreshed once when Yahoo rejects it.
#[derive(Clone)]
pub struct YahooTransport {
    client: Client,
    base_url: String,
    session_url: String,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooTransport {
    pub fn new(request_timeout: Option<Duration>, user_agent: &str) -> Result<Self, StockDataError> {
        let mut builder = Client::builder().user_agent(user_agent).cookie_store(true);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StockDataError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::from_client(client))
    }

    /// Wrap a prebuilt client. It needs a cookie store for the crumb handshake.
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            session_url: DEFAULT_SESSION_URL.to_string(),
            crumb: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_session_url(mut self, session_url: impl Into<String>) -> Self {
        self.session_url = session_url.into();
        self
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<(StatusCode, String), StockDataError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok((status, body))
    }

    async fn get_json(&self, symbol: &Symbol, url: &str, query: &[(&str, String)]) -> Result<Value, StockDataError> {
        let (status, body) = self.get_text(url, query).await?;
        decode(symbol, status, &body)
    }

    /// Cached crumb, or a fresh one from the cookie + `getcrumb` handshake.
    async fn crumb(&self) -> Result<String, StockDataError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the cookie matters here; this page answers 404 on success.
        if let Err(e) = self.client.get(&self.session_url).send().await {
            tracing::debug!("Yahoo session request failed: {}", e);
        }

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let (status, body) = self.get_text(&url, &[]).await?;
        let crumb = body.trim();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StockDataError::RateLimit("HTTP 429 fetching crumb".to_string()));
        }
        if !status.is_success() || crumb.is_empty() || crumb.contains('<') || crumb.contains('{') {
            return Err(StockDataError::Network(format!(
                "crumb handshake failed: HTTP {}",
                status
            )));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    async fn forget_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    async fn quote_summary(&self, symbol: &Symbol, modules: &str) -> Result<Value, StockDataError> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let mut refreshed = false;
        loop {
            let crumb = self.crumb().await?;
            let query = [("modules", modules.to_string()), ("crumb", crumb)];
            let (status, body) = self.get_text(&url, &query).await?;

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                tracing::debug!("Yahoo rejected crumb for {}, refreshing", symbol);
                self.forget_crumb().await;
                refreshed = true;
                continue;
            }
            return decode(symbol, status, &body);
        }
    }
}

#[async_trait]
impl Transport for YahooTransport {
    async fn send(&self, symbol: &Symbol, request: &RequestKind) -> Result<RawQuotePayload, StockDataError> {
        let body = match request {
            RequestKind::History { period, interval } => {
                let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
                let query = [
                    ("range", period.as_str().to_string()),
                    ("interval", interval.as_str().to_string()),
                    ("includePrePost", "false".to_string()),
                ];
                self.get_json(symbol, &url, &query).await?
            }
            RequestKind::CompanyProfile => self.quote_summary(symbol, PROFILE_MODULES).await?,
            RequestKind::Financials => self.quote_summary(symbol, FINANCIAL_MODULES).await?,
            RequestKind::News { limit } => {
                let url = format!("{}/v1/finance/search", self.base_url);
                let query = [
                    ("q", symbol.to_string()),
                    ("newsCount", limit.to_string()),
                    ("quotesCount", "0".to_string()),
                ];
                self.get_json(symbol, &url, &query).await?
            }
        };

        Ok(RawQuotePayload { kind: *request, body })
    }
}

fn decode(symbol: &Symbol, status: StatusCode, body: &str) -> Result<Value, StockDataError> {
    if !status.is_success() {
        return Err(map_status(symbol, status, body));
    }
    serde_json::from_str(body)
        .map_err(|e| StockDataError::DataProcessing(format!("{}: invalid JSON body: {}", symbol, e)))
}

fn map_reqwest_error(e: reqwest::Error) -> StockDataError {
    if e.is_timeout() {
        StockDataError::Timeout(e.to_string())
    } else {
        StockDataError::Network(e.to_string())
    }
}

/// Translate a non-2xx response into the error taxonomy.
pub fn map_status(symbol: &Symbol, status: StatusCode, body: &str) -> StockDataError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return StockDataError::RateLimit(format!("HTTP 429 for {}", symbol));
    }
    if status == StatusCode::NOT_FOUND || body.contains("Not Found") {
        return StockDataError::InvalidSymbol(symbol.to_string());
    }
    if status.is_server_error() {
        return StockDataError::Network(format!("HTTP {} for {}", status, symbol));
    }
    StockDataError::DataProcessing(format!("HTTP {} for {}: {}", status, symbol, truncate(body, 200)))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; plain numbers also occur.
fn raw(node: &Value, key: &str) -> Option<f64> {
    let v = node.get(key)?;
    v.get("raw")
        .and_then(Value::as_f64)
        .or_else(|| v.as_f64())
        .filter(|x| x.is_finite())
}

fn text(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull `<root>.result[0]`, turning the envelope's error object into an error.
fn envelope_result<'a>(symbol: &Symbol, body: &'a Value, root: &str) -> Result<&'a Value, StockDataError> {
    let envelope = body
        .get(root)
        .ok_or_else(|| StockDataError::DataProcessing(format!("{}: missing '{}' envelope", symbol, root)))?;

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_str).unwrap_or_default();
        let description = error.get("description").and_then(Value::as_str).unwrap_or_default();
        if code == "Not Found" || description.contains("No data found") {
            return Err(StockDataError::InvalidSymbol(symbol.to_string()));
        }
        return Err(StockDataError::DataProcessing(format!("{}: {} {}", symbol, code, description)));
    }

    envelope
        .get("result")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .ok_or_else(|| StockDataError::InvalidSymbol(symbol.to_string()))
}

/// Chart payload to bars. Rows without a close are dropped.
pub fn parse_chart(symbol: &Symbol, body: &Value) -> Result<PriceSeries, StockDataError> {
    let result = envelope_result(symbol, body, "chart")?;

    let timestamps = match result.get("timestamp").and_then(Value::as_array) {
        Some(ts) if !ts.is_empty() => ts,
        _ => return Err(StockDataError::InvalidSymbol(symbol.to_string())),
    };

    let quote = result
        .pointer("/indicators/quote/0")
        .ok_or_else(|| StockDataError::DataProcessing(format!("{}: chart has no quote block", symbol)))?;

    let column = |name: &str| -> Vec<Option<f64>> {
        quote
            .get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(Value::as_f64).collect())
            .unwrap_or_default()
    };
    let opens = column("open");
    let highs = column("high");
    let lows = column("low");
    let closes = column("close");
    let volumes = column("volume");

    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(close) = at(&closes, i) else {
            continue;
        };
        let Some(timestamp) = ts.as_i64().and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) else {
            continue;
        };
        bars.push(Bar {
            timestamp,
            open: at(&opens, i).unwrap_or(close),
            high: at(&highs, i).unwrap_or(close),
            low: at(&lows, i).unwrap_or(close),
            close,
            volume: at(&volumes, i).unwrap_or(0.0),
        });
    }

    if bars.is_empty() {
        return Err(StockDataError::InvalidSymbol(symbol.to_string()));
    }

    PriceSeries::new(symbol.clone(), bars)
}

pub fn parse_company_info(symbol: &Symbol, body: &Value) -> Result<CompanyInfo, StockDataError> {
    let result = envelope_result(symbol, body, "quoteSummary")?;
    let null = Value::Null;
    let profile = result.get("assetProfile").unwrap_or(&null);
    let price = result.get("price").unwrap_or(&null);
    let detail = result.get("summaryDetail").unwrap_or(&null);
    let stats = result.get("defaultKeyStatistics").unwrap_or(&null);

    let mut info = CompanyInfo::minimal(symbol);
    if let Some(name) = text(price, "longName").or_else(|| text(price, "shortName")) {
        info.name = name;
    }
    info.sector = text(profile, "sector");
    info.industry = text(profile, "industry");
    info.website = text(profile, "website");
    info.description = text(profile, "longBusinessSummary");
    info.country = text(profile, "country");
    info.employees = profile
        .get("fullTimeEmployees")
        .and_then(|v| v.get("raw").unwrap_or(v).as_u64());
    info.currency = text(price, "currency").or_else(|| text(detail, "currency"));
    info.exchange = text(price, "exchangeName");
    info.market_cap = raw(price, "marketCap").or_else(|| raw(detail, "marketCap"));
    info.trailing_eps = raw(stats, "trailingEps");
    info.dividend_rate = raw(detail, "dividendRate");
    info.dividend_yield = raw(detail, "dividendYield");
    info.beta = raw(detail, "beta").or_else(|| raw(stats, "beta"));
    info.shares_outstanding = raw(stats, "sharesOutstanding");

    Ok(info)
}

fn latest_row<'a>(result: &'a Value, module: &str, list: &str) -> Option<&'a Value> {
    result
        .get(module)
        .and_then(|m| m.get(list))
        .and_then(Value::as_array)
        .and_then(|rows| rows.first())
}

/// Latest annual statements from the quoteSummary history modules.
pub fn parse_financials(symbol: &Symbol, body: &Value) -> Result<FinancialStatement, StockDataError> {
    let result = envelope_result(symbol, body, "quoteSummary")?;

    let income = latest_row(result, "incomeStatementHistory", "incomeStatementHistory");
    let balance = latest_row(result, "balanceSheetHistory", "balanceSheetStatements");
    let cash = latest_row(result, "cashflowStatementHistory", "cashflowStatements");

    if income.is_none() && balance.is_none() && cash.is_none() {
        return Err(StockDataError::DataProcessing(format!(
            "{}: no financial statements available",
            symbol
        )));
    }

    let null = Value::Null;
    let income = income.unwrap_or(&null);
    let balance = balance.unwrap_or(&null);
    let cash = cash.unwrap_or(&null);
    let financial_data = result.get("financialData").unwrap_or(&null);

    let fiscal_year = income
        .get("endDate")
        .and_then(|d| d.get("raw"))
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y").to_string())
        .and_then(|y| y.parse().ok());

    let total_debt = raw(financial_data, "totalDebt").or_else(|| {
        match (raw(balance, "longTermDebt"), raw(balance, "shortLongTermDebt")) {
            (None, None) => None,
            (long, short) => Some(long.unwrap_or(0.0) + short.unwrap_or(0.0)),
        }
    });

    Ok(FinancialStatement {
        fiscal_year,
        revenue: raw(income, "totalRevenue"),
        cost_of_revenue: raw(income, "costOfRevenue"),
        gross_profit: raw(income, "grossProfit"),
        operating_income: raw(income, "operatingIncome"),
        net_income: raw(income, "netIncome"),
        total_assets: raw(balance, "totalAssets"),
        total_liabilities: raw(balance, "totalLiab"),
        stockholders_equity: raw(balance, "totalStockholderEquity"),
        current_assets: raw(balance, "totalCurrentAssets"),
        current_liabilities: raw(balance, "totalCurrentLiabilities"),
        inventory: raw(balance, "inventory"),
        total_debt,
        operating_cash_flow: raw(cash, "totalCashFromOperatingActivities"),
        investing_cash_flow: raw(cash, "totalCashflowsFromInvestingActivities"),
        financing_cash_flow: raw(cash, "totalCashFromFinancingActivities"),
        capital_expenditures: raw(cash, "capitalExpenditures"),
    })
}

/// Search payload to news items, at most `limit` of them.
pub fn parse_news(body: &Value, limit: usize) -> Vec<NewsItem> {
    body.get("news")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let title = text(item, "title")?;
                    Some(NewsItem {
                        title,
                        publisher: text(item, "publisher"),
                        url: text(item, "link"),
                        published_at: item
                            .get("providerPublishTime")
                            .and_then(Value::as_i64)
                            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
                    })
                })
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}
