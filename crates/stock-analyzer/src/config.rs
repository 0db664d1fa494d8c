use analysis_core::{HistoricalPeriod, Interval, Symbol};
use anyhow::{bail, Context, Result};
use market_data_client::FetchConfig;
use std::path::PathBuf;

pub const DEFAULT_PROVIDER: &str = "yahoo_finance";
pub const DEFAULT_BENCHMARK: &str = "^GSPC";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub fetch: FetchConfig,
    pub provider: String,
    pub symbols: Vec<Symbol>,
    pub period: HistoricalPeriod,
    pub interval: Interval,
    pub concurrency: usize,
    pub news_limit: usize,
    pub output: Option<PathBuf>,
    /// JSON file with a list of positions; switches the run to portfolio mode
    pub portfolio: Option<PathBuf>,
    pub benchmark: Option<Symbol>,
}

impl AnalyzerConfig {
    /// Environment layer: `STOCK_SYMBOLS` (comma separated), `DATA_PROVIDER`,
    /// `HISTORICAL_PERIOD`, `BAR_INTERVAL`, `BATCH_CONCURRENCY`, `NEWS_LIMIT`,
    /// `BENCHMARK_SYMBOL`, plus everything [`FetchConfig::from_env`] reads.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = FetchConfig::from_lookup(&lookup).context("Invalid fetch configuration")?;

        let symbols = match lookup("STOCK_SYMBOLS") {
            Some(raw) => parse_symbols(raw.split(',')).context("Invalid STOCK_SYMBOLS")?,
            None => Vec::new(),
        };

        let period = match lookup("HISTORICAL_PERIOD") {
            Some(raw) => raw.parse().context("Invalid HISTORICAL_PERIOD")?,
            None => HistoricalPeriod::default(),
        };

        let interval = match lookup("BAR_INTERVAL") {
            Some(raw) => raw.parse().context("Invalid BAR_INTERVAL")?,
            None => Interval::default(),
        };

        let concurrency = match lookup("BATCH_CONCURRENCY") {
            Some(raw) => parse_count(&raw).context("Invalid BATCH_CONCURRENCY")?,
            None => 1,
        };

        let news_limit = match lookup("NEWS_LIMIT") {
            Some(raw) => raw.trim().parse().context("Invalid NEWS_LIMIT")?,
            None => analysis_orchestrator::DEFAULT_NEWS_LIMIT,
        };

        let benchmark = match lookup("BENCHMARK_SYMBOL") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(Symbol::parse(&raw).context("Invalid BENCHMARK_SYMBOL")?),
            None => Some(Symbol::parse(DEFAULT_BENCHMARK)?),
        };

        Ok(Self {
            fetch,
            provider: lookup("DATA_PROVIDER").unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            symbols,
            period,
            interval,
            concurrency,
            news_limit,
            output: None,
            portfolio: None,
            benchmark,
        })
    }

    /// Command-line layer on top of the environment. Returns `false` when
    /// `--help` was requested.
    pub fn apply_args(&mut self, args: &[String]) -> Result<bool> {
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            let value = |i: usize| -> Result<&String> {
                args.get(i + 1)
                    .filter(|v| !v.starts_with("--"))
                    .with_context(|| format!("{} needs a value", flag))
            };

            match flag {
                "--help" | "-h" => return Ok(false),
                "--symbols" => {
                    let list: Vec<&String> = args[i + 1..].iter().take_while(|a| !a.starts_with("--")).collect();
                    if list.is_empty() {
                        bail!("--symbols needs at least one ticker");
                    }
                    i += list.len();
                    self.symbols = parse_symbols(list.iter().flat_map(|a| a.split(',')))?;
                }
                "--period" => {
                    self.period = value(i)?.parse().context("Invalid --period")?;
                    i += 1;
                }
                "--interval" => {
                    self.interval = value(i)?.parse().context("Invalid --interval")?;
                    i += 1;
                }
                "--concurrency" => {
                    self.concurrency = parse_count(value(i)?).context("Invalid --concurrency")?;
                    i += 1;
                }
                "--provider" => {
                    self.provider = value(i)?.clone();
                    i += 1;
                }
                "--output" => {
                    self.output = Some(PathBuf::from(value(i)?));
                    i += 1;
                }
                "--portfolio" => {
                    self.portfolio = Some(PathBuf::from(value(i)?));
                    i += 1;
                }
                "--benchmark" => {
                    let raw = value(i)?;
                    self.benchmark = if raw.eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(Symbol::parse(raw).context("Invalid --benchmark")?)
                    };
                    i += 1;
                }
                other => bail!("Unknown argument '{}'", other),
            }
            i += 1;
        }
        Ok(true)
    }
}

fn parse_symbols<'a, I>(raw: I) -> Result<Vec<Symbol>>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| Symbol::parse(s).map_err(anyhow::Error::from))
        .collect()
}

fn parse_count(raw: &str) -> Result<usize> {
    let n: usize = raw.trim().parse()?;
    if n == 0 {
        bail!("must be at least 1");
    }
    Ok(n)
}

pub fn usage() -> String {
    [
        "Usage:",
        "  stock-analyzer --symbols AAPL MSFT ...   Analyze symbols (or set STOCK_SYMBOLS)",
        "  stock-analyzer --portfolio positions.json  Portfolio metrics for a list of positions",
        "",
        "Options:",
        "  --period P         1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max (default: 1y)",
        "  --interval I       1d 1wk 1mo (default: 1d)",
        "  --concurrency N    Symbols in flight at once (default: 1)",
        "  --provider NAME    Data provider (default: yahoo_finance)",
        "  --output PATH      Write JSON here instead of stdout",
        "  --benchmark SYM    Portfolio benchmark, or 'none' (default: ^GSPC)",
    ]
    .join("\n")
}
