//! stock-analyzer: fetch market data for a list of symbols and print one JSON
//! record per symbol with technical, fundamental and performance metrics.
//!
//! Usage:
//!   cargo run -p stock-analyzer -- --symbols AAPL MSFT GOOGL
//!   cargo run -p stock-analyzer -- --symbols AAPL MSFT --period 6mo --output out.json
//!   cargo run -p stock-analyzer -- --portfolio positions.json --benchmark ^GSPC

mod config;
mod logging;

use analysis_core::StockDataError;
use analysis_orchestrator::{AnalysisOrchestrator, BatchOptions};
use anyhow::{Context, Result};
use config::AnalyzerConfig;
use market_data_client::ProviderRegistry;
use quant_analysis::Position;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = AnalyzerConfig::from_env()?;
    if !config.apply_args(&args)? {
        println!("{}", config::usage());
        return Ok(());
    }

    if config.symbols.is_empty() && config.portfolio.is_none() {
        eprintln!("{}", config::usage());
        std::process::exit(1);
    }

    let limiter = config.fetch.limiter();
    let provider = ProviderRegistry::with_defaults().create(&config.provider, &config.fetch, limiter)?;

    let orchestrator = AnalysisOrchestrator::new(provider)
        .with_period(config.period)
        .with_interval(config.interval)
        .with_news_limit(config.news_limit);

    tracing::info!(
        "Using provider '{}' with {:?} cooldown",
        orchestrator.provider_name(),
        config.fetch.cooldown_period
    );

    if let Some(path) = &config.portfolio {
        let positions = load_positions(path)?;
        tracing::info!("Loaded {} positions from {}", positions.len(), path.display());

        let report = orchestrator.analyze_portfolio(&positions, config.benchmark.as_ref()).await;
        for warning in &report.warnings {
            tracing::warn!("{}", warning);
        }
        export(&report, config.output.as_deref())?;
        return Ok(());
    }

    let records = orchestrator
        .fetch_and_analyze_with(
            &config.symbols,
            BatchOptions {
                concurrency: config.concurrency,
            },
        )
        .await;

    export(&records, config.output.as_deref())?;
    Ok(())
}

fn load_positions(path: &Path) -> Result<Vec<Position>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse positions in {}", path.display()))
}

fn export<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StockDataError::Export(format!("serialization failed: {}", e)))?;

    match output {
        Some(path) => {
            std::fs::write(path, json.as_bytes())
                .map_err(|e| StockDataError::Export(format!("{}: {}", path.display(), e)))
                .context("Failed to write results")?;
            tracing::info!("Results written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)
                .map_err(|e| StockDataError::Export(format!("stdout: {}", e)))
                .context("Failed to write results")?;
        }
    }
    Ok(())
}
