//! This module contains the core analysis pipeline logic.

use crate::classifier::Thresholds;
use crate::find_tickers;
use crate::indicators::OscillatorParams;
use crate::price_source::{PriceSource, YahooChartSource};
use crate::report::{BatchReport, SymbolReport};
use crate::series::{PriceSeries, Resolution};
use crate::storage_utils::{AppConfig, AsyncStorageManager};
use crate::timeframes;
use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// What a scan needs besides the price source.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub daily_range: String,
    pub weekly_range: String,
    pub oscillators: OscillatorParams,
    pub thresholds: Thresholds,
    pub concurrency: usize,
}

impl From<&AppConfig> for ScanSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            daily_range: config.source.daily_range.clone(),
            weekly_range: config.source.weekly_range.clone(),
            oscillators: config.oscillators,
            thresholds: config.thresholds,
            concurrency: config.concurrency,
        }
    }
}

/// Fetches one resolution; any failure becomes an empty series.
async fn fetch_or_empty<S: PriceSource + ?Sized>(
    source: &S,
    symbol: &str,
    resolution: Resolution,
    lookback: &str,
) -> PriceSeries {
    match source.fetch(symbol, resolution, lookback).await {
        Ok(series) => series,
        Err(e) if e.is_data_gap() => {
            debug!(symbol, %resolution, error = %e, "No price history");
            PriceSeries::empty()
        }
        Err(e) => {
            warn!(symbol, %resolution, error = %e, "Price fetch failed");
            PriceSeries::empty()
        }
    }
}

/// Builds the report for one symbol. Never fails: missing data only leaves
/// indicators undefined.
pub async fn scan_symbol<S: PriceSource + ?Sized>(source: &S, symbol: &str, settings: &ScanSettings) -> SymbolReport {
    let daily = fetch_or_empty(source, symbol, Resolution::Daily, &settings.daily_range).await;
    let weekly = fetch_or_empty(source, symbol, Resolution::Weekly, &settings.weekly_range).await;

    if daily.is_empty() && weekly.is_empty() {
        warn!(symbol, "No price data, reporting as unavailable");
        return SymbolReport::unavailable(symbol);
    }

    let indicators = timeframes::aggregate(&daily, &weekly, &settings.oscillators);
    let classification = settings
        .thresholds
        .classify(indicators.weekly.rsi, indicators.weekly.stoch_rsi);

    let report = SymbolReport {
        symbol: symbol.to_string(),
        price: daily.latest_close().unwrap_or(0.0),
        daily: indicators.daily,
        weekly: indicators.weekly,
        classification,
    };

    info!(
        symbol,
        price = report.price,
        weekly_rsi = ?report.weekly.rsi,
        weekly_stoch_rsi = ?report.weekly.stoch_rsi,
        classification = report.classification.label(),
        "Processed"
    );
    report
}

/// Scans every symbol with at most `settings.concurrency` in flight and
/// collects the sorted batch.
pub async fn scan_universe<S: PriceSource + ?Sized>(
    source: &S,
    universe: &[String],
    settings: &ScanSettings,
) -> BatchReport {
    info!(symbols = universe.len(), concurrency = settings.concurrency, "Scanning ticker universe");

    // Futures are lazy; buffer_unordered decides how many run at once.
    let tasks: Vec<_> = universe
        .iter()
        .map(|symbol| scan_symbol(source, symbol, settings))
        .collect();
    let reports: Vec<SymbolReport> = stream::iter(tasks)
        .buffer_unordered(settings.concurrency.max(1))
        .collect()
        .await;

    let batch = BatchReport::build(universe.iter().map(String::as_str), reports, Utc::now());
    info!(
        recommended = batch.recommended.len(),
        good = batch.good.len(),
        total = batch.all.len(),
        "Scan complete"
    );
    batch
}

/// Writes the report and the buy/ticker lists derived from it.
pub async fn save_report(storage: &AsyncStorageManager, batch: &BatchReport) -> Result<()> {
    storage.save("report", batch).await?;
    storage.save("recommended_buys", &batch.recommended_buys()).await?;
    storage.save("good_buys", &batch.good_buys()).await?;
    storage.save("tickers", &batch.tickers()).await?;
    Ok(())
}

pub async fn load_report(storage: &AsyncStorageManager) -> Result<BatchReport> {
    storage.load("report").await
}

/// Runs the full analysis pipeline:
/// 1. Resolves the ticker universe.
/// 2. Fetches daily and weekly history and scans each symbol.
/// 3. Saves the batch report.
pub async fn run_analysis_pipeline(storage: &AsyncStorageManager) -> Result<BatchReport> {
    let app_config = storage.load_or_init_config().await?;

    // Step 1: Ticker universe
    let universe = find_tickers::resolve_universe(storage, &app_config).await;
    if universe.is_empty() {
        anyhow::bail!("ticker universe is empty");
    }

    // Step 2: Scan
    let source = YahooChartSource::new(app_config.source.clone())?;
    let batch = scan_universe(&source, &universe, &ScanSettings::from(&app_config)).await;

    // Step 3: Persist
    save_report(storage, &batch).await?;
    info!(path = ?storage.base_dir, "Results saved");

    Ok(batch)
}
