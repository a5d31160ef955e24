use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use nasdaq_scanner::analysis::{ScanSettings, load_report, save_report, scan_symbol, scan_universe};
use nasdaq_scanner::classifier::{Classification, Thresholds};
use nasdaq_scanner::indicators::OscillatorParams;
use nasdaq_scanner::price_source::PriceSource;
use nasdaq_scanner::report::{BatchReport, BuySignal, TickerEntry};
use nasdaq_scanner::series::{PriceSeries, Resolution};
use nasdaq_scanner::storage_utils::AsyncStorageManager;
use nasdaq_scanner::timeframes::StochRsiSource;
use nasdaq_scanner::{Result, ScanError};
use std::collections::HashMap;
use tempfile::TempDir;

/// Serves canned series; anything not registered fails like a dead endpoint.
#[derive(Default)]
struct StubSource {
    series: HashMap<(String, Resolution), PriceSeries>,
}

impl StubSource {
    fn with(mut self, symbol: &str, resolution: Resolution, closes: &[f64]) -> Self {
        let step = match resolution {
            Resolution::Daily => Duration::days(1),
            Resolution::Weekly => Duration::weeks(1),
        };
        let start = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let series = PriceSeries::normalize(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| (start + step * i as i32, Some(c))),
        );
        self.series.insert((symbol.to_string(), resolution), series);
        self
    }
}

#[async_trait]
impl PriceSource for StubSource {
    async fn fetch(&self, symbol: &str, resolution: Resolution, _lookback: &str) -> Result<PriceSeries> {
        self.series
            .get(&(symbol.to_string(), resolution))
            .cloned()
            .ok_or_else(|| ScanError::InvalidResponse(format!("no stub for {}", symbol)))
    }
}

fn settings() -> ScanSettings {
    ScanSettings {
        daily_range: "60d".to_string(),
        weekly_range: "1y".to_string(),
        oscillators: OscillatorParams::default(),
        thresholds: Thresholds::default(),
        concurrency: 3,
    }
}

fn falling(len: usize) -> Vec<f64> {
    (0..len).map(|i| 200.0 - i as f64 * 2.0).collect()
}

fn rising(len: usize) -> Vec<f64> {
    (0..len).map(|i| 50.0 + i as f64).collect()
}

fn symbols(list: &[nasdaq_scanner::report::SymbolReport]) -> Vec<&str> {
    list.iter().map(|r| r.symbol.as_str()).collect()
}

#[tokio::test]
async fn test_scan_universe_classifies_and_sorts() {
    let source = StubSource::default()
        .with("ZZZ", Resolution::Daily, &rising(40))
        .with("ZZZ", Resolution::Weekly, &rising(20))
        .with("AAA", Resolution::Daily, &falling(40))
        .with("AAA", Resolution::Weekly, &falling(20));

    let universe: Vec<String> = ["ZZZ", "CCC", "AAA"].into_iter().map(String::from).collect();
    let batch = scan_universe(&source, &universe, &settings()).await;

    assert_eq!(symbols(&batch.all), vec!["AAA", "CCC", "ZZZ"]);
    assert_eq!(symbols(&batch.recommended), vec!["AAA"]);
    assert!(batch.good.is_empty());

    let aaa = &batch.all[0];
    assert_eq!(aaa.classification, Classification::RecommendedBuy);
    assert_eq!(aaa.price, 122.0);
    assert_eq!(aaa.weekly.rsi, Some(0.0));
    assert_eq!(aaa.weekly.stoch_rsi, Some(0.0));
    assert_eq!(aaa.weekly.stoch_rsi_source, Some(StochRsiSource::RsiProxy));

    let ccc = &batch.all[1];
    assert_eq!(ccc.price, 0.0);
    assert_eq!(ccc.classification, Classification::NoSignal);
    assert_eq!(ccc.daily.rsi, None);
    assert_eq!(ccc.daily.stoch_rsi, None);
    assert_eq!(ccc.weekly.rsi, None);
    assert_eq!(ccc.weekly.stoch_rsi, None);

    let zzz = &batch.all[2];
    assert_eq!(zzz.weekly.rsi, Some(100.0));
    assert_eq!(zzz.classification, Classification::NoSignal);
}

#[tokio::test]
async fn test_weekly_only_symbol_still_classified() {
    let source = StubSource::default().with("WKY", Resolution::Weekly, &falling(25));

    let report = scan_symbol(&source, "WKY", &settings()).await;
    assert_eq!(report.price, 0.0);
    assert_eq!(report.daily.rsi, None);
    assert_eq!(report.classification, Classification::RecommendedBuy);
    assert_eq!(report.ticker_entry().price, "N/A");
}

#[tokio::test]
async fn test_short_history_has_no_signal() {
    let source = StubSource::default()
        .with("NEW", Resolution::Daily, &falling(10))
        .with("NEW", Resolution::Weekly, &falling(3));

    let report = scan_symbol(&source, "NEW", &settings()).await;
    assert_eq!(report.price, 182.0);
    assert_eq!(report.weekly.rsi, None);
    assert_eq!(report.weekly.stoch_rsi, None);
    assert_eq!(report.classification, Classification::NoSignal);
}

#[tokio::test]
async fn test_report_files_are_written() {
    let dir = TempDir::new().unwrap();
    let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

    let source = StubSource::default()
        .with("AAA", Resolution::Daily, &falling(40))
        .with("AAA", Resolution::Weekly, &falling(20));
    let universe = vec!["AAA".to_string(), "CCC".to_string()];
    let batch = scan_universe(&source, &universe, &settings()).await;

    save_report(&storage, &batch).await.unwrap();

    let loaded: BatchReport = load_report(&storage).await.unwrap();
    assert_eq!(loaded, batch);

    let recommended: Vec<BuySignal> = storage.load("recommended_buys").await.unwrap();
    assert_eq!(recommended.len(), 1);
    assert_eq!(recommended[0].symbol, "AAA");

    let good: Vec<BuySignal> = storage.load("good_buys").await.unwrap();
    assert!(good.is_empty());

    let tickers: Vec<TickerEntry> = storage.load("tickers").await.unwrap();
    assert_eq!(tickers.len(), 2);
    assert_eq!(tickers[0].price, "122.00");
    assert_eq!(tickers[1].price, "N/A");
}
