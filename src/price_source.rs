use crate::error::{Result, ScanError};
use crate::series::{PriceSeries, Resolution};
use crate::storage_utils::SourceConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can hand back a closing-price history for a symbol.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `lookback` is a range token such as `"60d"` or `"1y"`.
    async fn fetch(&self, symbol: &str, resolution: Resolution, lookback: &str) -> Result<PriceSeries>;
}

// Shape of the chart endpoint; only the fields we read.

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize, Debug)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn parse_chart(symbol: &str, body: &[u8]) -> Result<PriceSeries> {
    let response: ChartResponse = serde_json::from_slice(body)?;

    if let Some(err) = response.chart.error {
        return Err(ScanError::InvalidResponse(format!(
            "{}: {} {}",
            symbol, err.code, err.description
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(ScanError::data_unavailable(symbol));
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Err(ScanError::data_unavailable(symbol));
    };

    let series = PriceSeries::from_parallel(&result.timestamp, &quote.close);
    if series.is_empty() {
        return Err(ScanError::data_unavailable(symbol));
    }
    Ok(series)
}

/// Yahoo Finance v8 chart API.
pub struct YahooChartSource {
    client: Client,
    config: SourceConfig,
}

impl YahooChartSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(50)
            .build()?;

        Ok(Self { client, config })
    }

    async fn fetch_once(&self, symbol: &str, resolution: Resolution, lookback: &str) -> Result<PriceSeries> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), symbol);
        let query = [("range", lookback), ("interval", resolution.interval())];

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScanError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ScanError::data_unavailable(symbol));
        }

        let body = response.error_for_status()?.bytes().await?;
        parse_chart(symbol, &body)
    }

    /// Linear back-off for the given retry attempt.
    fn retry_wait(&self, attempt: usize) -> Duration {
        let attempt = u64::try_from(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.config.retry_delay_ms.saturating_mul(attempt))
    }

    fn is_retryable(err: &ScanError) -> bool {
        match err {
            ScanError::RateLimited { .. } => true,
            ScanError::Http(e) => e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error()),
            _ => false,
        }
    }
}

#[async_trait]
impl PriceSource for YahooChartSource {
    async fn fetch(&self, symbol: &str, resolution: Resolution, lookback: &str) -> Result<PriceSeries> {
        if self.config.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(symbol, resolution, lookback).await {
                Ok(series) => {
                    debug!(symbol, %resolution, samples = series.len(), "Fetched price history");
                    return Ok(series);
                }
                Err(e) if attempt < self.config.retry_max && Self::is_retryable(&e) => {
                    attempt += 1;
                    let wait = self.retry_wait(attempt);
                    warn!(symbol, %resolution, attempt, error = %e, "Retrying price fetch in {:?}", wait);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
