//! Daily and weekly indicator pairs for one symbol.

use crate::error::ScanError;
use crate::indicators::{self, OscillatorParams};
use crate::series::{PriceSeries, Resolution};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a stochastic RSI value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StochRsiSource {
    Computed,
    /// Rescaled RSI standing in for a real oscillator on short weekly history.
    RsiProxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: Option<f64>,
    pub stoch_rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoch_rsi_source: Option<StochRsiSource>,
}

impl IndicatorSet {
    pub fn undefined() -> Self {
        Self::default()
    }

    pub fn is_proxy(&self) -> bool {
        self.stoch_rsi_source == Some(StochRsiSource::RsiProxy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeframeIndicators {
    pub daily: IndicatorSet,
    pub weekly: IndicatorSet,
}

/// Maps RSI 30..=70 linearly onto 0..=100, clamping outside that band.
pub fn rsi_proxy(rsi: f64) -> f64 {
    if rsi < 30.0 {
        0.0
    } else if rsi > 70.0 {
        100.0
    } else {
        (rsi - 30.0) * (100.0 / (70.0 - 30.0))
    }
}

fn log_gap(resolution: Resolution, indicator: &str, err: &ScanError) {
    debug!(%resolution, indicator, error = %err, "Indicator undefined");
}

pub fn indicator_set(series: &PriceSeries, resolution: Resolution, params: &OscillatorParams) -> IndicatorSet {
    let rsi = indicators::try_rsi(series, params.rsi_period)
        .inspect_err(|e| log_gap(resolution, "rsi", e))
        .ok();

    let stoch_rsi = indicators::try_stochastic_rsi(series, params)
        .inspect_err(|e| log_gap(resolution, "stoch_rsi", e))
        .ok();

    IndicatorSet {
        rsi,
        stoch_rsi,
        stoch_rsi_source: stoch_rsi.map(|_| StochRsiSource::Computed),
    }
}

/// Runs the oscillators on each timeframe independently.
///
/// Weekly history shorter than `rsi_period + stoch_period + smooth_k` with a
/// defined RSI gets [`rsi_proxy`] as its stochastic value.
pub fn aggregate(daily: &PriceSeries, weekly: &PriceSeries, params: &OscillatorParams) -> TimeframeIndicators {
    let daily_set = indicator_set(daily, Resolution::Daily, params);
    let mut weekly_set = indicator_set(weekly, Resolution::Weekly, params);

    if weekly_set.stoch_rsi.is_none() && weekly.len() < params.stoch_min_samples() {
        if let Some(rsi) = weekly_set.rsi {
            let proxy = rsi_proxy(rsi);
            debug!(weekly_samples = weekly.len(), rsi, proxy, "Using RSI proxy for weekly stochastic RSI");
            weekly_set.stoch_rsi = Some(proxy);
            weekly_set.stoch_rsi_source = Some(StochRsiSource::RsiProxy);
        }
    }

    TimeframeIndicators {
        daily: daily_set,
        weekly: weekly_set,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::tests::series_from_closes;

    fn rising(len: usize) -> PriceSeries {
        series_from_closes(&(0..len).map(|i| 10.0 + i as f64).collect::<Vec<_>>())
    }

    fn zigzag(len: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..len)
            .map(|i| 100.0 + (i % 5) as f64 * 2.0 - (i % 3) as f64 * 3.0 + i as f64 * 0.1)
            .collect();
        series_from_closes(&closes)
    }

    #[test]
    fn test_rsi_proxy_values() {
        assert_eq!(rsi_proxy(50.0), 50.0);
        assert_eq!(rsi_proxy(20.0), 0.0);
        assert_eq!(rsi_proxy(80.0), 100.0);
        assert_eq!(rsi_proxy(30.0), 0.0);
        assert_eq!(rsi_proxy(70.0), 100.0);
    }

    #[test]
    fn test_short_weekly_uses_proxy() {
        let params = OscillatorParams::default();
        let out = aggregate(&PriceSeries::empty(), &rising(20), &params);

        assert_eq!(out.weekly.rsi, Some(100.0));
        assert_eq!(out.weekly.stoch_rsi, Some(100.0));
        assert!(out.weekly.is_proxy());
    }

    #[test]
    fn test_daily_never_uses_proxy() {
        let params = OscillatorParams::default();
        let out = aggregate(&rising(20), &PriceSeries::empty(), &params);

        assert_eq!(out.daily.rsi, Some(100.0));
        assert_eq!(out.daily.stoch_rsi, None);
        assert_eq!(out.daily.stoch_rsi_source, None);
    }

    #[test]
    fn test_weekly_too_short_for_rsi_stays_undefined() {
        let params = OscillatorParams::default();
        let out = aggregate(&PriceSeries::empty(), &rising(10), &params);
        assert_eq!(out.weekly, IndicatorSet::undefined());
    }

    #[test]
    fn test_long_weekly_is_computed() {
        let params = OscillatorParams::default();
        let out = aggregate(&zigzag(60), &zigzag(60), &params);

        assert!(out.weekly.rsi.is_some());
        let stoch = out.weekly.stoch_rsi.expect("stochastic rsi should be defined");
        assert!((0.0..=100.0).contains(&stoch));
        assert_eq!(out.weekly.stoch_rsi_source, Some(StochRsiSource::Computed));
        assert_eq!(out.daily.stoch_rsi_source, Some(StochRsiSource::Computed));
    }

    #[test]
    fn test_long_flat_weekly_does_not_fall_back() {
        let params = OscillatorParams::default();
        let out = aggregate(&PriceSeries::empty(), &rising(40), &params);
        assert_eq!(out.weekly.rsi, Some(100.0));
        assert_eq!(out.weekly.stoch_rsi, None);
    }
}
