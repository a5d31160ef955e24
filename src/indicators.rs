//! RSI and Stochastic RSI.
//!
//! Every indicator here is a small state machine fed one close at a time
//! through [`Next`]. The `*_series` helpers run one over a whole
//! [`PriceSeries`] and keep one slot per input timestamp, `None` until enough
//! history has been seen.

use crate::error::{Result, ScanError};
use crate::series::PriceSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Feeds one input into an indicator and returns its value for that step.
pub trait Next<T> {
    type Output;
    fn next(&mut self, input: T) -> Self::Output;
}

/// Longest lookback any indicator accepts.
pub const MAX_PERIOD: usize = 10_000;

fn check_period(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ScanError::Config(format!("{} must be greater than 0", name)));
    }
    if value > MAX_PERIOD {
        return Err(ScanError::Config(format!("{} must be at most {}", name, MAX_PERIOD)));
    }
    Ok(())
}

/// Lookback periods for the oscillators.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OscillatorParams {
    pub rsi_period: usize,
    pub stoch_period: usize,
    pub smooth_k: usize,
    pub smooth_d: usize,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            stoch_period: 14,
            smooth_k: 3,
            smooth_d: 3,
        }
    }
}

impl OscillatorParams {
    /// Samples needed before %K is considered defined.
    pub fn stoch_min_samples(&self) -> usize {
        self.rsi_period
            .saturating_add(self.stoch_period)
            .saturating_add(self.smooth_k)
    }

    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("stoch_period", self.stoch_period),
            ("smooth_k", self.smooth_k),
            ("smooth_d", self.smooth_d),
        ];
        for (name, value) in periods {
            check_period(name, value)?;
        }
        Ok(())
    }
}

/// Wilder-smoothed Relative Strength Index.
pub struct RelativeStrengthIndex {
    period: usize,
    prev_close: Option<f64>,
    changes: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl RelativeStrengthIndex {
    pub fn new(period: usize) -> Result<Self> {
        check_period("RSI period", period)?;

        Ok(Self {
            period,
            prev_close: None,
            changes: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        })
    }

    fn value(&self) -> f64 {
        if self.avg_loss == 0.0 {
            return 100.0;
        }
        let rs = self.avg_gain / self.avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

impl Next<f64> for RelativeStrengthIndex {
    type Output = Option<f64>;

    fn next(&mut self, close: f64) -> Self::Output {
        let prev = self.prev_close.replace(close)?;
        let change = close - prev;
        let (gain, loss) = if change >= 0.0 { (change, 0.0) } else { (0.0, -change) };

        self.changes += 1;
        let period = self.period as f64;

        if self.changes < self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            return None;
        }

        if self.changes == self.period {
            // Seed with the simple mean of the first `period` changes.
            self.avg_gain = (self.gain_sum + gain) / period;
            self.avg_loss = (self.loss_sum + loss) / period;
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }

        Some(self.value())
    }
}

/// Simple moving average over a stream that may contain gaps.
/// A window holding any gap yields `None`.
pub struct SimpleMovingAverage {
    period: usize,
    window: VecDeque<Option<f64>>,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Result<Self> {
        check_period("SMA period", period)?;

        Ok(Self {
            period,
            window: VecDeque::with_capacity(period),
        })
    }
}

impl Next<Option<f64>> for SimpleMovingAverage {
    type Output = Option<f64>;

    fn next(&mut self, input: Option<f64>) -> Self::Output {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(input);

        if self.window.len() < self.period {
            return None;
        }

        let sum = self.window.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
        Some(sum / self.period as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StochRsiOutput {
    pub k: Option<f64>,
    pub d: Option<f64>,
}

/// Stochastic RSI: where the RSI sits inside its own recent range, smoothed
/// into %K and %D.
pub struct StochasticRsi {
    rsi: RelativeStrengthIndex,
    stoch_period: usize,
    rsi_window: VecDeque<f64>,
    smooth_k: SimpleMovingAverage,
    smooth_d: SimpleMovingAverage,
}

impl StochasticRsi {
    pub fn new(params: &OscillatorParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            rsi: RelativeStrengthIndex::new(params.rsi_period)?,
            stoch_period: params.stoch_period,
            rsi_window: VecDeque::with_capacity(params.stoch_period),
            smooth_k: SimpleMovingAverage::new(params.smooth_k)?,
            smooth_d: SimpleMovingAverage::new(params.smooth_d)?,
        })
    }

    fn raw(&mut self, rsi: f64) -> Option<f64> {
        if self.rsi_window.len() == self.stoch_period {
            self.rsi_window.pop_front();
        }
        self.rsi_window.push_back(rsi);

        if self.rsi_window.len() < self.stoch_period {
            return None;
        }

        let (min, max) = self
            .rsi_window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max - min;
        if range <= 0.0 {
            // Flat RSI over the window has no position to report.
            return None;
        }

        Some((rsi - min) / range * 100.0)
    }
}

impl Next<f64> for StochasticRsi {
    type Output = StochRsiOutput;

    fn next(&mut self, close: f64) -> Self::Output {
        let raw = match self.rsi.next(close) {
            Some(rsi) => self.raw(rsi),
            None => return StochRsiOutput::default(),
        };
        let k = self.smooth_k.next(raw);
        let d = self.smooth_d.next(k);
        StochRsiOutput { k, d }
    }
}

/// Indicator values aligned one-to-one with the timestamps of a series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    fn undefined(series: &PriceSeries) -> Self {
        Self {
            timestamps: series.timestamps().collect(),
            values: vec![None; series.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value at the most recent timestamp.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    /// Only the defined points, in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .filter_map(|(&ts, v)| v.map(|v| (ts, v)))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochRsiSeries {
    pub k: IndicatorSeries,
    pub d: IndicatorSeries,
}

pub fn rsi_series(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let Ok(mut rsi) = RelativeStrengthIndex::new(period) else {
        return IndicatorSeries::undefined(series);
    };

    IndicatorSeries {
        timestamps: series.timestamps().collect(),
        values: series.closes().map(|close| rsi.next(close)).collect(),
    }
}

pub fn stochastic_rsi_series(series: &PriceSeries, params: &OscillatorParams) -> StochRsiSeries {
    let Ok(mut stoch) = StochasticRsi::new(params) else {
        return StochRsiSeries {
            k: IndicatorSeries::undefined(series),
            d: IndicatorSeries::undefined(series),
        };
    };

    let timestamps: Vec<_> = series.timestamps().collect();
    let (k, d): (Vec<_>, Vec<_>) = series
        .closes()
        .map(|close| {
            let out = stoch.next(close);
            (out.k, out.d)
        })
        .unzip();

    StochRsiSeries {
        k: IndicatorSeries {
            timestamps: timestamps.clone(),
            values: k,
        },
        d: IndicatorSeries { timestamps, values: d },
    }
}

/// Latest RSI, or why it could not be computed.
pub fn try_rsi(series: &PriceSeries, period: usize) -> Result<f64> {
    let needed = period.saturating_add(1);
    if period == 0 || series.len() < needed {
        return Err(ScanError::InsufficientHistory {
            needed,
            available: series.len(),
        });
    }

    rsi_series(series, period)
        .latest()
        .ok_or(ScanError::InsufficientHistory {
            needed,
            available: series.len(),
        })
}

pub fn compute_rsi(series: &PriceSeries, period: usize) -> Option<f64> {
    try_rsi(series, period).ok()
}

/// Latest %K, or why it could not be computed.
///
/// Enough samples can still produce no value when the RSI was flat across the
/// stochastic window; that case reports `InsufficientHistory` with
/// `needed == available`.
pub fn try_stochastic_rsi(series: &PriceSeries, params: &OscillatorParams) -> Result<f64> {
    params.validate()?;

    let needed = params.stoch_min_samples();
    let available = series.len();
    if available < needed {
        return Err(ScanError::InsufficientHistory { needed, available });
    }

    stochastic_rsi_series(series, params)
        .k
        .latest()
        .ok_or(ScanError::InsufficientHistory {
            needed: available,
            available,
        })
}

pub fn compute_stochastic_rsi(series: &PriceSeries, params: &OscillatorParams) -> Option<f64> {
    try_stochastic_rsi(series, params).ok()
}
