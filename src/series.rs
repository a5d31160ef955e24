//! Price samples and the normalizer that turns raw chart data into a clean series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bar width of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Daily,
    Weekly,
}

impl Resolution {
    /// Interval token understood by the chart API.
    pub fn interval(&self) -> &'static str {
        match self {
            Resolution::Daily => "1d",
            Resolution::Weekly => "1wk",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Daily => write!(f, "daily"),
            Resolution::Weekly => write!(f, "weekly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Closing prices for one symbol at one resolution.
///
/// Timestamps are strictly increasing and every close is a finite number.
/// The only way to build one is through [`PriceSeries::normalize`] (or its
/// parallel-array sibling), so those guarantees always hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    samples: Vec<PriceSample>,
}

impl PriceSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Drops missing and non-finite closes, orders by timestamp and keeps the
    /// first sample seen for each timestamp.
    pub fn normalize<I>(raw: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Utc>, Option<f64>)>,
    {
        let mut samples: Vec<PriceSample> = raw
            .into_iter()
            .filter_map(|(timestamp, close)| match close {
                Some(close) if close.is_finite() => Some(PriceSample { timestamp, close }),
                _ => None,
            })
            .collect();

        // Stable sort keeps input order among equal timestamps, so dedup keeps the first.
        samples.sort_by_key(|s| s.timestamp);
        samples.dedup_by_key(|s| s.timestamp);

        Self { samples }
    }

    /// Normalizes the parallel `timestamp` / `close` arrays of a chart response.
    /// Timestamps are epoch seconds; a surplus tail on either side is ignored.
    pub fn from_parallel(timestamps: &[i64], closes: &[Option<f64>]) -> Self {
        Self::normalize(
            timestamps
                .iter()
                .zip(closes.iter())
                .filter_map(|(&ts, &close)| DateTime::from_timestamp(ts, 0).map(|dt| (dt, close))),
        )
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.close)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.samples.last()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.latest().map(|s| s.close)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        PriceSeries::normalize(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| (start + Duration::days(i as i64), Some(c))),
        )
    }

    #[test]
    fn test_drops_missing_closes() {
        let series = PriceSeries::from_parallel(
            &[100, 200, 300, 400],
            &[Some(1.0), None, Some(f64::NAN), Some(4.0)],
        );
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes().collect::<Vec<_>>(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_sorts_and_keeps_first_duplicate() {
        let series = PriceSeries::from_parallel(
            &[300, 100, 200, 100],
            &[Some(3.0), Some(1.0), Some(2.0), Some(9.0)],
        );
        assert_eq!(series.closes().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);

        let ts: Vec<_> = series.timestamps().collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_duplicate_with_missing_first_close_uses_next_sample() {
        // The null sample is dropped before deduplication.
        let series = PriceSeries::from_parallel(&[100, 100], &[None, Some(5.0)]);
        assert_eq!(series.latest_close(), Some(5.0));
    }

    #[test]
    fn test_mismatched_lengths_ignore_tail() {
        let series = PriceSeries::from_parallel(&[100, 200, 300], &[Some(1.0), Some(2.0)]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let series = PriceSeries::from_parallel(&[], &[]);
        assert!(series.is_empty());
        assert_eq!(series.latest_close(), None);
    }

    #[test]
    fn test_resolution_interval() {
        assert_eq!(Resolution::Daily.interval(), "1d");
        assert_eq!(Resolution::Weekly.interval(), "1wk");
    }
}
