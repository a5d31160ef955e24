//! Per-symbol results and the sorted batch handed to persistence and rendering.

use crate::classifier::Classification;
use crate::timeframes::IndicatorSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SymbolReport {
    pub symbol: String,
    pub price: f64,
    pub daily: IndicatorSet,
    pub weekly: IndicatorSet,
    pub classification: Classification,
}

impl SymbolReport {
    /// Entry for a symbol with no usable price data.
    pub fn unavailable(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            daily: IndicatorSet::undefined(),
            weekly: IndicatorSet::undefined(),
            classification: Classification::NoSignal,
        }
    }

    /// The latest daily close, if one was fetched. A price of 0 means none was.
    pub fn quoted_price(&self) -> Option<f64> {
        (self.price > 0.0).then_some(self.price)
    }

    /// The `{symbol, price, weekly_rsi, weekly_stoch_rsi}` record of the buy lists.
    pub fn buy_signal(&self) -> Option<BuySignal> {
        Some(BuySignal {
            symbol: self.symbol.clone(),
            price: self.price,
            weekly_rsi: self.weekly.rsi?,
            weekly_stoch_rsi: self.weekly.stoch_rsi?,
        })
    }

    pub fn ticker_entry(&self) -> TickerEntry {
        TickerEntry {
            symbol: self.symbol.clone(),
            price: match self.quoted_price() {
                Some(price) => format!("{:.2}", price),
                None => "N/A".to_string(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BuySignal {
    pub symbol: String,
    pub price: f64,
    pub weekly_rsi: f64,
    pub weekly_stoch_rsi: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TickerEntry {
    pub symbol: String,
    pub price: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub recommended: Vec<SymbolReport>,
    pub good: Vec<SymbolReport>,
    pub all: Vec<SymbolReport>,
}

impl BatchReport {
    pub fn empty() -> Self {
        Self {
            generated_at: DateTime::<Utc>::default(),
            recommended: Vec::new(),
            good: Vec::new(),
            all: Vec::new(),
        }
    }

    /// Builds the batch for `universe`.
    ///
    /// Every universe symbol gets exactly one entry in `all`; symbols without a
    /// report are filled with [`SymbolReport::unavailable`]. Reports for symbols
    /// outside the universe are kept. All three lists are sorted by symbol.
    pub fn build<'a, U>(universe: U, reports: Vec<SymbolReport>, generated_at: DateTime<Utc>) -> Self
    where
        U: IntoIterator<Item = &'a str>,
    {
        let mut by_symbol: BTreeMap<String, SymbolReport> = BTreeMap::new();
        for report in reports {
            by_symbol.entry(report.symbol.clone()).or_insert(report);
        }

        let universe: BTreeSet<&str> = universe.into_iter().collect();
        for symbol in universe {
            by_symbol
                .entry(symbol.to_string())
                .or_insert_with(|| SymbolReport::unavailable(symbol));
        }

        // BTreeMap iteration is already in ascending byte order.
        let all: Vec<SymbolReport> = by_symbol.into_values().collect();
        let pick = |class: Classification| -> Vec<SymbolReport> {
            all.iter().filter(|r| r.classification == class).cloned().collect()
        };

        Self {
            generated_at,
            recommended: pick(Classification::RecommendedBuy),
            good: pick(Classification::GoodBuy),
            all,
        }
    }

    pub fn recommended_buys(&self) -> Vec<BuySignal> {
        self.recommended.iter().filter_map(SymbolReport::buy_signal).collect()
    }

    pub fn good_buys(&self) -> Vec<BuySignal> {
        self.good.iter().filter_map(SymbolReport::buy_signal).collect()
    }

    pub fn tickers(&self) -> Vec<TickerEntry> {
        self.all.iter().map(SymbolReport::ticker_entry).collect()
    }
}
