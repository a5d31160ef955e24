pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod comfy_table;
pub mod error;
pub mod find_tickers;
pub mod indicators;
pub mod price_source;
pub mod report;
pub mod series;
pub mod storage_utils;
pub mod timeframes;
pub mod tui;

pub use error::{Result, ScanError};
