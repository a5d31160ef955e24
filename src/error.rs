use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum ScanError {
    #[error("No price data available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("Insufficient history: need {needed} samples, have {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited while fetching {symbol}")]
    RateLimited { symbol: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    pub fn data_unavailable(symbol: &str) -> Self {
        ScanError::DataUnavailable {
            symbol: symbol.to_string(),
        }
    }

    /// Errors that only mean "this symbol has nothing to compute with".
    pub fn is_data_gap(&self) -> bool {
        matches!(
            self,
            ScanError::DataUnavailable { .. } | ScanError::InsufficientHistory { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
