use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    NoSignal,
    GoodBuy,
    RecommendedBuy,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::NoSignal => "-",
            Classification::GoodBuy => "Good Buy",
            Classification::RecommendedBuy => "Recommended Buy",
        }
    }
}

/// Upper bounds (exclusive) on the weekly indicators for each tier.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub recommended_rsi_max: f64,
    pub recommended_stoch_max: f64,
    pub good_stoch_max: f64,
    pub good_rsi_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            recommended_rsi_max: 20.0,
            recommended_stoch_max: 10.0,
            good_stoch_max: 20.0,
            good_rsi_max: 35.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.recommended_rsi_max,
            self.recommended_stoch_max,
            self.good_stoch_max,
            self.good_rsi_max,
        ];
        if all.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(ScanError::Config("thresholds must be finite numbers".into()))
        }
    }

    pub fn classify(&self, weekly_rsi: Option<f64>, weekly_stoch_rsi: Option<f64>) -> Classification {
        let (Some(rsi), Some(stoch)) = (weekly_rsi, weekly_stoch_rsi) else {
            return Classification::NoSignal;
        };

        if rsi < self.recommended_rsi_max && stoch < self.recommended_stoch_max {
            Classification::RecommendedBuy
        } else if stoch < self.good_stoch_max && rsi < self.good_rsi_max {
            Classification::GoodBuy
        } else {
            Classification::NoSignal
        }
    }
}
