use crate::classifier::Thresholds;
use crate::error::ScanError;
use crate::indicators::OscillatorParams;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

// CONFIGURATION STRUCTS
// `config.json` in the storage directory deserializes straight into these.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UniverseConfig {
    pub source_url: Option<String>, // page listing the NASDAQ-100 constituents
    pub symbols: Vec<String>,       // used when the page and the stored universe are unavailable
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            source_url: Some("https://www.slickcharts.com/nasdaq100".to_string()),
            symbols: ["AAPL", "AMZN", "GOOGL", "META", "MSFT", "NVDA", "TSLA"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub daily_range: String,  // e.g., "60d"
    pub weekly_range: String, // e.g., "1y"
    pub request_delay_ms: u64,
    pub retry_max: usize,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            daily_range: "60d".to_string(),
            weekly_range: "1y".to_string(),
            request_delay_ms: 500,
            retry_max: 3,
            retry_delay_ms: 1000,
            timeout_secs: 20,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub universe: UniverseConfig,
    pub source: SourceConfig,
    pub oscillators: OscillatorParams,
    pub thresholds: Thresholds,
    pub concurrency: usize, // symbols in flight at once
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            universe: UniverseConfig::default(),
            source: SourceConfig::default(),
            oscillators: OscillatorParams::default(),
            thresholds: Thresholds::default(),
            concurrency: 4,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        self.oscillators.validate()?;
        self.thresholds.validate()?;
        if self.concurrency == 0 {
            return Err(ScanError::Config("concurrency must be greater than 0".into()));
        }
        Ok(())
    }
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path to the storage directory (e.g., ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Creates a manager rooted next to the running executable.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Creates a manager rooted at `base_dir`, creating the directory up front
    /// so saves never have to check for it.
    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        if !fs::try_exists(&base_dir).await? {
            fs::create_dir_all(&base_dir).await?;
        }

        Ok(Self { base_dir })
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", filename))
    }

    pub async fn exists(&self, filename: &str) -> anyhow::Result<bool> {
        Ok(fs::try_exists(self.path_for(filename)).await?)
    }

    /// Serializes `data` to `<filename>.json`.
    /// Writes to a `.tmp` sibling first and renames, so a crash never leaves a
    /// half-written file behind.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let final_path = self.path_for(filename);
        let tmp_path = self.base_dir.join(format!("{}.json.tmp", filename));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        // serde_json scans the bytes anyway, so skip the UTF-8 pass of read_to_string.
        let content = fs::read(self.path_for(filename)).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Loads `config.json`, writing the defaults first if it does not exist yet.
    pub async fn load_or_init_config(&self) -> anyhow::Result<AppConfig> {
        if !self.exists("config").await? {
            let config = AppConfig::default();
            self.save("config", &config).await?;
            info!(path = ?self.path_for("config"), "Wrote default configuration");
            return Ok(config);
        }

        let config: AppConfig = self.load("config").await?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

        storage.save("numbers", &vec![1, 2, 3]).await.unwrap();
        let loaded: Vec<i32> = storage.load("numbers").await.unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
        assert!(!dir.path().join("numbers.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_config_is_initialized_with_defaults() {
        let dir = TempDir::new().unwrap();
        let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

        let config = storage.load_or_init_config().await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(storage.exists("config").await.unwrap());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "concurrency": 8,
            "thresholds": {
                "recommended_rsi_max": 25.0,
                "recommended_stoch_max": 10.0,
                "good_stoch_max": 20.0,
                "good_rsi_max": 35.0
            }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.thresholds.recommended_rsi_max, 25.0);
        assert_eq!(config.oscillators, OscillatorParams::default());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = AppConfig {
            concurrency: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
