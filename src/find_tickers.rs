use crate::storage_utils::{AppConfig, AsyncStorageManager};
use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use tracing::{info, warn};

/// Pulls ticker symbols out of `/symbol/<TICKER>` links, in page order and
/// without repeats.
pub fn parse_symbols(html: &str) -> Vec<String> {
    let re = Regex::new(r#"href="/symbol/\$?([A-Za-z0-9.\-]+)""#).expect("static regex is valid");
    let mut seen = HashSet::new();

    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Downloads the constituents page and saves the symbols as `universe.json`.
pub async fn fetch_universe(storage: &AsyncStorageManager, url: &str, user_agent: &str) -> Result<Vec<String>> {
    let client = reqwest::Client::builder().user_agent(user_agent).build()?;
    let html = client.get(url).send().await?.error_for_status()?.text().await?;

    let symbols = parse_symbols(&html);
    if symbols.is_empty() {
        anyhow::bail!("no ticker symbols found at {}", url);
    }

    storage.save("universe", &symbols).await?;
    info!(count = symbols.len(), url, "Ticker universe saved");
    Ok(symbols)
}

/// The universe for this run: a fresh download, else the last saved one, else
/// the configured list.
pub async fn resolve_universe(storage: &AsyncStorageManager, config: &AppConfig) -> Vec<String> {
    if let Some(url) = &config.universe.source_url {
        match fetch_universe(storage, url, &config.source.user_agent).await {
            Ok(symbols) => return symbols,
            Err(e) => warn!(error = %e, "Could not download ticker universe"),
        }
    }

    match storage.load::<Vec<String>>("universe").await {
        Ok(symbols) if !symbols.is_empty() => {
            info!(count = symbols.len(), "Using saved ticker universe");
            symbols
        }
        _ => {
            info!(count = config.universe.symbols.len(), "Using configured ticker universe");
            config.universe.symbols.clone()
        }
    }
}
