/// Service configuration
///
/// Every component receives its settings through this struct explicitly;
/// nothing in the crate reads environment variables or other process-wide
/// state. The optional provider API key lives here and is attached by the
/// CoinGecko client as a request header when present.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub general: GeneralConfig,
    /// Optional path to a registry data file overriding the built-in tables
    #[serde(default)]
    pub registry_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub onchain_base_url: String,
    pub coingecko_base_url: String,
    /// Demo/pro API key for the coin-detail provider; absent means
    /// unauthenticated calls under the stricter public rate limits
    #[serde(default)]
    pub coingecko_api_key: Option<String>,
    pub timeout_seconds: u64,
    pub onchain_rate_limit_per_minute: usize,
    pub coingecko_rate_limit_per_minute: usize,
    pub onchain_enabled: bool,
    pub coingecko_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fixed TTL applied to every cache entry kind
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause inserted between chunks when a batched request spans
    /// more than one chunk
    pub pacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub debug_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                onchain_base_url: "https://api.geckoterminal.com/api/v2".to_string(),
                coingecko_base_url: "https://api.coingecko.com/api/v3".to_string(),
                coingecko_api_key: None,
                timeout_seconds: 10,
                onchain_rate_limit_per_minute: 30,
                coingecko_rate_limit_per_minute: 30,
                onchain_enabled: true,
                coingecko_enabled: true,
            },
            cache: CacheConfig { ttl_seconds: 60 },
            batch: BatchConfig { pacing_ms: 200 },
            general: GeneralConfig {
                debug_logging: false,
            },
            registry_path: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        if config.api.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("api.timeout_seconds must be greater than zero"));
        }
        if config.cache.ttl_seconds <= 0 {
            return Err(anyhow::anyhow!("cache.ttl_seconds must be greater than zero"));
        }

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_service_contract() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.batch.pacing_ms, 200);
        assert!(config.api.coingecko_api_key.is_none());
    }

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path_str = path.to_str().unwrap();

        let config = Config::load(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.cache.ttl_seconds, 60);

        // Round-trip through the saved file
        let reloaded = Config::load(path_str).unwrap();
        assert_eq!(reloaded.api.onchain_base_url, config.api.onchain_base_url);
    }

    #[test]
    fn load_rejects_zero_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.cache.ttl_seconds = 0;
        config.save(path.to_str().unwrap()).unwrap();

        assert!(Config::load(path.to_str().unwrap()).is_err());
    }
}
