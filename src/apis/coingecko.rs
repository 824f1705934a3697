/// CoinGecko API client
///
/// Endpoints implemented:
/// 1. /simple/price?ids={id}&vs_currencies=usd - USD price by coin ID
/// 2. /coins/{id} - Full coin record with nested market data
///
/// An optional demo-tier API key from the configuration is attached as the
/// `x-cg-demo-api-key` header; without it calls proceed unauthenticated
/// under the stricter public rate limits.
use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::CoinSource;
use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// Header carrying the provider API key when one is configured
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

pub struct CoinGeckoClient {
    http_client: HttpClient,
    rate_limiter: RateLimiter,
    base_url: String,
    api_key: Option<String>,
    enabled: bool,
}

impl CoinGeckoClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http_client = HttpClient::new(config.timeout_seconds)?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(config.coingecko_rate_limit_per_minute),
            base_url: config.coingecko_base_url.clone(),
            api_key: config.coingecko_api_key.clone(),
            enabled: config.coingecko_enabled,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn get_json<T>(&self, endpoint: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        if !self.enabled {
            return Err(ApiError::Disabled);
        }

        let _guard = self.rate_limiter.acquire().await?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let mut builder = self
            .http_client
            .client()
            .get(&url)
            .header("Accept", "application/json");

        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ApiError::RateLimitExceeded);
            }
            if status.as_u16() == 404 {
                return Err(ApiError::NotFound);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::InvalidResponse(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CoinSource for CoinGeckoClient {
    async fn simple_price(&self, id: &str) -> Result<Option<f64>, ApiError> {
        let endpoint = format!("simple/price?ids={}&vs_currencies=usd", id);

        logger::debug(
            LogTag::Api,
            &format!("[COINGECKO] Fetching simple price: id={}", id),
        );

        let response: HashMap<String, SimplePriceEntry> = self.get_json(&endpoint).await?;

        Ok(response
            .get(id)
            .and_then(|entry| entry.usd)
            .filter(|p| p.is_finite() && *p > 0.0))
    }

    async fn coin_detail(&self, id: &str) -> Result<Option<CoinDetail>, ApiError> {
        let endpoint = format!(
            "coins/{}?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false&sparkline=false",
            id
        );

        logger::debug(
            LogTag::Api,
            &format!("[COINGECKO] Fetching coin detail: id={}", id),
        );

        let response: CoinDetailResponse = match self.get_json(&endpoint).await {
            Ok(r) => r,
            Err(ApiError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let market = response.market_data;

        Ok(Some(CoinDetail {
            name: response.name,
            symbol: response.symbol,
            image: response.image.and_then(|i| i.large.or(i.small)),
            description: response.description.and_then(|d| d.en).filter(|s| !s.is_empty()),
            price_usd: market.as_ref().and_then(|m| m.current_price.usd()),
            market_cap_usd: market.as_ref().and_then(|m| m.market_cap.usd()),
            volume_24h_usd: market.as_ref().and_then(|m| m.total_volume.usd()),
            price_change_24h: market.as_ref().and_then(|m| m.price_change_24h),
            price_change_percentage_24h: market.as_ref().and_then(|m| m.price_change_percentage_24h),
            price_change_percentage_7d: market.as_ref().and_then(|m| m.price_change_percentage_7d),
            price_change_percentage_30d: market.as_ref().and_then(|m| m.price_change_percentage_30d),
            total_supply: market.as_ref().and_then(|m| m.total_supply),
            circulating_supply: market.as_ref().and_then(|m| m.circulating_supply),
            max_supply: market.as_ref().and_then(|m| m.max_supply),
            ath: market.as_ref().and_then(|m| m.ath.usd()),
            ath_date: market.as_ref().and_then(|m| m.ath_date.usd_date()),
            atl: market.as_ref().and_then(|m| m.atl.usd()),
            atl_date: market.as_ref().and_then(|m| m.atl_date.usd_date()),
            last_updated: market.as_ref().and_then(|m| m.last_updated),
        }))
    }
}

// ============================================================================
// NORMALIZED COIN DETAIL
// ============================================================================

/// Flattened coin record assembled from the provider's nested market-data
/// sub-object
#[derive(Debug, Clone, Default)]
pub struct CoinDetail {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub atl: Option<f64>,
    pub atl_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinDetailResponse {
    name: Option<String>,
    symbol: Option<String>,
    image: Option<CoinImage>,
    description: Option<CoinDescription>,
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    small: Option<String>,
    large: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinDescription {
    en: Option<String>,
}

/// Currency-keyed value map; only the USD entry is consumed
#[derive(Debug, Default, Deserialize)]
struct UsdValueMap(HashMap<String, Option<f64>>);

impl UsdValueMap {
    fn usd(&self) -> Option<f64> {
        self.0.get("usd").copied().flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
struct UsdDateMap(HashMap<String, Option<DateTime<Utc>>>);

impl UsdDateMap {
    fn usd_date(&self) -> Option<DateTime<Utc>> {
        self.0.get("usd").copied().flatten()
    }
}

#[derive(Debug, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: UsdValueMap,
    #[serde(default)]
    market_cap: UsdValueMap,
    #[serde(default)]
    total_volume: UsdValueMap,
    price_change_24h: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    price_change_percentage_30d: Option<f64>,
    total_supply: Option<f64>,
    circulating_supply: Option<f64>,
    max_supply: Option<f64>,
    #[serde(default)]
    ath: UsdValueMap,
    #[serde(default)]
    ath_date: UsdDateMap,
    #[serde(default)]
    atl: UsdValueMap,
    #[serde(default)]
    atl_date: UsdDateMap,
    last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_price_payload_deserializes() {
        let body = r#"{"solana":{"usd":147.25},"unlisted":{}}"#;
        let parsed: HashMap<String, SimplePriceEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed["solana"].usd, Some(147.25));
        assert_eq!(parsed["unlisted"].usd, None);
    }

    #[test]
    fn coin_detail_payload_deserializes() {
        let body = r#"{
            "id": "solana",
            "name": "Solana",
            "symbol": "sol",
            "image": { "small": "https://example.com/s.png", "large": "https://example.com/l.png" },
            "description": { "en": "A blockchain." },
            "market_data": {
                "current_price": { "usd": 147.25, "eur": 135.10 },
                "market_cap": { "usd": 68000000000.0 },
                "total_volume": { "usd": 1200000000.0 },
                "price_change_24h": -3.2,
                "price_change_percentage_24h": -2.1,
                "price_change_percentage_7d": 4.7,
                "price_change_percentage_30d": 11.0,
                "total_supply": 574207458.5,
                "circulating_supply": 460000000.0,
                "max_supply": null,
                "ath": { "usd": 260.06 },
                "ath_date": { "usd": "2021-11-06T21:54:35.825Z" },
                "atl": { "usd": 0.500801 },
                "atl_date": { "usd": "2020-05-11T19:35:23.449Z" },
                "last_updated": "2024-03-01T12:00:00.000Z"
            }
        }"#;

        let parsed: CoinDetailResponse = serde_json::from_str(body).unwrap();
        let market = parsed.market_data.unwrap();
        assert_eq!(market.current_price.usd(), Some(147.25));
        assert_eq!(market.ath.usd(), Some(260.06));
        assert!(market.ath_date.usd_date().is_some());
        assert_eq!(market.max_supply, None);
    }

    #[test]
    fn missing_market_data_is_tolerated() {
        let body = r#"{"id":"solana","name":"Solana","symbol":"sol"}"#;
        let parsed: CoinDetailResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.market_data.is_none());
    }

    #[tokio::test]
    async fn disabled_client_refuses_calls() {
        let mut config = crate::config::Config::default().api;
        config.coingecko_enabled = false;
        let client = CoinGeckoClient::new(&config).unwrap();

        let result = client.simple_price("solana").await;
        assert!(matches!(result, Err(ApiError::Disabled)));
    }
}
