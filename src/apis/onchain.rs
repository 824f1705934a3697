/// On-chain market data API client
///
/// Endpoints implemented:
/// 1. /simple/networks/{network}/token_price/{addresses} - Bulk USD prices
/// 2. /networks/{network}/tokens/{address} - Single-token metadata + market data
///
/// Prices arrive as decimal strings inside a JSON:API attributes envelope;
/// anything that fails to parse into a positive finite number is dropped
/// rather than surfaced as an error.
use crate::apis::client::{HttpClient, RateLimiter};
use crate::apis::OnchainSource;
use crate::config::ApiConfig;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use crate::types::PriceMap;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

// ============================================================================
// CLIENT IMPLEMENTATION
// ============================================================================

pub struct OnchainClient {
    http_client: HttpClient,
    rate_limiter: RateLimiter,
    base_url: String,
    enabled: bool,
}

impl OnchainClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http_client = HttpClient::new(config.timeout_seconds)?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(config.onchain_rate_limit_per_minute),
            base_url: config.onchain_base_url.clone(),
            enabled: config.onchain_enabled,
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
        let response = self
            .http_client
            .client()
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

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
impl OnchainSource for OnchainClient {
    async fn token_prices(
        &self,
        network: &str,
        addresses: &[String],
    ) -> Result<PriceMap, ApiError> {
        let joined = addresses.join(",");
        let endpoint = format!("simple/networks/{}/token_price/{}", network, joined);

        logger::debug(
            LogTag::Api,
            &format!(
                "[ONCHAIN] Fetching bulk prices: network={}, count={}",
                network,
                addresses.len()
            ),
        );

        let response: TokenPriceResponse = self.get_json(&endpoint).await?;

        let raw = response
            .data
            .and_then(|d| d.attributes)
            .and_then(|a| a.token_prices)
            .unwrap_or_default();

        let mut prices = PriceMap::new();
        for (address, price_str) in raw {
            if let Some(price) = parse_price(&price_str) {
                prices.insert(address, price);
            }
        }

        Ok(prices)
    }

    async fn token_market_data(
        &self,
        network: &str,
        address: &str,
    ) -> Result<Option<OnchainTokenData>, ApiError> {
        let endpoint = format!("networks/{}/tokens/{}", network, address);

        logger::debug(
            LogTag::Api,
            &format!(
                "[ONCHAIN] Fetching token data: network={}, address={}",
                network, address
            ),
        );

        let response: TokenInfoResponse = self.get_json(&endpoint).await?;

        let attributes = match response.data.and_then(|d| d.attributes) {
            Some(attrs) => attrs,
            None => return Ok(None),
        };

        Ok(Some(OnchainTokenData {
            name: attributes.name,
            symbol: attributes.symbol,
            decimals: attributes.decimals,
            price_usd: attributes.price_usd.as_deref().and_then(parse_price),
            market_cap_usd: attributes.market_cap_usd.as_deref().and_then(parse_price),
            volume_24h_usd: attributes
                .volume_usd
                .and_then(|v| v.h24)
                .as_deref()
                .and_then(parse_price),
            total_supply: attributes.total_supply.as_deref().and_then(parse_price),
            image_url: attributes.image_url,
        }))
    }
}

/// Parse a decimal-string price, keeping only positive finite values
fn parse_price(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

// ============================================================================
// NORMALIZED TOKEN DATA
// ============================================================================

/// Attributes bundle returned by the per-token endpoint, with numeric
/// fields already parsed out of their decimal-string wire form
#[derive(Debug, Clone, Default)]
pub struct OnchainTokenData {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub total_supply: Option<f64>,
    pub image_url: Option<String>,
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenPriceResponse {
    data: Option<TokenPriceData>,
}

#[derive(Debug, Deserialize)]
struct TokenPriceData {
    attributes: Option<TokenPriceAttributes>,
}

#[derive(Debug, Deserialize)]
struct TokenPriceAttributes {
    token_prices: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    data: Option<TokenInfoData>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoData {
    attributes: Option<TokenInfoAttributes>,
}

#[derive(Debug, Deserialize)]
struct TokenInfoAttributes {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    price_usd: Option<String>,
    market_cap_usd: Option<String>,
    total_supply: Option<String>,
    image_url: Option<String>,
    volume_usd: Option<VolumeUsd>,
}

#[derive(Debug, Deserialize)]
struct VolumeUsd {
    h24: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_accepts_decimal_strings() {
        assert_eq!(parse_price("1.23"), Some(1.23));
        assert_eq!(parse_price("0.000001"), Some(0.000001));
    }

    #[test]
    fn parse_price_rejects_unusable_values() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("n/a"), None);
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("-1.5"), None);
        assert_eq!(parse_price("inf"), None);
    }

    #[test]
    fn bulk_price_payload_deserializes() {
        let body = r#"{
            "data": {
                "id": "sim",
                "type": "simple_token_price",
                "attributes": {
                    "token_prices": {
                        "So11111111111111111111111111111111111111112": "147.25",
                        "BadToken": "n/a"
                    }
                }
            }
        }"#;

        let parsed: TokenPriceResponse = serde_json::from_str(body).unwrap();
        let prices = parsed
            .data
            .and_then(|d| d.attributes)
            .and_then(|a| a.token_prices)
            .unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(
            parse_price(&prices["So11111111111111111111111111111111111111112"]),
            Some(147.25)
        );
        assert_eq!(parse_price(&prices["BadToken"]), None);
    }

    #[test]
    fn token_info_payload_deserializes() {
        let body = r#"{
            "data": {
                "attributes": {
                    "name": "Wrapped SOL",
                    "symbol": "SOL",
                    "decimals": 9,
                    "price_usd": "147.25",
                    "market_cap_usd": "68000000000",
                    "total_supply": "574207458.5",
                    "image_url": "https://example.com/sol.png",
                    "volume_usd": { "h24": "1200000000" }
                }
            }
        }"#;

        let parsed: TokenInfoResponse = serde_json::from_str(body).unwrap();
        let attrs = parsed.data.unwrap().attributes.unwrap();
        assert_eq!(attrs.symbol.as_deref(), Some("SOL"));
        assert_eq!(attrs.decimals, Some(9));
        assert_eq!(attrs.volume_usd.unwrap().h24.as_deref(), Some("1200000000"));
    }

    #[tokio::test]
    async fn disabled_client_refuses_calls() {
        let mut config = crate::config::Config::default().api;
        config.onchain_enabled = false;
        let client = OnchainClient::new(&config).unwrap();
        assert!(!client.is_enabled());

        let result = client.token_prices("solana", &["X".to_string()]).await;
        assert!(matches!(result, Err(ApiError::Disabled)));
    }
}
