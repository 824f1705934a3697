/// Upstream API clients and the source traits the resolvers consume
///
/// Two providers back the resolution tiers: an on-chain market-data API
/// (bulk token prices plus per-token attributes) and a coin-list provider
/// (ID-mapped simple price plus full coin detail). Each sits behind an
/// async trait so the resolvers can be exercised against call-counting
/// test doubles.
pub mod client;
pub mod coingecko;
pub mod onchain;

pub use client::{HttpClient, RateLimiter};
pub use coingecko::{CoinDetail, CoinGeckoClient};
pub use onchain::{OnchainClient, OnchainTokenData};

use crate::errors::ApiError;
use crate::types::PriceMap;
use async_trait::async_trait;

/// Bulk and per-token on-chain lookups
#[async_trait]
pub trait OnchainSource: Send + Sync {
    /// One request covering all addresses; the returned map carries only
    /// addresses the provider priced
    async fn token_prices(
        &self,
        network: &str,
        addresses: &[String],
    ) -> Result<PriceMap, ApiError>;

    /// Metadata plus market data for a single address; `None` when the
    /// provider has no usable attributes payload for it
    async fn token_market_data(
        &self,
        network: &str,
        address: &str,
    ) -> Result<Option<OnchainTokenData>, ApiError>;
}

/// Lookups keyed by the provider's own coin ID
#[async_trait]
pub trait CoinSource: Send + Sync {
    /// USD price for a canonical provider ID; `None` when the provider
    /// does not quote it
    async fn simple_price(&self, id: &str) -> Result<Option<f64>, ApiError>;

    /// Full coin record with nested market data; `None` when the ID is
    /// unknown to the provider
    async fn coin_detail(&self, id: &str) -> Result<Option<CoinDetail>, ApiError>;
}
