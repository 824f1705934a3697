/// Core data types for the price resolution system
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Map of token address to resolved USD price
///
/// An address absent from the map means "price unknown", not "price is
/// zero"; callers must distinguish a missing key from a zero value.
pub type PriceMap = HashMap<String, f64>;

// ============================================================================
// TOKEN RECORD - merged metadata + market data across resolution tiers
// ============================================================================

/// Full token record assembled tier-by-tier
///
/// `address` and `network` are always present. Every other field is filled
/// opportunistically by whichever tier produced data and is never cleared
/// once set; a tier returning partial data still contributes whatever
/// fields it found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub address: String,
    pub network: String,

    // Metadata
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub image: Option<String>,
    pub description: Option<String>,

    // Market data
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,

    // Supply
    pub total_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub max_supply: Option<f64>,

    // All-time extremes
    pub ath: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub atl: Option<f64>,
    pub atl_date: Option<DateTime<Utc>>,

    pub last_updated: Option<DateTime<Utc>>,

    /// The price provider's own identifier for this token, when known
    pub provider_id: Option<String>,
}

impl TokenRecord {
    /// Empty record carrying only the identity fields
    pub fn new(address: &str, network: &str) -> Self {
        Self {
            address: address.to_string(),
            network: network.to_string(),
            name: None,
            symbol: None,
            decimals: None,
            image: None,
            description: None,
            price_usd: None,
            market_cap_usd: None,
            volume_24h_usd: None,
            price_change_24h: None,
            price_change_percentage_24h: None,
            price_change_percentage_7d: None,
            price_change_percentage_30d: None,
            total_supply: None,
            circulating_supply: None,
            max_supply: None,
            ath: None,
            ath_date: None,
            atl: None,
            atl_date: None,
            last_updated: None,
            provider_id: None,
        }
    }
}
