/// Token metadata resolution with tiered fallback
///
/// Builds a [`TokenRecord`] for one address by walking cheaper tiers
/// first and stopping at the first one that yields usable data:
///
/// 1. Cache lookup (network + address composite key)
/// 2. Stablecoin synthesis - registry stablecoins get a $1 record from
///    registry metadata with no upstream call
/// 3. On-chain token info lookup
/// 4. Provider coin detail lookup, for addresses the registry maps to a
///    canonical provider ID
/// 5. Price-only fallback through the price engine - a positive price
///    alone still produces a minimal record
///
/// `None` is the terminal "no data anywhere" value; it is never cached,
/// so a later call retries the tiers. Successful records are cached
/// under the same response cache the price engine uses.
use crate::apis::{CoinGeckoClient, CoinSource, OnchainClient, OnchainSource, OnchainTokenData};
use crate::cache::{CachedValue, ResponseCache, SystemClock};
use crate::config::Config;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use crate::prices::PriceService;
use crate::registry::TokenRegistry;
use crate::types::TokenRecord;
use std::sync::Arc;
use std::time::Duration;

pub struct TokenDataService {
    registry: Arc<TokenRegistry>,
    cache: Arc<ResponseCache>,
    onchain: Arc<dyn OnchainSource>,
    coins: Arc<dyn CoinSource>,
    prices: Arc<PriceService>,
}

impl TokenDataService {
    /// Build the service with real upstream clients from configuration
    ///
    /// The embedded price engine shares this service's cache, registry,
    /// and HTTP clients, so price lookups made here and made directly
    /// against the price engine see the same cached state.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        logger::set_debug(config.general.debug_logging);

        let registry = Arc::new(TokenRegistry::load_or_builtin(config.registry_path.as_deref()));
        let cache = Arc::new(ResponseCache::with_clock(
            config.cache.ttl_seconds,
            Arc::new(SystemClock),
        ));
        let onchain: Arc<dyn OnchainSource> = Arc::new(OnchainClient::new(&config.api)?);
        let coins: Arc<dyn CoinSource> = Arc::new(CoinGeckoClient::new(&config.api)?);
        let prices = Arc::new(PriceService::with_sources(
            registry.clone(),
            cache.clone(),
            onchain.clone(),
            coins.clone(),
            Duration::from_millis(config.batch.pacing_ms),
        ));

        Ok(Self::with_sources(registry, cache, onchain, coins, prices))
    }

    /// Assemble the service from explicit collaborators
    pub fn with_sources(
        registry: Arc<TokenRegistry>,
        cache: Arc<ResponseCache>,
        onchain: Arc<dyn OnchainSource>,
        coins: Arc<dyn CoinSource>,
        prices: Arc<PriceService>,
    ) -> Self {
        Self {
            registry,
            cache,
            onchain,
            coins,
            prices,
        }
    }

    pub fn prices(&self) -> &Arc<PriceService> {
        &self.prices
    }

    /// Resolve metadata and market data for one token address
    ///
    /// Never fails; `None` means no tier produced any data.
    pub async fn resolve_token_data(&self, address: &str, network: &str) -> Option<TokenRecord> {
        if address.trim().is_empty() {
            return None;
        }

        let cache_key = token_cache_key(address, network);
        if let Some(cached) = self.cache.get(&cache_key) {
            if let Some(record) = cached.as_token() {
                logger::debug(
                    LogTag::Token,
                    &format!("Cache hit for {} on {}", address, network),
                );
                return Some(record.clone());
            }
        }

        if self.registry.is_stablecoin(address, network) {
            let record = self.stablecoin_record(address, network);
            self.cache.put(&cache_key, CachedValue::Token(record.clone()));
            return Some(record);
        }

        match self.onchain.token_market_data(network, address).await {
            Ok(Some(data)) if is_usable(&data) => {
                let record = record_from_onchain(address, network, data);
                self.cache.put(&cache_key, CachedValue::Token(record.clone()));
                return Some(record);
            }
            Ok(_) => {}
            Err(e) => {
                logger::warning(
                    LogTag::Token,
                    &format!("On-chain token info failed for {}: {}", address, e),
                );
            }
        }

        if let Some(provider_id) = self.registry.known_token_id_for(address, network) {
            match self.coins.coin_detail(&provider_id).await {
                Ok(Some(detail)) => {
                    let record = record_from_detail(address, network, &provider_id, detail);
                    self.cache.put(&cache_key, CachedValue::Token(record.clone()));
                    return Some(record);
                }
                Ok(None) => {}
                Err(e) => {
                    logger::warning(
                        LogTag::Token,
                        &format!("Coin detail failed for {} ({}): {}", address, provider_id, e),
                    );
                }
            }
        }

        // Last resort: a price with no metadata still beats nothing
        let price = self.prices.resolve_single(address, network).await;
        if price > 0.0 {
            let mut record = TokenRecord::new(address, network);
            record.price_usd = Some(price);
            self.cache.put(&cache_key, CachedValue::Token(record.clone()));
            return Some(record);
        }

        logger::debug(
            LogTag::Token,
            &format!("No data from any tier for {} on {}", address, network),
        );
        None
    }

    fn stablecoin_record(&self, address: &str, network: &str) -> TokenRecord {
        let metadata = self.registry.stablecoin_metadata(address);
        let mut record = TokenRecord::new(address, network);
        record.name = Some(metadata.name);
        record.symbol = Some(metadata.symbol);
        record.decimals = Some(metadata.decimals);
        record.price_usd = Some(1.0);
        record
    }

    /// Wipe every cached result (shared with the price engine)
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// A payload with neither identity nor a price contributes nothing and
/// must not short-circuit the remaining tiers
fn is_usable(data: &OnchainTokenData) -> bool {
    data.name.is_some() || data.symbol.is_some() || data.price_usd.is_some()
}

fn record_from_onchain(address: &str, network: &str, data: OnchainTokenData) -> TokenRecord {
    let mut record = TokenRecord::new(address, network);
    record.name = data.name;
    record.symbol = data.symbol;
    record.decimals = data.decimals;
    record.image = data.image_url;
    record.price_usd = data.price_usd;
    record.market_cap_usd = data.market_cap_usd;
    record.volume_24h_usd = data.volume_24h_usd;
    record.total_supply = data.total_supply;
    record
}

fn record_from_detail(
    address: &str,
    network: &str,
    provider_id: &str,
    detail: crate::apis::CoinDetail,
) -> TokenRecord {
    let mut record = TokenRecord::new(address, network);
    record.name = detail.name;
    record.symbol = detail.symbol;
    record.image = detail.image;
    record.description = detail.description;
    record.price_usd = detail.price_usd;
    record.market_cap_usd = detail.market_cap_usd;
    record.volume_24h_usd = detail.volume_24h_usd;
    record.price_change_24h = detail.price_change_24h;
    record.price_change_percentage_24h = detail.price_change_percentage_24h;
    record.price_change_percentage_7d = detail.price_change_percentage_7d;
    record.price_change_percentage_30d = detail.price_change_percentage_30d;
    record.total_supply = detail.total_supply;
    record.circulating_supply = detail.circulating_supply;
    record.max_supply = detail.max_supply;
    record.ath = detail.ath;
    record.ath_date = detail.ath_date;
    record.atl = detail.atl;
    record.atl_date = detail.atl_date;
    record.last_updated = detail.last_updated;
    record.provider_id = Some(provider_id.to_string());
    record
}

/// Per-token cache key, network-qualified like the price keys
fn token_cache_key(address: &str, network: &str) -> String {
    format!("token:{}:{}", network.to_lowercase(), address)
}
