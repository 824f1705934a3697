/// Price resolution engine with tiered fallback and whole-request caching
///
/// Resolution order for a set of token addresses on one network:
/// 1. Whole-request cache lookup (network-qualified, sorted address key)
/// 2. Stablecoin short-circuit - registry stablecoins resolve to $1 with
///    no upstream call
/// 3. One bulk on-chain price lookup covering every remaining address
/// 4. Per-address ID-mapped fallback lookups, issued one at a time, for
///    addresses the registry maps to a canonical provider ID
///
/// Upstream faults at any tier are logged and treated as "this tier
/// produced nothing"; the public operations never fail. An address absent
/// from the returned map means "price unknown" - callers must not read
/// absence as zero. The scalar conveniences return 0.0 for unknown;
/// callers that need to distinguish use the map form.
use crate::apis::{CoinGeckoClient, CoinSource, OnchainClient, OnchainSource};
use crate::cache::{CachedValue, ResponseCache, SystemClock};
use crate::config::Config;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use crate::registry::{TokenRegistry, SOLANA_PROVIDER_ID, WRAPPED_SOL_ADDRESS};
use crate::types::PriceMap;
use std::sync::Arc;
use std::time::Duration;

/// Network the native-token convenience lookup is scoped to
const SOLANA_NETWORK: &str = "solana";

pub struct PriceService {
    registry: Arc<TokenRegistry>,
    cache: Arc<ResponseCache>,
    onchain: Arc<dyn OnchainSource>,
    coins: Arc<dyn CoinSource>,
    batch_pause: Duration,
}

impl PriceService {
    /// Build the service with real upstream clients from configuration
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        logger::set_debug(config.general.debug_logging);

        let registry = TokenRegistry::load_or_builtin(config.registry_path.as_deref());

        Ok(Self::with_sources(
            Arc::new(registry),
            Arc::new(ResponseCache::with_clock(
                config.cache.ttl_seconds,
                Arc::new(SystemClock),
            )),
            Arc::new(OnchainClient::new(&config.api)?),
            Arc::new(CoinGeckoClient::new(&config.api)?),
            Duration::from_millis(config.batch.pacing_ms),
        ))
    }

    /// Assemble the service from explicit collaborators
    pub fn with_sources(
        registry: Arc<TokenRegistry>,
        cache: Arc<ResponseCache>,
        onchain: Arc<dyn OnchainSource>,
        coins: Arc<dyn CoinSource>,
        batch_pause: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            onchain,
            coins,
            batch_pause,
        }
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Resolve USD prices for a set of addresses on one network
    ///
    /// Returns whatever could be resolved; input addresses with no price
    /// from any tier are simply absent from the map. Never fails - an
    /// empty map is the total-failure terminal value.
    pub async fn resolve_prices(&self, addresses: &[String], network: &str) -> PriceMap {
        if addresses.is_empty() {
            return PriceMap::new();
        }

        let cache_key = price_cache_key(addresses, network);
        if let Some(cached) = self.cache.get(&cache_key) {
            if let Some(map) = cached.as_prices() {
                logger::debug(
                    LogTag::Price,
                    &format!("Cache hit for {} addresses on {}", addresses.len(), network),
                );
                return map.clone();
            }
        }

        let mut resolved = PriceMap::new();
        let mut remaining: Vec<String> = Vec::new();

        for address in addresses {
            if address.trim().is_empty() {
                continue;
            }
            if self.registry.is_stablecoin(address, network) {
                resolved.insert(address.clone(), 1.0);
            } else {
                remaining.push(address.clone());
            }
        }

        if !remaining.is_empty() {
            match self.onchain.token_prices(network, &remaining).await {
                Ok(prices) => {
                    logger::debug(
                        LogTag::Price,
                        &format!(
                            "On-chain tier priced {}/{} addresses on {}",
                            prices.len(),
                            remaining.len(),
                            network
                        ),
                    );
                    resolved.extend(prices);
                }
                Err(e) => {
                    logger::warning(
                        LogTag::Price,
                        &format!("On-chain price tier failed on {}: {}", network, e),
                    );
                }
            }
        }

        // ID-mapped fallback for what the on-chain tier left unresolved,
        // one lookup at a time to respect upstream rate limits
        for address in &remaining {
            if resolved.contains_key(address) {
                continue;
            }
            let provider_id = match self.registry.known_token_id_for(address, network) {
                Some(id) => id,
                None => continue,
            };

            match self.coins.simple_price(&provider_id).await {
                Ok(Some(price)) => {
                    resolved.insert(address.clone(), price);
                }
                Ok(None) => {}
                Err(e) => {
                    logger::warning(
                        LogTag::Price,
                        &format!("ID fallback failed for {} ({}): {}", address, provider_id, e),
                    );
                }
            }
        }

        if !resolved.is_empty() {
            self.cache.put(&cache_key, CachedValue::Prices(resolved.clone()));
        }

        resolved
    }

    /// Resolve one address, returning 0.0 when no price was found
    pub async fn resolve_single(&self, address: &str, network: &str) -> f64 {
        let input = [address.to_string()];
        let prices = self.resolve_prices(&input, network).await;
        prices.get(address).copied().unwrap_or(0.0)
    }

    /// Resolve the Solana native token via its wrapped mint, with one
    /// extra direct-by-ID fallback; 0.0 signals unknown
    pub async fn resolve_sol_price(&self) -> f64 {
        let input = [WRAPPED_SOL_ADDRESS.to_string()];
        let prices = self.resolve_prices(&input, SOLANA_NETWORK).await;
        if let Some(price) = prices.get(WRAPPED_SOL_ADDRESS) {
            return *price;
        }

        match self.coins.simple_price(SOLANA_PROVIDER_ID).await {
            Ok(Some(price)) => price,
            Ok(None) => {
                logger::warning(LogTag::Price, "SOL price unavailable from every tier");
                0.0
            }
            Err(e) => {
                logger::warning(LogTag::Price, &format!("SOL direct lookup failed: {}", e));
                0.0
            }
        }
    }

    /// Resolve a large address list in bounded chunks
    ///
    /// Chunks are resolved sequentially with a pacing pause between them;
    /// a chunk that resolves nothing is logged and skipped, and partial
    /// results are merged rather than aborting the batch.
    pub async fn resolve_prices_batched(
        &self,
        addresses: &[String],
        batch_size: usize,
        network: &str,
    ) -> PriceMap {
        let batch_size = batch_size.max(1);
        if addresses.len() <= batch_size {
            return self.resolve_prices(addresses, network).await;
        }

        let chunks: Vec<&[String]> = addresses.chunks(batch_size).collect();
        let total = chunks.len();
        let mut merged = PriceMap::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let resolved = self.resolve_prices(chunk, network).await;
            if resolved.is_empty() {
                logger::warning(
                    LogTag::Price,
                    &format!(
                        "Batch chunk {}/{} resolved nothing ({} addresses)",
                        index + 1,
                        total,
                        chunk.len()
                    ),
                );
            }
            merged.extend(resolved);

            if index + 1 < total && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        merged
    }

    /// Wipe every cached result
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Deterministic whole-request fingerprint: network-qualified, sorted,
/// comma-joined address list. Duplicates and blanks are preserved so the
/// key is stable regardless of input order.
fn price_cache_key(addresses: &[String], network: &str) -> String {
    let mut sorted: Vec<&str> = addresses.iter().map(|a| a.as_str()).collect();
    sorted.sort_unstable();
    format!("{}:{}", network.to_lowercase(), sorted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const USDT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";

    /// Test double implementing both upstream source traits with call
    /// counters and scripted responses
    struct MockSources {
        bulk_calls: AtomicUsize,
        simple_calls: AtomicUsize,
        bulk_requests: Mutex<Vec<Vec<String>>>,
        bulk_prices: HashMap<String, f64>,
        simple_prices: HashMap<String, f64>,
        fail_bulk: bool,
        fail_simple: bool,
        fail_bulk_on_call: Option<usize>,
    }

    impl MockSources {
        fn new() -> Self {
            Self {
                bulk_calls: AtomicUsize::new(0),
                simple_calls: AtomicUsize::new(0),
                bulk_requests: Mutex::new(Vec::new()),
                bulk_prices: HashMap::new(),
                simple_prices: HashMap::new(),
                fail_bulk: false,
                fail_simple: false,
                fail_bulk_on_call: None,
            }
        }

        fn with_bulk_price(mut self, address: &str, price: f64) -> Self {
            self.bulk_prices.insert(address.to_string(), price);
            self
        }

        fn with_simple_price(mut self, id: &str, price: f64) -> Self {
            self.simple_prices.insert(id.to_string(), price);
            self
        }

        fn failing_bulk(mut self) -> Self {
            self.fail_bulk = true;
            self
        }

        fn failing_simple(mut self) -> Self {
            self.fail_simple = true;
            self
        }

        fn failing_bulk_on_call(mut self, call: usize) -> Self {
            self.fail_bulk_on_call = Some(call);
            self
        }

        fn bulk_call_count(&self) -> usize {
            self.bulk_calls.load(Ordering::SeqCst)
        }

        fn simple_call_count(&self) -> usize {
            self.simple_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OnchainSource for MockSources {
        async fn token_prices(
            &self,
            _network: &str,
            addresses: &[String],
        ) -> Result<PriceMap, ApiError> {
            let call = self.bulk_calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.bulk_requests.lock().unwrap().push(addresses.to_vec());

            if self.fail_bulk {
                return Err(ApiError::NetworkError("bulk tier down".to_string()));
            }
            if self.fail_bulk_on_call == Some(call) {
                return Err(ApiError::InvalidResponse("HTTP 500".to_string()));
            }

            Ok(addresses
                .iter()
                .filter_map(|a| self.bulk_prices.get(a).map(|p| (a.clone(), *p)))
                .collect())
        }

        async fn token_market_data(
            &self,
            _network: &str,
            _address: &str,
        ) -> Result<Option<crate::apis::OnchainTokenData>, ApiError> {
            Err(ApiError::NotFound)
        }
    }

    #[async_trait]
    impl CoinSource for MockSources {
        async fn simple_price(&self, id: &str) -> Result<Option<f64>, ApiError> {
            self.simple_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_simple {
                return Err(ApiError::Timeout);
            }
            Ok(self.simple_prices.get(id).copied())
        }

        async fn coin_detail(
            &self,
            _id: &str,
        ) -> Result<Option<crate::apis::CoinDetail>, ApiError> {
            Err(ApiError::NotFound)
        }
    }

    fn service_with(mock: Arc<MockSources>) -> PriceService {
        PriceService::with_sources(
            Arc::new(TokenRegistry::builtin()),
            Arc::new(ResponseCache::new(60)),
            mock.clone(),
            mock,
            Duration::ZERO,
        )
    }

    fn service_with_clock(mock: Arc<MockSources>, clock: Arc<ManualClock>) -> PriceService {
        PriceService::with_sources(
            Arc::new(TokenRegistry::builtin()),
            Arc::new(ResponseCache::with_clock(60, clock)),
            mock.clone(),
            mock,
            Duration::ZERO,
        )
    }

    fn addrs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_input_short_circuits_before_any_io() {
        let mock = Arc::new(MockSources::new());
        let service = service_with(mock.clone());

        let prices = service.resolve_prices(&[], "solana").await;

        assert!(prices.is_empty());
        assert_eq!(mock.bulk_call_count(), 0);
        assert_eq!(mock.simple_call_count(), 0);
    }

    #[tokio::test]
    async fn blank_addresses_resolve_to_nothing_without_io() {
        let mock = Arc::new(MockSources::new());
        let service = service_with(mock.clone());

        let prices = service.resolve_prices(&addrs(&["", "   "]), "solana").await;

        assert!(prices.is_empty());
        assert_eq!(mock.bulk_call_count(), 0);
    }

    #[tokio::test]
    async fn stablecoins_resolve_without_upstream_calls() {
        let mock = Arc::new(MockSources::new());
        let service = service_with(mock.clone());

        let prices = service.resolve_prices(&addrs(&[USDC, USDT]), "solana").await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[USDC], 1.0);
        assert_eq!(prices[USDT], 1.0);
        assert_eq!(mock.bulk_call_count(), 0);
        assert_eq!(mock.simple_call_count(), 0);
    }

    #[tokio::test]
    async fn repeated_request_hits_cache() {
        let mock = Arc::new(MockSources::new().with_bulk_price("TokenA", 2.5));
        let service = service_with(mock.clone());
        let input = addrs(&["TokenA"]);

        let first = service.resolve_prices(&input, "solana").await;
        let second = service.resolve_prices(&input, "solana").await;

        assert_eq!(first, second);
        assert_eq!(mock.bulk_call_count(), 1);
    }

    #[tokio::test]
    async fn cache_key_ignores_input_order() {
        let mock = Arc::new(
            MockSources::new()
                .with_bulk_price("TokenA", 2.5)
                .with_bulk_price("TokenB", 3.5),
        );
        let service = service_with(mock.clone());

        service.resolve_prices(&addrs(&["TokenA", "TokenB"]), "solana").await;
        let reordered = service
            .resolve_prices(&addrs(&["TokenB", "TokenA"]), "solana")
            .await;

        assert_eq!(reordered.len(), 2);
        assert_eq!(mock.bulk_call_count(), 1);
    }

    #[tokio::test]
    async fn expired_cache_entry_reissues_upstream_calls() {
        let clock = Arc::new(ManualClock::new());
        let mock = Arc::new(MockSources::new().with_bulk_price("TokenA", 2.5));
        let service = service_with_clock(mock.clone(), clock.clone());
        let input = addrs(&["TokenA"]);

        service.resolve_prices(&input, "solana").await;
        clock.advance_seconds(61);
        service.resolve_prices(&input, "solana").await;

        assert_eq!(mock.bulk_call_count(), 2);
    }

    #[tokio::test]
    async fn id_fallback_fills_addresses_the_bulk_tier_missed() {
        let mock = Arc::new(MockSources::new().with_simple_price(SOLANA_PROVIDER_ID, 147.25));
        let service = service_with(mock.clone());

        let prices = service
            .resolve_prices(&addrs(&[WRAPPED_SOL_ADDRESS]), "solana")
            .await;

        assert_eq!(prices[WRAPPED_SOL_ADDRESS], 147.25);
        assert_eq!(mock.bulk_call_count(), 1);
        assert_eq!(mock.simple_call_count(), 1);
    }

    #[tokio::test]
    async fn mixed_stablecoin_and_unknown_address() {
        let mock = Arc::new(MockSources::new().with_bulk_price("UNKNOWN_ADDR", 0.042));
        let service = service_with(mock.clone());

        let prices = service
            .resolve_prices(&addrs(&[USDC, "UNKNOWN_ADDR"]), "solana")
            .await;

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[USDC], 1.0);
        assert_eq!(prices["UNKNOWN_ADDR"], 0.042);
    }

    #[tokio::test]
    async fn total_failure_yields_empty_map_and_zero_single() {
        let mock = Arc::new(MockSources::new().failing_bulk().failing_simple());
        let service = service_with(mock.clone());

        let prices = service.resolve_prices(&addrs(&["NO_DATA_ADDR"]), "solana").await;
        assert!(prices.is_empty());

        let single = service.resolve_single("NO_DATA_ADDR", "solana").await;
        assert_eq!(single, 0.0);
    }

    #[tokio::test]
    async fn empty_results_are_not_cached() {
        let mock = Arc::new(MockSources::new().failing_bulk());
        let service = service_with(mock.clone());
        let input = addrs(&["NO_DATA_ADDR"]);

        service.resolve_prices(&input, "solana").await;
        service.resolve_prices(&input, "solana").await;

        // No cache entry was stored, so the upstream was consulted twice
        assert_eq!(mock.bulk_call_count(), 2);
    }

    #[tokio::test]
    async fn unsupported_network_still_uses_bulk_tier() {
        let mock = Arc::new(MockSources::new().with_bulk_price("0xToken", 5.0));
        let service = service_with(mock.clone());

        let prices = service.resolve_prices(&addrs(&["0xToken"]), "dogechain").await;

        assert_eq!(prices["0xToken"], 5.0);
        assert_eq!(mock.simple_call_count(), 0);
    }

    #[tokio::test]
    async fn sol_price_prefers_wrapped_mint_resolution() {
        let mock = Arc::new(MockSources::new().with_bulk_price(WRAPPED_SOL_ADDRESS, 150.0));
        let service = service_with(mock.clone());

        assert_eq!(service.resolve_sol_price().await, 150.0);
    }

    #[tokio::test]
    async fn sol_price_falls_back_to_direct_id_lookup() {
        let mock = Arc::new(
            MockSources::new()
                .failing_bulk()
                .with_simple_price(SOLANA_PROVIDER_ID, 151.5),
        );
        let service = service_with(mock.clone());

        assert_eq!(service.resolve_sol_price().await, 151.5);
    }

    #[tokio::test]
    async fn sol_price_unknown_returns_zero() {
        let mock = Arc::new(MockSources::new().failing_bulk().failing_simple());
        let service = service_with(mock.clone());

        assert_eq!(service.resolve_sol_price().await, 0.0);
    }

    #[tokio::test]
    async fn batched_resolution_chunks_in_order_and_merges() {
        let mock = Arc::new(
            MockSources::new()
                .with_bulk_price("T0", 1.0)
                .with_bulk_price("T1", 2.0)
                .with_bulk_price("T2", 3.0)
                .with_bulk_price("T3", 4.0)
                .with_bulk_price("T4", 5.0),
        );
        let service = service_with(mock.clone());
        let input = addrs(&["T0", "T1", "T2", "T3", "T4"]);

        let merged = service.resolve_prices_batched(&input, 2, "solana").await;

        assert_eq!(mock.bulk_call_count(), 3);
        let requests = mock.bulk_requests.lock().unwrap().clone();
        assert_eq!(requests[0], addrs(&["T0", "T1"]));
        assert_eq!(requests[1], addrs(&["T2", "T3"]));
        assert_eq!(requests[2], addrs(&["T4"]));
        assert_eq!(merged.len(), 5);
    }

    #[tokio::test]
    async fn batched_resolution_survives_a_failing_chunk() {
        let mock = Arc::new(
            MockSources::new()
                .with_bulk_price("T0", 1.0)
                .with_bulk_price("T1", 2.0)
                .with_bulk_price("T2", 3.0)
                .with_bulk_price("T3", 4.0)
                .with_bulk_price("T4", 5.0)
                .failing_bulk_on_call(2),
        );
        let service = service_with(mock.clone());
        let input = addrs(&["T0", "T1", "T2", "T3", "T4"]);

        let merged = service.resolve_prices_batched(&input, 2, "solana").await;

        // Chunk 2 produced nothing; chunks 1 and 3 still merged
        assert_eq!(mock.bulk_call_count(), 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["T0"], 1.0);
        assert_eq!(merged["T4"], 5.0);
        assert!(!merged.contains_key("T2"));
    }

    #[tokio::test]
    async fn small_batch_delegates_directly() {
        let mock = Arc::new(MockSources::new().with_bulk_price("T0", 1.0));
        let service = service_with(mock.clone());

        let merged = service
            .resolve_prices_batched(&addrs(&["T0"]), 10, "solana")
            .await;

        assert_eq!(mock.bulk_call_count(), 1);
        assert_eq!(merged["T0"], 1.0);
    }

    #[tokio::test]
    async fn clear_cache_forces_reissue() {
        let mock = Arc::new(MockSources::new().with_bulk_price("TokenA", 2.5));
        let service = service_with(mock.clone());
        let input = addrs(&["TokenA"]);

        service.resolve_prices(&input, "solana").await;
        service.clear_cache();
        service.resolve_prices(&input, "solana").await;

        assert_eq!(mock.bulk_call_count(), 2);
    }

    #[test]
    fn cache_key_is_network_qualified_and_sorted() {
        let key = price_cache_key(&addrs(&["B", "A", "B"]), "Solana");
        assert_eq!(key, "solana:A,B,B");
    }
}
