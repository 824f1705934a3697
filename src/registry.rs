/// Token registry - per-network stablecoin sets and provider ID mappings
///
/// Static lookup tables consulted by the resolvers: which addresses are
/// fixed $1 stablecoins, and which addresses have a canonical provider ID
/// usable for the ID-mapped fallback tier. No external calls happen here.
///
/// Network names are case-normalized; token addresses are compared
/// byte-for-byte (hex addresses on Base/Ethereum and base58 addresses on
/// Solana are both case-sensitive in source data).
///
/// The built-in tables cover the supported networks out of the box, and a
/// registry data file can replace them without a rebuild (see
/// [`TokenRegistry::load_from_file`]).
use crate::logger::{self, LogTag};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;

// =============================================================================
// WELL-KNOWN ADDRESSES
// =============================================================================

/// Wrapped SOL mint used to resolve the Solana native token price
pub const WRAPPED_SOL_ADDRESS: &str = "So11111111111111111111111111111111111111112";

/// Provider ID for the Solana native token
pub const SOLANA_PROVIDER_ID: &str = "solana";

/// Fallback metadata for stablecoins without an explicit entry
const DEFAULT_STABLECOIN_SYMBOL: &str = "STABLECOIN";
const DEFAULT_STABLECOIN_NAME: &str = "Stablecoin";
const DEFAULT_STABLECOIN_DECIMALS: u8 = 6;

// =============================================================================
// REGISTRY DATA - serde shape for loadable registry files
// =============================================================================

/// Per-network table: stablecoin addresses plus address -> provider ID map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkTokenSet {
    pub stablecoins: Vec<String>,
    pub known_tokens: HashMap<String, String>,
}

/// Stablecoin display metadata used when synthesizing token records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StablecoinMetadata {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Loadable registry document (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryData {
    /// Ordered list of supported networks
    pub networks: Vec<String>,
    pub tokens: HashMap<String, NetworkTokenSet>,
    #[serde(default)]
    pub stablecoin_metadata: HashMap<String, StablecoinMetadata>,
}

// =============================================================================
// TOKEN REGISTRY
// =============================================================================

#[derive(Debug, Clone)]
pub struct TokenRegistry {
    order: Vec<String>,
    networks: HashMap<String, NetworkTokenSet>,
    stablecoin_metadata: HashMap<String, StablecoinMetadata>,
}

/// Built-in tables, constructed once per process
static BUILTIN: Lazy<RegistryData> = Lazy::new(builtin_data);

impl TokenRegistry {
    /// Registry backed by the built-in tables
    pub fn builtin() -> Self {
        Self::from_data(BUILTIN.clone())
    }

    pub fn from_data(data: RegistryData) -> Self {
        let order: Vec<String> = data.networks.iter().map(|n| n.to_lowercase()).collect();
        let networks = data
            .tokens
            .into_iter()
            .map(|(network, set)| (network.to_lowercase(), set))
            .collect();

        Self {
            order,
            networks,
            stablecoin_metadata: data.stablecoin_metadata,
        }
    }

    /// Load registry tables from a JSON data file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry file: {}", path))?;
        let data: RegistryData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry file: {}", path))?;
        Ok(Self::from_data(data))
    }

    /// Load registry tables from an optional data file, falling back to
    /// the built-in tables when no path is given or the file is unusable
    pub fn load_or_builtin(path: Option<&str>) -> Self {
        match path {
            Some(path) => match Self::load_from_file(path) {
                Ok(registry) => registry,
                Err(e) => {
                    logger::warning(
                        LogTag::Registry,
                        &format!("Falling back to built-in registry tables: {}", e),
                    );
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }

    /// Stablecoin addresses for a network; empty for unsupported networks
    pub fn stablecoins_for(&self, network: &str) -> HashSet<String> {
        match self.networks.get(&network.to_lowercase()) {
            Some(set) => set.stablecoins.iter().cloned().collect(),
            None => HashSet::new(),
        }
    }

    /// Canonical provider ID for an address on a network, when mapped
    pub fn known_token_id_for(&self, address: &str, network: &str) -> Option<String> {
        self.networks
            .get(&network.to_lowercase())
            .and_then(|set| set.known_tokens.get(address))
            .cloned()
    }

    pub fn is_stablecoin(&self, address: &str, network: &str) -> bool {
        self.networks
            .get(&network.to_lowercase())
            .map(|set| set.stablecoins.iter().any(|a| a == address))
            .unwrap_or(false)
    }

    /// Supported networks in declaration order
    pub fn supported_networks(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn is_supported(&self, network: &str) -> bool {
        self.networks.contains_key(&network.to_lowercase())
    }

    /// Display metadata for a stablecoin address, falling back to the
    /// generic STABLECOIN triple when no explicit entry matches
    pub fn stablecoin_metadata(&self, address: &str) -> StablecoinMetadata {
        self.stablecoin_metadata
            .get(address)
            .cloned()
            .unwrap_or(StablecoinMetadata {
                symbol: DEFAULT_STABLECOIN_SYMBOL.to_string(),
                name: DEFAULT_STABLECOIN_NAME.to_string(),
                decimals: DEFAULT_STABLECOIN_DECIMALS,
            })
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// BUILT-IN TABLES
// =============================================================================

fn builtin_data() -> RegistryData {
    let mut tokens = HashMap::new();

    // Solana
    tokens.insert(
        "solana".to_string(),
        NetworkTokenSet {
            stablecoins: vec![
                "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(), // USDC
                "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB".to_string(), // USDT
            ],
            known_tokens: pairs(&[
                (WRAPPED_SOL_ADDRESS, SOLANA_PROVIDER_ID),
                ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "bonk"),
                ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "jupiter-exchange-solana"),
                ("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", "raydium"),
            ]),
        },
    );

    // Ethereum
    tokens.insert(
        "ethereum".to_string(),
        NetworkTokenSet {
            stablecoins: vec![
                "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(), // USDC
                "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(), // USDT
                "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(), // DAI
            ],
            known_tokens: pairs(&[
                ("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "weth"),
                ("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", "wrapped-bitcoin"),
                ("0x514910771AF9Ca656af840dff83E8264EcF986CA", "chainlink"),
                ("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984", "uniswap"),
            ]),
        },
    );

    // Polygon
    tokens.insert(
        "polygon".to_string(),
        NetworkTokenSet {
            stablecoins: vec![
                "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174".to_string(), // USDC.e
                "0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359".to_string(), // USDC
                "0xc2132D05D31c914a87C6611C10748AEb04B58e8F".to_string(), // USDT
            ],
            known_tokens: pairs(&[
                ("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", "wmatic"),
                ("0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", "weth"),
            ]),
        },
    );

    // Base
    tokens.insert(
        "base".to_string(),
        NetworkTokenSet {
            stablecoins: vec![
                "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(), // USDC
                "0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA".to_string(), // USDbC
            ],
            known_tokens: pairs(&[
                ("0x4200000000000000000000000000000000000006", "weth"),
                ("0x940181a94A35A4569E4529A3CDfB74e38FD98631", "aerodrome-finance"),
            ]),
        },
    );

    let mut stablecoin_metadata = HashMap::new();
    for (address, symbol, name, decimals) in [
        ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC", "USD Coin", 6u8),
        ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", "Tether USD", 6),
        ("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "USDC", "USD Coin", 6),
        ("0xdAC17F958D2ee523a2206206994597C13D831ec7", "USDT", "Tether USD", 6),
        ("0x6B175474E89094C44Da98b954EedeAC495271d0F", "DAI", "Dai Stablecoin", 18),
        ("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", "USDC.e", "Bridged USD Coin", 6),
        ("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359", "USDC", "USD Coin", 6),
        ("0xc2132D05D31c914a87C6611C10748AEb04B58e8F", "USDT", "Tether USD", 6),
        ("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "USDC", "USD Coin", 6),
        ("0xd9aAEc86B65D86f6A7B5B1b0c42FFA531710b6CA", "USDbC", "USD Base Coin", 6),
    ] {
        stablecoin_metadata.insert(
            address.to_string(),
            StablecoinMetadata {
                symbol: symbol.to_string(),
                name: name.to_string(),
                decimals,
            },
        );
    }

    RegistryData {
        networks: vec![
            "solana".to_string(),
            "ethereum".to_string(),
            "polygon".to_string(),
            "base".to_string(),
        ],
        tokens,
        stablecoin_metadata,
    }
}

fn pairs(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
