pub mod apis;
pub mod cache;
pub mod config;
pub mod errors;
pub mod logger;
pub mod prices;
pub mod registry;
pub mod token_data;
pub mod types;

pub use cache::ResponseCache;
pub use config::Config;
pub use errors::ApiError;
pub use prices::PriceService;
pub use registry::TokenRegistry;
pub use token_data::TokenDataService;
pub use types::TokenRecord;
