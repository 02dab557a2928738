//! Market-data domain: response models, the provider collaborator, and
//! the capability declarations built on top of it.

pub mod capabilities;
pub mod models;
pub mod provider;

pub use capabilities::register_all;
pub use models::{CompanyMatch, CompanySearch, ProviderHealth, QuoteBatch, StockPrice};
pub use provider::{FinnhubClient, MarketDataProvider, ProviderError};
