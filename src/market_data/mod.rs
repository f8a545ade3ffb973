pub mod client;
pub mod types;

pub use client::{MarketDataApi, SchwabClient};
pub use types::ChainQuery;
