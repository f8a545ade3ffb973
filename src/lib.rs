pub mod config;
pub mod constants;
pub mod enrichment;
pub mod errors;
pub mod logging;
pub mod market_data;
pub mod options;
pub mod positions;
