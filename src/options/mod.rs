pub mod alias;
pub mod chain;
pub mod extract;
pub mod fundamentals;
pub mod symbol;

pub use chain::{ChainResolver, ChainResponse};
pub use extract::{AnalyticsRecord, extract};
pub use fundamentals::{FundamentalsBatcher, FundamentalsRecord};
pub use symbol::{ContractKey, OptionKind, decode};
