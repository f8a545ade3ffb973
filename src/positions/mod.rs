pub mod export;
pub mod holdings;
pub mod record;

pub use holdings::{accounts, load_holdings};
pub use record::{PositionRecord, materialize};
