pub mod engine;
pub mod types;

pub use engine::EnrichmentEngine;
pub use types::{FailureReason, RowFailure, RowOutcome, RunPhase, RunSummary};
