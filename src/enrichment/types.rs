use std::fmt;
use std::time::Duration;

use crate::options::{AnalyticsRecord, ContractKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Phase1Done,
    Phase2Running,
    Phase2Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Decode,    // identifier could not be decoded
    Transport, // every chain query failed
    NotFound,  // chain had no matching expiry / strike
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Transport => "transport",
            Self::NotFound => "not_found",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum RowOutcome {
    Updated {
        key: ContractKey,
        analytics: AnalyticsRecord,
    },
    Failed {
        key: Option<ContractKey>,
        reason: FailureReason,
    },
}

impl RowOutcome {
    pub fn key(&self) -> Option<&ContractKey> {
        match self {
            Self::Updated { key, .. } => Some(key),
            Self::Failed { key, .. } => key.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub symbol: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize, // option rows considered
    pub updated: usize,
    pub failures: Vec<RowFailure>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.updated + self.failures.len()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.symbol.as_str()).collect()
    }
}
