use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::types::{FailureReason, RowFailure, RowOutcome, RunPhase, RunSummary};
use crate::config::Config;
use crate::errors::PhaseError;
use crate::market_data::MarketDataApi;
use crate::options::{
    ChainResolver, FundamentalsBatcher, FundamentalsRecord, decode, extract,
};
use crate::positions::{PositionRecord, materialize};

/// Drives a run: positions are loaded once, then option rows are enriched.
pub struct EnrichmentEngine {
    api: Arc<dyn MarketDataApi>,
    max_in_flight: usize,
    phase: RunPhase,
    records: Vec<PositionRecord>,
}

impl EnrichmentEngine {
    pub fn new(api: Arc<dyn MarketDataApi>, max_in_flight: usize) -> Self {
        Self {
            api,
            max_in_flight: max_in_flight.max(1),
            phase: RunPhase::Init,
            records: Vec::new(),
        }
    }

    pub fn from_config(api: Arc<dyn MarketDataApi>, config: &Config) -> Self {
        Self::new(api, config.max_in_flight)
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn records(&self) -> &[PositionRecord] {
        &self.records
    }

    fn transition(&mut self, expected: RunPhase, next: RunPhase, action: &'static str) -> Result<(), PhaseError> {
        if self.phase != expected {
            return Err(PhaseError { action, phase: self.phase });
        }
        info!(from = ?self.phase, to = ?next, "Run phase transition");
        self.phase = next;
        Ok(())
    }

    /// Phase 1: turn the raw holdings payload into position rows.
    #[instrument(skip(self, payload))]
    pub fn load_positions(&mut self, payload: &Value) -> Result<usize, PhaseError> {
        self.transition(RunPhase::Init, RunPhase::Phase1Done, "load positions")?;
        self.records = materialize(payload);
        Ok(self.records.len())
    }

    /// Phase 2: enrich every option row.
    ///
    /// Fundamentals for all distinct underlyings are fetched first; chain
    /// lookups start only once that batch is done. Rows are resolved with at
    /// most `max_in_flight` in progress and merged back in their original
    /// order. When `shutdown` completes, no further rows are started and the
    /// summary covers the rows finished so far.
    #[instrument(skip(self, shutdown))]
    pub async fn enrich<F>(&mut self, shutdown: F) -> Result<RunSummary, PhaseError>
    where
        F: Future<Output = ()>,
    {
        self.transition(RunPhase::Phase1Done, RunPhase::Phase2Running, "enrich positions")?;

        // Option rows, by index into `records`
        let option_rows: Vec<(usize, String)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_option())
            .map(|(idx, record)| (idx, record.symbol.clone().unwrap_or_default()))
            .collect();

        let roots: BTreeSet<String> = option_rows
            .iter()
            .filter_map(|(_, symbol)| decode(symbol))
            .map(|key| key.root)
            .collect();

        // Fundamentals barrier: every distinct underlying, fetched before any chain call
        let fundamentals = FundamentalsBatcher::new(Arc::clone(&self.api), self.max_in_flight)
            .batch(&roots)
            .await;

        let resolver = ChainResolver::new(Arc::clone(&self.api));
        let total = option_rows.len();
        let start = Instant::now();
        let mut summary = RunSummary { total, ..Default::default() };

        // Bounded, order-preserving row stream; stops starting rows on shutdown
        let resolver = &resolver;
        let fundamentals = &fundamentals;
        let rows = stream::iter(option_rows.into_iter().enumerate())
            .map(|(seq, (idx, symbol))| async move {
                let outcome = resolve_row(resolver, fundamentals, &symbol).await;
                (seq, idx, symbol, outcome)
            })
            .buffered(self.max_in_flight)
            .take_until(shutdown);
        let mut rows = pin!(rows);

        while let Some((seq, idx, symbol, outcome)) = rows.next().await {
            let elapsed_secs = start.elapsed().as_secs_f64();
            match outcome.key() {
                Some(key) => info!(
                    row = seq + 1,
                    total,
                    underlying = %key.root,
                    expiry = %key.expiry_str(),
                    kind = %key.kind,
                    strike = %key.strike,
                    elapsed_secs = %format!("{:.1}", elapsed_secs),
                    outcome = outcome_label(&outcome),
                    "Option row processed"
                ),
                None => info!(
                    row = seq + 1,
                    total,
                    symbol = %symbol,
                    elapsed_secs = %format!("{:.1}", elapsed_secs),
                    outcome = outcome_label(&outcome),
                    "Option row processed"
                ),
            }

            // Merge into the row, in original order
            match outcome {
                RowOutcome::Updated { analytics, .. } => {
                    self.records[idx].analytics = Some(analytics);
                    summary.updated += 1;
                }
                RowOutcome::Failed { reason, .. } => {
                    summary.failures.push(RowFailure { symbol, reason });
                }
            }
        }

        summary.elapsed = start.elapsed();
        summary.cancelled = summary.processed() < total;
        if summary.cancelled {
            warn!(
                processed = summary.processed(),
                total,
                "Enrichment cancelled, returning partial summary"
            );
        }
        info!(
            updated = summary.updated,
            failed = summary.failures.len(),
            elapsed_secs = %format!("{:.1}", summary.elapsed.as_secs_f64()),
            cancelled = summary.cancelled,
            "Enrichment complete"
        );

        self.transition(RunPhase::Phase2Running, RunPhase::Phase2Done, "finish enrichment")?;
        Ok(summary)
    }
}

fn outcome_label(outcome: &RowOutcome) -> &'static str {
    match outcome {
        RowOutcome::Updated { .. } => "updated",
        RowOutcome::Failed { reason, .. } => reason.as_str(),
    }
}

/// Decode, resolve and extract one option row. Never fails the run.
async fn resolve_row(
    resolver: &ChainResolver,
    fundamentals: &HashMap<String, FundamentalsRecord>,
    symbol: &str,
) -> RowOutcome {
    let Some(key) = decode(symbol) else {
        return RowOutcome::Failed { key: None, reason: FailureReason::Decode };
    };
    let response = match resolver.resolve(&key).await {
        Ok(response) => response,
        Err(_) => return RowOutcome::Failed { key: Some(key), reason: FailureReason::Transport },
    };
    match extract(&response, &key, fundamentals.get(&key.root)) {
        Some(analytics) => RowOutcome::Updated { key, analytics },
        None => RowOutcome::Failed { key: Some(key), reason: FailureReason::NotFound },
    }
}
