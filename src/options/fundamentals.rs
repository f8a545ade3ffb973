use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::alias::{fundamentals_keys, quote_symbol};
use crate::market_data::MarketDataApi;
use crate::market_data::types::{QUOTE_ENVELOPES, unwrap_envelope};

/// Dividend / earnings snapshot for one underlying.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundamentalsRecord {
    pub div_yield: Option<f64>,
    pub div_amount: Option<f64>,
    pub div_ex_date: Option<String>,
    pub last_earnings_date: Option<String>,
    pub next_div_ex_date: Option<String>,
}

impl FundamentalsRecord {
    /// Build from a quote entry's `fundamental` block. A missing block gives
    /// an all-empty record.
    pub fn from_quote(quote: &Map<String, Value>) -> Self {
        let Some(fundamental) = quote.get("fundamental").and_then(Value::as_object) else {
            return Self::default();
        };
        let number = |name: &str| fundamental.get(name).and_then(Value::as_f64);
        let text = |name: &str| {
            fundamental
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            div_yield: number("divYield").or_else(|| number("dividendYield")),
            div_amount: number("divAmount"),
            div_ex_date: text("divExDate"),
            last_earnings_date: text("lastEarningsDate"),
            next_div_ex_date: text("nextDivExDate"),
        }
    }
}

/// Pick the quote entry for `root` out of a raw quotes response, probing each
/// known spelling of the root in order. The first object-valued hit wins.
pub fn find_quote<'a>(response: &'a Value, root: &str) -> Option<&'a Map<String, Value>> {
    let keys = fundamentals_keys(root);
    let holds_quote = |object: &Map<String, Value>| {
        keys.iter().any(|k| object.get(k).is_some_and(Value::is_object))
    };
    let object = unwrap_envelope(response, &QUOTE_ENVELOPES, holds_quote)?;
    keys.iter().find_map(|k| object.get(k).and_then(Value::as_object))
}

/// Fetches fundamentals once per distinct underlying.
pub struct FundamentalsBatcher {
    api: Arc<dyn MarketDataApi>,
    max_in_flight: usize,
}

impl FundamentalsBatcher {
    pub fn new(api: Arc<dyn MarketDataApi>, max_in_flight: usize) -> Self {
        Self {
            api,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// One quotes call per root. Roots whose call fails, or whose response
    /// has no recognisable entry, are left out of the map.
    #[instrument(skip(self, roots), fields(root_count = roots.len()))]
    pub async fn batch(&self, roots: &BTreeSet<String>) -> HashMap<String, FundamentalsRecord> {
        let results: Vec<(String, Option<FundamentalsRecord>)> = stream::iter(roots.iter().cloned())
            .map(|root| async move {
                let symbol = quote_symbol(&root);
                let record = match self.api.fundamentals(&symbol).await {
                    Ok(response) => find_quote(&response, &root).map(FundamentalsRecord::from_quote),
                    Err(e) => {
                        warn!(root = %root, symbol = %symbol, error = %e, "Fundamentals query failed");
                        None
                    }
                };
                (root, record)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut fundamentals = HashMap::new();
        for (root, record) in results {
            match record {
                Some(record) => {
                    debug!(root = %root, ?record, "Fundamentals resolved");
                    fundamentals.insert(root, record);
                }
                None => debug!(root = %root, "No fundamentals available"),
            }
        }
        info!(
            requested = roots.len(),
            resolved = fundamentals.len(),
            "Fundamentals batch complete"
        );
        fundamentals
    }
}
