use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::options::symbol::ContractKey;

/// Query string for the chain-by-parameters endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainQuery {
    pub symbol: String,
    pub contract_type: String, // "CALL" or "PUT"
    pub strategy: String,      // always "SINGLE"
    pub strike: String,
    pub from_date: String,
    pub to_date: String,
    pub include_quotes: String, // "TRUE"
}

impl ChainQuery {
    /// Single-strike, single-expiry query for `key` under the given ticker spelling.
    pub fn for_contract(symbol: &str, key: &ContractKey) -> Self {
        let expiry = key.expiry_str();
        Self {
            symbol: symbol.to_string(),
            contract_type: key.kind.contract_type().to_string(),
            strategy: "SINGLE".to_string(),
            strike: format_strike(key.strike),
            from_date: expiry.clone(),
            to_date: expiry,
            include_quotes: "TRUE".to_string(),
        }
    }
}

/// Whole strikes are sent as integers, everything else with two decimals.
pub fn format_strike(strike: Decimal) -> String {
    if strike.fract().is_zero() {
        strike.trunc().normalize().to_string()
    } else {
        format!("{:.2}", strike.round_dp(2))
    }
}

/// One way of locating the payload object inside a raw response.
pub type EnvelopeStrategy = fn(&Value) -> Option<&Map<String, Value>>;

fn flat(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

fn quotes_envelope(value: &Value) -> Option<&Map<String, Value>> {
    value.get("quotes")?.as_object()
}

fn data_envelope(value: &Value) -> Option<&Map<String, Value>> {
    value.get("data")?.as_object()
}

/// Envelope strategies for quotes responses. Wrapped shapes are checked
/// before the flat object so a `quotes` key is never mistaken for a symbol.
pub const QUOTE_ENVELOPES: [EnvelopeStrategy; 3] = [quotes_envelope, data_envelope, flat];

/// Envelope strategies for chain responses, tried until one exposes `accepts`.
pub const CHAIN_ENVELOPES: [EnvelopeStrategy; 2] = [flat, data_envelope];

/// Apply `strategies` in order and return the first object satisfying `accepts`.
pub fn unwrap_envelope<'a>(
    value: &'a Value,
    strategies: &[EnvelopeStrategy],
    accepts: impl Fn(&Map<String, Value>) -> bool,
) -> Option<&'a Map<String, Value>> {
    strategies
        .iter()
        .filter_map(|strategy| strategy(value))
        .find(|object| accepts(object))
}
