use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::alias::aliases;
use super::symbol::ContractKey;
use crate::errors::TransportError;
use crate::market_data::types::{CHAIN_ENVELOPES, unwrap_envelope};
use crate::market_data::{ChainQuery, MarketDataApi};

/// Raw chain payload for one contract query, keyed expiry -> strike -> details.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainResponse(Map<String, Value>);

impl ChainResponse {
    /// Normalise a raw body. Anything that is not an object (flat or under
    /// `data`) becomes an empty response.
    pub fn from_value(value: Value) -> Self {
        let accepts = |object: &Map<String, Value>| {
            object.contains_key("callExpDateMap") || object.contains_key("putExpDateMap")
        };
        match unwrap_envelope(&value, &CHAIN_ENVELOPES, accepts) {
            Some(object) => ChainResponse(object.clone()),
            None => ChainResponse(value.as_object().cloned().unwrap_or_default()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

pub struct ChainResolver {
    api: Arc<dyn MarketDataApi>,
}

impl ChainResolver {
    pub fn new(api: Arc<dyn MarketDataApi>) -> Self {
        Self { api }
    }

    /// Query the chain for `key`, walking the ticker aliases until one returns
    /// a non-empty body.
    ///
    /// A transport failure on one spelling moves on to the next. `Err` is only
    /// returned when no spelling produced a body and at least one call failed;
    /// all-empty answers give an empty response.
    #[instrument(skip(self), fields(contract = %key))]
    pub async fn resolve(&self, key: &ContractKey) -> Result<ChainResponse, TransportError> {
        let mut last_err = None;
        for symbol in aliases(&key.root) {
            let query = ChainQuery::for_contract(&symbol, key);
            match self.api.chain(&query).await {
                Ok(body) => {
                    let response = ChainResponse::from_value(body);
                    if !response.is_empty() {
                        debug!(symbol = %symbol, "Chain resolved");
                        return Ok(response);
                    }
                    debug!(symbol = %symbol, "Empty chain response, trying next spelling");
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Chain query failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(ChainResponse::default()),
        }
    }
}
