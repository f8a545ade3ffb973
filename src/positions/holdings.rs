use std::fs;

use eyre::{Result, WrapErr};
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::HoldingsSource;
use crate::market_data::MarketDataApi;

/// Account objects inside a raw holdings payload. Accepts a list of accounts,
/// a single account object, or an object with an `accounts` list.
pub fn accounts(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(object) if object.contains_key("securitiesAccount") => vec![payload],
        Value::Object(object) => object
            .get("accounts")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Raw holdings payload, read from disk or fetched from the accounts endpoint.
#[instrument(skip(api))]
pub async fn load_holdings(source: &HoldingsSource, api: &dyn MarketDataApi) -> Result<Value> {
    let payload: Value = match source {
        HoldingsSource::File(path) => {
            let content = fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read holdings file {}", path.display()))?;
            serde_json::from_str(&content)
                .wrap_err_with(|| format!("failed to parse holdings file {}", path.display()))?
        }
        HoldingsSource::Api(url) => api.accounts(url).await.wrap_err("failed to fetch accounts")?,
    };
    info!(account_count = accounts(&payload).len(), "Holdings loaded");
    Ok(payload)
}
