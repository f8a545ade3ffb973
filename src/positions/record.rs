use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::holdings::accounts;
use crate::constants::{OPTION_ASSET_TYPE, OPTION_CONTRACT_MULTIPLIER, UNKNOWN_ACCOUNT};
use crate::options::AnalyticsRecord;

/// Lenient numeric read. Numbers and numeric strings parse; anything else
/// leaves the cell empty instead of dropping the row.
fn decimal_field(object: &Map<String, Value>, name: &'static str) -> Option<Decimal> {
    let parsed = match object.get(name)? {
        Value::Null => return None,
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(field = name, "Unreadable numeric field, leaving it blank");
    }
    parsed
}

fn text_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    object.get(name).and_then(Value::as_str).map(str::to_string)
}

/// One held instrument. `analytics` is only ever filled for option rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub account_id: String,
    pub symbol: Option<String>,
    pub cusip: Option<String>,
    pub description: Option<String>,
    pub asset_type: Option<String>,
    pub long_quantity: Decimal,
    pub short_quantity: Decimal,
    pub net_quantity: Decimal,
    pub average_price: Decimal,
    pub market_value: Option<Decimal>,
    pub maintenance_requirement: Option<Decimal>,
    pub average_long_price: Option<Decimal>,
    pub long_open_profit_loss: Decimal,
    pub short_open_profit_loss: Decimal,
    pub net_open_profit_loss: Decimal,
    pub cost_basis: Decimal,
    pub current_day_profit_loss: Option<Decimal>,
    pub current_day_profit_loss_pct: Option<Decimal>,
    pub analytics: Option<AnalyticsRecord>,
}

impl PositionRecord {
    fn from_json(account_id: &str, position: &Map<String, Value>) -> Self {
        let empty = Map::new();
        let instrument = position.get("instrument").and_then(Value::as_object).unwrap_or(&empty);
        let asset_type = text_field(instrument, "assetType");
        let symbol = text_field(instrument, "symbol");

        let long_quantity = decimal_field(position, "longQuantity").unwrap_or_default();
        let short_quantity = decimal_field(position, "shortQuantity").unwrap_or_default();
        let average_price = decimal_field(position, "averagePrice").unwrap_or_default();
        let long_pl = decimal_field(position, "longOpenProfitLoss").unwrap_or_default();
        let short_pl = decimal_field(position, "shortOpenProfitLoss").unwrap_or_default();

        let multiplier = if asset_type.as_deref() == Some(OPTION_ASSET_TYPE) {
            Decimal::from(OPTION_CONTRACT_MULTIPLIER)
        } else {
            Decimal::ONE
        };

        // Overflowing derived values fall back to 0
        let or_zero = |value: Option<Decimal>, field: &'static str| {
            value.unwrap_or_else(|| {
                warn!(symbol = ?symbol, field, "Derived value overflowed, using 0");
                Decimal::ZERO
            })
        };
        let cost_basis = or_zero(
            long_quantity
                .checked_add(short_quantity)
                .and_then(|qty| qty.checked_mul(average_price))
                .and_then(|cost| cost.checked_mul(multiplier)),
            "costBasis",
        );
        let net_quantity = or_zero(long_quantity.checked_sub(short_quantity), "netQuantity");
        let net_open_profit_loss = or_zero(long_pl.checked_add(short_pl), "netOpenProfitLoss");

        Self {
            account_id: account_id.to_string(),
            cusip: text_field(instrument, "cusip"),
            description: text_field(instrument, "description"),
            long_quantity,
            short_quantity,
            net_quantity,
            average_price,
            market_value: decimal_field(position, "marketValue"),
            maintenance_requirement: decimal_field(position, "maintenanceRequirement"),
            average_long_price: decimal_field(position, "averageLongPrice"),
            long_open_profit_loss: long_pl,
            short_open_profit_loss: short_pl,
            net_open_profit_loss,
            cost_basis,
            current_day_profit_loss: decimal_field(position, "currentDayProfitLoss"),
            current_day_profit_loss_pct: decimal_field(position, "currentDayProfitLossPercentage"),
            symbol,
            asset_type,
            analytics: None,
        }
    }

    pub fn is_option(&self) -> bool {
        self.asset_type.as_deref() == Some(OPTION_ASSET_TYPE)
    }
}

fn account_id(securities_account: &Map<String, Value>) -> String {
    match securities_account.get("accountNumber") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => UNKNOWN_ACCOUNT.to_string(),
    }
}

/// Flatten the payload into position rows, preserving account and position order.
pub fn materialize(payload: &Value) -> Vec<PositionRecord> {
    let mut records = Vec::new();
    for account in accounts(payload) {
        let Some(securities_account) = account.get("securitiesAccount").and_then(Value::as_object) else {
            debug!("Skipping account without a securitiesAccount object");
            continue;
        };
        let account_id = account_id(securities_account);
        let positions = securities_account
            .get("positions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for position in positions {
            match position.as_object() {
                Some(position) => records.push(PositionRecord::from_json(&account_id, position)),
                None => warn!(account_id = %account_id, "Skipping position that is not an object"),
            }
        }
    }
    info!(
        position_count = records.len(),
        option_count = records.iter().filter(|r| r.is_option()).count(),
        "Positions materialized"
    );
    records
}
