use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::{Map, Value};

use super::chain::ChainResponse;
use super::fundamentals::FundamentalsRecord;
use super::symbol::ContractKey;

/// Strike keys are serialised floats, so they are matched within this tolerance.
const STRIKE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Underlying price fields, in preference order, on the chain's `underlying` block.
const UNDERLYING_PRICE_FIELDS: [&str; 4] = ["mark", "last", "close", "price"];

/// Per-contract analytics plus the underlying's fundamentals.
///
/// Contract fields are carried as the chain returned them; `None` means the
/// field was absent or null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsRecord {
    pub delta: Option<Value>,
    pub theta: Option<Value>,
    pub volatility: Option<Value>,
    pub total_volume: Option<Value>,
    pub open_interest: Option<Value>,
    pub time_value: Option<Value>,
    pub high_price: Option<Value>,
    pub low_price: Option<Value>,
    pub close_price: Option<Value>,
    pub deliverable_units: Option<Value>,
    pub theoretical_volatility: Option<Value>,
    pub underlying_price: f64,
    pub div_yield: f64,
    pub div_amount: f64,
    pub div_ex_date: Option<String>,
    pub last_earnings_date: Option<String>,
    pub next_div_ex_date: Option<String>,
    pub days_to_expiration: Option<Value>,
}

/// Locate `key` inside a chain response and pull out its analytics.
///
/// Returns `None` when the side, expiry, strike or contract entry is missing.
pub fn extract(
    response: &ChainResponse,
    key: &ContractKey,
    fundamentals: Option<&FundamentalsRecord>,
) -> Option<AnalyticsRecord> {
    let exp_date_map = response
        .get(key.kind.exp_date_map_key())?
        .as_object()
        .filter(|m| !m.is_empty())?;

    let expiry = key.expiry_str();
    let strikes = exp_date_map
        .iter()
        .find(|(exp_key, _)| exp_key.split(':').next() == Some(expiry.as_str()))
        .and_then(|(_, strikes)| strikes.as_object())?;

    let contract = strikes
        .iter()
        .find(|(strike_key, _)| {
            parse_strike(strike_key).is_some_and(|s| (s - key.strike).abs() < STRIKE_TOLERANCE)
        })
        .and_then(|(_, entries)| entries.as_array())
        .and_then(|entries| entries.first())
        .and_then(Value::as_object)?;

    let field = |name: &str| contract.get(name).filter(|v| !v.is_null()).cloned();
    let fundamentals = fundamentals.cloned().unwrap_or_default();

    Some(AnalyticsRecord {
        delta: field("delta"),
        theta: field("theta"),
        volatility: field("volatility"),
        total_volume: field("totalVolume"),
        open_interest: field("openInterest"),
        time_value: field("timeValue"),
        high_price: field("highPrice"),
        low_price: field("lowPrice"),
        close_price: field("closePrice"),
        deliverable_units: deliverable_units(contract),
        theoretical_volatility: field("theoreticalVolatility"),
        underlying_price: underlying_price(response),
        div_yield: fundamentals.div_yield.unwrap_or(0.0),
        div_amount: fundamentals.div_amount.unwrap_or(0.0),
        div_ex_date: fundamentals.div_ex_date,
        last_earnings_date: fundamentals.last_earnings_date,
        next_div_ex_date: fundamentals.next_div_ex_date,
        days_to_expiration: field("daysToExpiration"),
    })
}

fn parse_strike(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(Decimal::from_f64))
}

fn deliverable_units(contract: &Map<String, Value>) -> Option<Value> {
    contract
        .get("optionDeliverablesList")?
        .as_array()?
        .first()?
        .get("deliverableUnits")
        .filter(|v| !v.is_null())
        .cloned()
}

fn underlying_price(response: &ChainResponse) -> f64 {
    let underlying = response.get("underlying").and_then(Value::as_object);
    UNDERLYING_PRICE_FIELDS
        .iter()
        .find_map(|field| underlying.and_then(|u| u.get(*field)).and_then(Value::as_f64))
        .or_else(|| response.get("underlyingPrice").and_then(Value::as_f64))
        .unwrap_or(0.0)
}
