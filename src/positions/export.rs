use std::fmt::Display;
use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use serde_json::Value;
use tracing::{info, instrument};

use super::record::PositionRecord;
use crate::constants::POSITION_HEADERS;
use crate::options::AnalyticsRecord;

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn raw_cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn analytics_cells(analytics: &AnalyticsRecord) -> Vec<String> {
    vec![
        raw_cell(analytics.delta.as_ref()),
        raw_cell(analytics.theta.as_ref()),
        raw_cell(analytics.volatility.as_ref()),
        raw_cell(analytics.total_volume.as_ref()),
        raw_cell(analytics.open_interest.as_ref()),
        raw_cell(analytics.time_value.as_ref()),
        raw_cell(analytics.high_price.as_ref()),
        raw_cell(analytics.low_price.as_ref()),
        raw_cell(analytics.close_price.as_ref()),
        raw_cell(analytics.deliverable_units.as_ref()),
        raw_cell(analytics.theoretical_volatility.as_ref()),
        analytics.underlying_price.to_string(),
        analytics.div_yield.to_string(),
        analytics.div_amount.to_string(),
        cell(analytics.div_ex_date.as_deref()),
        cell(analytics.last_earnings_date.as_deref()),
        cell(analytics.next_div_ex_date.as_deref()),
        raw_cell(analytics.days_to_expiration.as_ref()),
    ]
}

/// Cells for one record, in `POSITION_HEADERS` order.
pub fn row_cells(record: &PositionRecord) -> Vec<String> {
    let mut cells = vec![
        record.account_id.clone(),
        cell(record.symbol.as_deref()),
        cell(record.cusip.as_deref()),
        cell(record.description.as_deref()),
        cell(record.asset_type.as_deref()),
        record.long_quantity.to_string(),
        record.short_quantity.to_string(),
        record.net_quantity.to_string(),
        record.average_price.to_string(),
        cell(record.market_value),
        cell(record.maintenance_requirement),
        cell(record.average_long_price),
        record.long_open_profit_loss.to_string(),
        record.short_open_profit_loss.to_string(),
        record.net_open_profit_loss.to_string(),
        record.cost_basis.to_string(),
        cell(record.current_day_profit_loss),
        cell(record.current_day_profit_loss_pct),
    ];
    match &record.analytics {
        Some(analytics) => cells.extend(analytics_cells(analytics)),
        None => cells.resize(POSITION_HEADERS.len(), String::new()),
    }
    cells
}

/// Write the positions table as CSV, header first.
#[instrument(skip(records), fields(row_count = records.len()))]
pub fn write_csv(path: &Path, records: &[PositionRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("failed to open {}", path.display()))?;
    writer.write_record(POSITION_HEADERS)?;
    for record in records {
        writer.write_record(row_cells(record))?;
    }
    writer.flush()?;
    info!(path = %path.display(), "Positions written");
    Ok(())
}

/// Pretty-printed copy of the raw holdings payload.
pub fn write_raw_dump(path: &Path, payload: &Value) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(payload)?)
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::record::materialize;
    use serde_json::json;

    fn records() -> Vec<PositionRecord> {
        materialize(&json!({"securitiesAccount": {"accountNumber": "9", "positions": [
            {"longQuantity": 1, "averagePrice": 2.5, "instrument": {"assetType": "OPTION", "symbol": "AAPL  250620C00150000"}},
            {"longQuantity": 3, "averagePrice": 10, "instrument": {"assetType": "EQUITY", "symbol": "AAPL"}}
        ]}}))
    }

    #[test]
    fn test_row_cells_match_header_width() {
        let mut records = records();
        records[0].analytics = Some(AnalyticsRecord {
            delta: Some(json!(0.55)),
            theta: Some(json!("NaN")),
            days_to_expiration: Some(json!(7)),
            ..Default::default()
        });

        for record in &records {
            assert_eq!(row_cells(record).len(), POSITION_HEADERS.len());
        }
        let cells = row_cells(&records[0]);
        assert_eq!(cells[18], "0.55");
        assert_eq!(cells[19], "NaN");
        assert_eq!(cells[35], "7");
        assert!(row_cells(&records[1])[18..].iter().all(String::is_empty));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("positions.csv");

        write_csv(&path, &records()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("accountId,symbol,cusip"));
        assert!(lines.next().unwrap().starts_with("9,AAPL  250620C00150000,"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_write_raw_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let payload = json!({"securitiesAccount": {"accountNumber": "9"}});

        write_raw_dump(&path, &payload).unwrap();

        let read: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, payload);
    }
}
