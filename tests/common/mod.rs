#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use positions_exporter::errors::TransportError;
use positions_exporter::market_data::{ChainQuery, MarketDataApi};

/// In-memory market data API. Unknown symbols get an empty object; symbols in
/// `failing` get an HTTP 500.
#[derive(Default)]
pub struct StubApi {
    pub chains: HashMap<String, Value>,
    pub quotes: HashMap<String, Value>,
    pub failing: Vec<String>,
    pub accounts: Option<Value>,
    pub chain_calls: Mutex<Vec<ChainQuery>>,
    pub quote_calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn with_chain(mut self, symbol: &str, body: Value) -> Self {
        self.chains.insert(symbol.to_string(), body);
        self
    }

    pub fn with_quote(mut self, symbol: &str, body: Value) -> Self {
        self.quotes.insert(symbol.to_string(), body);
        self
    }

    pub fn with_accounts(mut self, body: Value) -> Self {
        self.accounts = Some(body);
        self
    }

    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    pub fn chain_symbols(&self) -> Vec<String> {
        self.chain_calls.lock().unwrap().iter().map(|q| q.symbol.clone()).collect()
    }

    pub fn quote_symbols(&self) -> Vec<String> {
        self.quote_calls.lock().unwrap().clone()
    }

    fn server_error(&self, symbol: &str) -> TransportError {
        TransportError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            url: format!("stub/{}", symbol),
        }
    }
}

#[async_trait]
impl MarketDataApi for StubApi {
    async fn chain(&self, query: &ChainQuery) -> Result<Value, TransportError> {
        self.chain_calls.lock().unwrap().push(query.clone());
        if self.failing.contains(&query.symbol) {
            return Err(self.server_error(&query.symbol));
        }
        Ok(self.chains.get(&query.symbol).cloned().unwrap_or_else(|| json!({})))
    }

    async fn fundamentals(&self, symbol: &str) -> Result<Value, TransportError> {
        self.quote_calls.lock().unwrap().push(symbol.to_string());
        if self.failing.contains(&symbol.to_string()) {
            return Err(self.server_error(symbol));
        }
        Ok(self.quotes.get(symbol).cloned().unwrap_or_else(|| json!({})))
    }

    async fn accounts(&self, accounts_url: &str) -> Result<Value, TransportError> {
        self.accounts.clone().ok_or_else(|| self.server_error(accounts_url))
    }
}

/// Wraps a `StubApi`, holding every call open briefly so overlapping calls
/// are observable. Records the call sequence and the peak overlap.
#[derive(Default)]
pub struct TrackingApi {
    pub inner: StubApi,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub events: Mutex<Vec<&'static str>>,
}

impl TrackingApi {
    async fn track<T>(&self, event: &'static str, call: impl Future<Output = T>) -> T {
        self.events.lock().unwrap().push(event);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = call.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl MarketDataApi for TrackingApi {
    async fn chain(&self, query: &ChainQuery) -> Result<Value, TransportError> {
        self.track("chain", self.inner.chain(query)).await
    }

    async fn fundamentals(&self, symbol: &str) -> Result<Value, TransportError> {
        self.track("fundamentals", self.inner.fundamentals(symbol)).await
    }

    async fn accounts(&self, accounts_url: &str) -> Result<Value, TransportError> {
        self.inner.accounts(accounts_url).await
    }
}

pub fn option_position(symbol: &str) -> Value {
    json!({
        "longQuantity": 1,
        "shortQuantity": 0,
        "averagePrice": 2.15,
        "marketValue": 230.0,
        "instrument": {"assetType": "OPTION", "symbol": symbol, "cusip": "0AAPL.FK50150000"}
    })
}

pub fn equity_position(symbol: &str) -> Value {
    json!({
        "longQuantity": 100,
        "averagePrice": 180.25,
        "instrument": {"assetType": "EQUITY", "symbol": symbol}
    })
}

pub fn holdings(positions: Vec<Value>) -> Value {
    json!([{"securitiesAccount": {"accountNumber": "87654321", "positions": positions}}])
}

/// Chain body with one call contract at `expiry`/`strike_key`.
pub fn call_chain(symbol: &str, expiry: &str, strike_key: &str, delta: f64) -> Value {
    json!({
        "symbol": symbol,
        "status": "SUCCESS",
        "underlying": {"mark": 196.4, "last": 196.5},
        "callExpDateMap": {
            format!("{}:30", expiry): {
                strike_key: [{
                    "putCall": "CALL",
                    "delta": delta,
                    "theta": -0.05,
                    "volatility": 24.1,
                    "totalVolume": 310,
                    "openInterest": 8821,
                    "timeValue": 3.2,
                    "highPrice": 48.9,
                    "lowPrice": 46.1,
                    "closePrice": 47.0,
                    "theoreticalVolatility": 29.0,
                    "daysToExpiration": 30,
                    "optionDeliverablesList": [{"symbol": symbol, "deliverableUnits": 100.0}]
                }]
            }
        },
        "putExpDateMap": {}
    })
}
