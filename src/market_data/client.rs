use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use nonzero_ext::nonzero;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::types::ChainQuery;
use crate::config::Config;
use crate::errors::TransportError;

/// The brokerage / market data calls the exporter depends on.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Raw chain-by-parameters response for one query.
    async fn chain(&self, query: &ChainQuery) -> Result<Value, TransportError>;

    /// Raw quotes response (fundamental fields) for one symbol.
    async fn fundamentals(&self, symbol: &str) -> Result<Value, TransportError>;

    /// Raw holdings payload (accounts with positions).
    async fn accounts(&self, accounts_url: &str) -> Result<Value, TransportError>;
}

struct SchwabRateLimiter {
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl reqwest_ratelimit::RateLimiter for SchwabRateLimiter {
    async fn acquire_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

/// Bearer-authenticated client for the Schwab trader and market data APIs.
#[derive(Debug, Clone)]
pub struct SchwabClient {
    http_client: ClientWithMiddleware,
    access_token: String,
    chains_url: String,
    quotes_url: String,
}

impl SchwabClient {
    pub fn new(config: &Config, access_token: String) -> Result<Self, TransportError> {
        // Base client with per-call timeout
        let reqwest_client = reqwest_middleware::reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(TransportError::Client)?;

        // Retry transient failures only, up to MAX_RETRIES
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_millis(4000))
            .build_with_max_retries(config.max_retries);

        // Shared quota across every request this client makes
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(1u32));
        let rate_limiter = SchwabRateLimiter {
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(per_second))),
        };

        let http_client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(reqwest_ratelimit::all(rate_limiter))
            .build();

        Ok(Self {
            http_client,
            access_token,
            chains_url: config.chains_url.trim_end_matches('/').to_string(),
            quotes_url: config.quotes_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: Url) -> Result<Value, TransportError> {
        let url_str = url.to_string();
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        // Non-2xx is an error even when the body is JSON
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status { status, url: url_str });
        }
        let body: Value = response
            .json()
            .await
            .map_err(|source| TransportError::Decode { url: url_str.clone(), source })?;
        debug!(url = %url_str, "Received market data response");
        Ok(body)
    }
}

#[async_trait]
impl MarketDataApi for SchwabClient {
    #[instrument(skip(self), fields(symbol = %query.symbol, strike = %query.strike))]
    async fn chain(&self, query: &ChainQuery) -> Result<Value, TransportError> {
        let params = serde_url_params::to_string(query)?;
        let url = Url::parse(&format!("{}?{}", self.chains_url, params))?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn fundamentals(&self, symbol: &str) -> Result<Value, TransportError> {
        let url = Url::parse_with_params(
            &format!("{}/{}/quotes", self.quotes_url, symbol),
            &[("fields", "fundamental")],
        )?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn accounts(&self, accounts_url: &str) -> Result<Value, TransportError> {
        let url = Url::parse_with_params(accounts_url, &[("fields", "positions")])?;
        self.get_json(url).await
    }
}
