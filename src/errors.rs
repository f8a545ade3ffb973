use thiserror::Error;

/// Failures talking to the brokerage / market data API.
///
/// A chain lookup that fails with one of these is recorded against the row;
/// it never aborts the run.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("request to {url} returned HTTP {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("failed to decode response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to encode query parameters: {0}")]
    Serialize(#[from] serde_url_params::Error),
}

/// Problems found before any work starts. These abort the run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("missing configuration: {0}")]
    Missing(String),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: String, value: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A pipeline step was called out of order.
#[derive(Debug, Error)]
#[error("cannot {action} while the run is in phase {phase:?}")]
pub struct PhaseError {
    pub action: &'static str,
    pub phase: crate::enrichment::RunPhase,
}
