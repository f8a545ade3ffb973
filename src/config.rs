use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_ACCOUNTS_URL, DEFAULT_CHAINS_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_IN_FLIGHT,
    DEFAULT_MAX_RETRIES, DEFAULT_QUOTES_URL, DEFAULT_REQUESTS_PER_SECOND,
};
use crate::errors::SetupError;

/// Where the bearer token comes from. Acquiring or refreshing the token is
/// someone else's job; we only read it.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(String),
    File(PathBuf),
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
}

impl TokenSource {
    pub fn access_token(&self) -> Result<String, SetupError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::File(path) => {
                let display = path.display().to_string();
                let content = fs::read_to_string(path).map_err(|source| SetupError::Io {
                    path: display.clone(),
                    source,
                })?;
                let token: TokenFile = serde_json::from_str(&content)
                    .map_err(|source| SetupError::Json { path: display, source })?;
                Ok(token.access_token)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum HoldingsSource {
    File(PathBuf),
    Api(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token_source: TokenSource,
    pub holdings_source: HoldingsSource,
    pub chains_url: String,
    pub quotes_url: String,
    pub output_path: PathBuf,
    pub raw_dump_path: Option<PathBuf>,
    pub http_timeout: Duration,
    pub max_in_flight: usize,
    pub requests_per_second: u32,
    pub max_retries: u32,
}

impl Config {
    /// Build the config from the process environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn load() -> Result<Self, SetupError> {
        let token_source = match (non_empty("SCHWAB_ACCESS_TOKEN"), non_empty("SCHWAB_TOKEN_PATH")) {
            (Some(token), _) => TokenSource::Static(token),
            (None, Some(path)) => TokenSource::File(PathBuf::from(path)),
            (None, None) => {
                return Err(SetupError::Missing(
                    "SCHWAB_ACCESS_TOKEN or SCHWAB_TOKEN_PATH".to_string(),
                ));
            }
        };

        let holdings_source = match non_empty("HOLDINGS_FILE") {
            Some(path) => HoldingsSource::File(PathBuf::from(path)),
            None => HoldingsSource::Api(
                non_empty("ACCOUNTS_URL").unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string()),
            ),
        };

        let max_in_flight: usize = parse_or("MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT)?;
        let requests_per_second: u32 = parse_or("REQUESTS_PER_SECOND", DEFAULT_REQUESTS_PER_SECOND)?;
        if max_in_flight == 0 {
            return Err(invalid("MAX_IN_FLIGHT", "0"));
        }
        if requests_per_second == 0 {
            return Err(invalid("REQUESTS_PER_SECOND", "0"));
        }

        Ok(Config {
            token_source,
            holdings_source,
            chains_url: non_empty("CHAINS_URL").unwrap_or_else(|| DEFAULT_CHAINS_URL.to_string()),
            quotes_url: non_empty("QUOTES_URL").unwrap_or_else(|| DEFAULT_QUOTES_URL.to_string()),
            output_path: PathBuf::from(
                non_empty("OUTPUT_PATH").unwrap_or_else(|| "positions.csv".to_string()),
            ),
            raw_dump_path: non_empty("RAW_DUMP_PATH").map(PathBuf::from),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?),
            max_in_flight,
            requests_per_second,
            max_retries: parse_or("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(name: &str, default: T) -> Result<T, SetupError> {
    match non_empty(name) {
        Some(raw) => raw.parse().map_err(|_| invalid(name, &raw)),
        None => Ok(default),
    }
}

fn invalid(name: &str, value: &str) -> SetupError {
    SetupError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const CONFIG_VARS: [&str; 12] = [
        "SCHWAB_ACCESS_TOKEN",
        "SCHWAB_TOKEN_PATH",
        "HOLDINGS_FILE",
        "ACCOUNTS_URL",
        "CHAINS_URL",
        "QUOTES_URL",
        "OUTPUT_PATH",
        "RAW_DUMP_PATH",
        "HTTP_TIMEOUT_SECS",
        "MAX_IN_FLIGHT",
        "REQUESTS_PER_SECOND",
        "MAX_RETRIES",
    ];

    /// Run `Config::load` with exactly `vars` set among the config variables.
    fn load_with(vars: &[(&str, &str)]) -> Result<Config, SetupError> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: every test touching the environment holds ENV_LOCK
        unsafe {
            for name in CONFIG_VARS {
                env::remove_var(name);
            }
            for (name, value) in vars {
                env::set_var(name, value);
            }
        }
        let result = Config::load();
        unsafe {
            for (name, _) in vars {
                env::remove_var(name);
            }
        }
        result
    }

    #[test]
    fn test_missing_token_source() {
        let err = load_with(&[]).unwrap_err();
        assert!(matches!(err, SetupError::Missing(ref what) if what.contains("SCHWAB_ACCESS_TOKEN")));
    }

    #[test]
    fn test_defaults_with_static_token() {
        let cfg = load_with(&[("SCHWAB_ACCESS_TOKEN", "tok")]).unwrap();

        assert!(matches!(cfg.token_source, TokenSource::Static(ref t) if t == "tok"));
        assert!(matches!(cfg.holdings_source, HoldingsSource::Api(ref url) if url == DEFAULT_ACCOUNTS_URL));
        assert_eq!(cfg.chains_url, DEFAULT_CHAINS_URL);
        assert_eq!(cfg.output_path, PathBuf::from("positions.csv"));
        assert_eq!(cfg.raw_dump_path, None);
        assert_eq!(cfg.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(cfg.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_holdings_file_and_token_path() {
        let cfg = load_with(&[
            ("SCHWAB_TOKEN_PATH", "/tmp/token.json"),
            ("HOLDINGS_FILE", "accounts.json"),
            ("MAX_IN_FLIGHT", " 8 "),
        ])
        .unwrap();

        assert!(matches!(cfg.token_source, TokenSource::File(ref p) if p == &PathBuf::from("/tmp/token.json")));
        assert!(matches!(cfg.holdings_source, HoldingsSource::File(ref p) if p == &PathBuf::from("accounts.json")));
        assert_eq!(cfg.max_in_flight, 8);
    }

    #[test]
    fn test_invalid_numbers_name_the_variable() {
        for (name, value) in [
            ("MAX_IN_FLIGHT", "0"),
            ("MAX_IN_FLIGHT", "four"),
            ("REQUESTS_PER_SECOND", "0"),
            ("HTTP_TIMEOUT_SECS", "-1"),
        ] {
            let err = load_with(&[("SCHWAB_ACCESS_TOKEN", "tok"), (name, value)]).unwrap_err();
            match err {
                SetupError::Invalid { name: got, value: raw } => {
                    assert_eq!(got, name);
                    assert_eq!(raw, value);
                }
                other => panic!("expected invalid {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_token_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"access_token": "abc123", "refresh_token": "r"}}"#).unwrap();

        let source = TokenSource::File(file.path().to_path_buf());
        assert_eq!(source.access_token().unwrap(), "abc123");
    }

    #[test]
    fn test_missing_token_file_is_setup_error() {
        let source = TokenSource::File(PathBuf::from("/nonexistent/schwab_token.json"));
        assert!(matches!(source.access_token(), Err(SetupError::Io { .. })));
    }

    #[test]
    fn test_malformed_token_file_is_setup_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"refresh_token": "r"}}"#).unwrap();

        let source = TokenSource::File(file.path().to_path_buf());
        assert!(matches!(source.access_token(), Err(SetupError::Json { .. })));
    }
}
