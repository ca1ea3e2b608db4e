use std::time::Duration;

use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://bnews.db?mode=rwc";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_RETRIES: usize = 2;
const DEFAULT_TRENDING_TTL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Where the hosted database and its functions live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub base_url: String,
    pub anon_key: String,
}

impl RemoteEndpoint {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            anon_key: anon_key.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote: RemoteEndpoint,
    pub database_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub trending_ttl: Duration,
}

impl Config {
    pub fn new(remote: RemoteEndpoint) -> Self {
        Self {
            remote,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            trending_ttl: Duration::from_secs(DEFAULT_TRENDING_TTL_SECS),
        }
    }

    /// Reads `.env.local` when present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::from_filename(".env.local");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };
        let base_url = required("BNEWS_SUPABASE_URL")?.trim().to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue("BNEWS_SUPABASE_URL", base_url));
        }
        let anon_key = required("BNEWS_SUPABASE_ANON_KEY")?;

        let mut config = Self::new(RemoteEndpoint::new(&base_url, &anon_key));
        if let Some(database_url) = lookup("BNEWS_DATABASE_URL").filter(|value| !value.trim().is_empty()) {
            config.database_url = database_url;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BNEWS_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<usize>(&lookup, "BNEWS_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "BNEWS_TRENDING_TTL_SECS")? {
            config.trending_ttl = Duration::from_secs(secs);
        }
        debug!(base_url = %config.remote.base_url, database_url = %config.database_url, "configuration loaded");
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        _ => Ok(None),
    }
}
