use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::FeedError;

/// Which third-party score provider to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProviderKind {
    /// No provider; every refresh is served from cache or mock data
    #[default]
    None,
    /// SportMonks Cricket API v2
    Sportmonks,
    /// Cricbuzz via the RapidAPI marketplace
    Rapidapi,
}

/// Cricket live scores, fixtures and news
#[derive(Parser, Debug, Clone)]
#[command(name = "cricket-live", version, about)]
pub struct Config {
    /// Score provider
    #[arg(long, env = "CRICKET_PROVIDER", value_enum, default_value = "none")]
    pub provider: ProviderKind,

    /// Provider API key (SportMonks token or RapidAPI key)
    #[arg(long, env = "CRICKET_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// RapidAPI host header
    #[arg(
        long,
        env = "CRICKET_API_HOST",
        default_value = "cricbuzz-cricket.p.rapidapi.com"
    )]
    pub api_host: String,

    /// Serve built-in mock data and never call the provider
    #[arg(
        long,
        env = "USE_MOCK",
        default_value = "true",
        action = clap::ArgAction::Set
    )]
    pub use_mock: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "8")]
    pub fetch_timeout_secs: u64,

    /// Refresh interval for all feeds in seconds
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: u64,

    /// Page server listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,
}

impl Config {
    /// Reject settings the service cannot start with.
    ///
    /// A missing API key is not fatal: it is reported by [`FeedConfig::check`]
    /// and the aggregator keeps serving fallback data.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if self.dashboard_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("dashboard_addr '{}' is not a socket address", self.dashboard_addr);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            provider: self.provider,
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            api_host: self.api_host.clone(),
            use_mock: self.use_mock,
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }
}

/// Settings the aggregator is constructed with.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub api_host: String,
    pub use_mock: bool,
    pub fetch_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            provider: ProviderKind::None,
            api_key: None,
            api_host: "cricbuzz-cricket.p.rapidapi.com".to_string(),
            use_mock: true,
            fetch_timeout: Duration::from_secs(8),
        }
    }
}

impl FeedConfig {
    /// Whether a live fetch may be attempted at all.
    pub fn check(&self) -> Result<(), FeedError> {
        if self.use_mock {
            return Ok(());
        }
        if self.api_key.is_none() {
            return Err(FeedError::Config(
                "CRICKET_API_KEY is required when USE_MOCK=false".to_string(),
            ));
        }
        if self.provider == ProviderKind::None {
            return Err(FeedError::Config(
                "CRICKET_PROVIDER must be set when USE_MOCK=false".to_string(),
            ));
        }
        Ok(())
    }
}
