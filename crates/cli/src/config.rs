//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through a `RELAY_*` environment
//! variable. [`Cli::into_settings`] validates the raw values once at startup;
//! nothing touches the network with an invalid configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use controller::ControllerConfig;
use pipeline::{BackoffConfig, ChannelId, RelayError, SubjectName};

const DEFAULT_CLIENT_URL: &str = "https://127.0.0.1:2999";
const DEFAULT_SERVER_URL: &str = "https://discord-js-boi-bot.herokuapp.com";
const DEFAULT_CHANNEL_ID: &str = "387298617431425025";

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(
    name = "killfeed-relay",
    version,
    about = "Relays game-start and death events from the live game client to a chat bot"
)]
pub struct Cli {
    /// Base URL of the game client's live-data API
    #[arg(long, env = "RELAY_CLIENT_URL", default_value = DEFAULT_CLIENT_URL)]
    pub client_url: String,

    /// Base URL of the server receiving notifications
    #[arg(long, env = "RELAY_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Player to track; asked from the game client when omitted
    #[arg(long, env = "RELAY_SUMMONER_NAME")]
    pub summoner_name: Option<String>,

    /// Chat channel forwarded with the game-start notification
    #[arg(long, env = "RELAY_CHANNEL_ID", default_value = DEFAULT_CHANNEL_ID)]
    pub channel_id: String,

    /// Milliseconds between polls of the event feed
    #[arg(long, env = "RELAY_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "RELAY_REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Smallest delivery retry delay in milliseconds
    #[arg(long, env = "RELAY_BACKOFF_MIN_MS", default_value_t = 100)]
    pub backoff_min_ms: u64,

    /// Largest delivery retry delay in milliseconds
    #[arg(long, env = "RELAY_BACKOFF_MAX_MS", default_value_t = 5000)]
    pub backoff_max_ms: u64,

    /// Delivery retries before giving up (0 retries forever)
    #[arg(long, env = "RELAY_BACKOFF_MAX_RETRIES", default_value_t = 3)]
    pub backoff_max_retries: u32,

    /// Idle keep-alive connections kept per host
    #[arg(long, env = "RELAY_POOL_MAX_IDLE_PER_HOST", default_value_t = 4)]
    pub pool_max_idle_per_host: usize,

    /// Accept self-signed TLS certificates (the game client uses one)
    #[arg(long, env = "RELAY_ACCEPT_INVALID_CERTS")]
    pub accept_invalid_certs: bool,

    /// Log line encoding
    #[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; span export is off when unset
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_url: String,
    pub server_url: String,
    pub pool_max_idle_per_host: usize,
    pub accept_invalid_certs: bool,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub controller: ControllerConfig,
}

impl Cli {
    /// Validates the raw options.
    ///
    /// # Errors
    ///
    /// [`RelayError::ConfigurationError`] naming the first offending option.
    pub fn into_settings(self) -> Result<Settings, RelayError> {
        check_url("client-url", &self.client_url)?;
        check_url("server-url", &self.server_url)?;

        if self.poll_interval_ms == 0 {
            return Err(RelayError::config("poll-interval-ms must be greater than zero"));
        }
        if self.request_timeout_ms == 0 {
            return Err(RelayError::config("request-timeout-ms must be greater than zero"));
        }
        if self.backoff_min_ms == 0 {
            return Err(RelayError::config("backoff-min-ms must be greater than zero"));
        }
        let backoff = BackoffConfig::new(
            Duration::from_millis(self.backoff_min_ms),
            Duration::from_millis(self.backoff_max_ms),
            self.backoff_max_retries,
        )?;

        let subject = match self.summoner_name {
            Some(name) => Some(
                SubjectName::new(name.trim())
                    .ok_or_else(|| RelayError::config("summoner-name must not be empty"))?,
            ),
            None => None,
        };
        let channel = ChannelId::new(self.channel_id.trim())
            .ok_or_else(|| RelayError::config("channel-id must not be empty"))?;

        Ok(Settings {
            client_url: self.client_url,
            server_url: self.server_url,
            pool_max_idle_per_host: self.pool_max_idle_per_host,
            accept_invalid_certs: self.accept_invalid_certs,
            log_format: self.log_format,
            otlp_endpoint: self.otlp_endpoint.filter(|e| !e.trim().is_empty()),
            controller: ControllerConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                backoff,
                subject,
                channel,
            },
        })
    }
}

fn check_url(option: &str, value: &str) -> Result<(), RelayError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| RelayError::config(format!("{option} '{value}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RelayError::config(format!(
            "{option} must use http or https, not '{other}'"
        ))),
    }
}
