use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, bail};
use axum::{Json, debug_handler, extract::State};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    AppState,
    spam::SpamConfig,
    throttle::{RateLimit, ThrottleLimits},
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_messages: usize,
    pub max_message_length: usize,
    pub max_pseudo_length: usize,
    pub post_rate_limit: usize,
    pub delete_rate_limit: usize,
    pub rate_limit_window: Duration,
    pub request_size_limit: usize,
    pub spam: SpamConfig,
    pub behind_proxy: bool,
    pub seed_messages: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            max_messages: 100,
            max_message_length: 500,
            max_pseudo_length: 30,
            post_rate_limit: 5,
            delete_rate_limit: 10,
            rate_limit_window: Duration::from_secs(60),
            request_size_limit: 10 * 1024,
            spam: SpamConfig::default(),
            behind_proxy: false,
            seed_messages: false,
            log_dir: None,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: try_load(&lookup, "HOST", defaults.host)?,
            port: try_load(&lookup, "PORT", defaults.port)?,
            max_messages: try_load(&lookup, "MAX_MESSAGES", defaults.max_messages)?,
            max_message_length: try_load(
                &lookup,
                "MAX_MESSAGE_LENGTH",
                defaults.max_message_length,
            )?,
            max_pseudo_length: try_load(&lookup, "MAX_PSEUDO_LENGTH", defaults.max_pseudo_length)?,
            post_rate_limit: try_load(&lookup, "POST_RATE_LIMIT", defaults.post_rate_limit)?,
            delete_rate_limit: try_load(&lookup, "DELETE_RATE_LIMIT", defaults.delete_rate_limit)?,
            rate_limit_window: Duration::from_secs(try_load(
                &lookup,
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window.as_secs(),
            )?),
            request_size_limit: try_load::<ByteSize, _>(
                &lookup,
                "REQUEST_SIZE_LIMIT",
                ByteSize(defaults.request_size_limit),
            )?
            .0,
            spam: SpamConfig {
                min_interval: Duration::from_millis(try_load(
                    &lookup,
                    "MIN_INTERVAL_BETWEEN_MESSAGES",
                    defaults.spam.min_interval.as_millis() as u64,
                )?),
                similarity_threshold: try_load(
                    &lookup,
                    "SIMILARITY_THRESHOLD",
                    defaults.spam.similarity_threshold,
                )?,
                max_similar: try_load(&lookup, "MAX_SIMILAR_MESSAGES", defaults.spam.max_similar)?,
                history_size: try_load(&lookup, "SPAM_HISTORY_SIZE", defaults.spam.history_size)?,
            },
            behind_proxy: try_load(&lookup, "BEHIND_PROXY", defaults.behind_proxy)?,
            seed_messages: try_load(&lookup, "SEED_MESSAGES", defaults.seed_messages)?,
            log_dir: lookup("LOG_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_messages == 0 {
            bail!("MAX_MESSAGES must be at least 1");
        }
        if self.max_message_length == 0 || self.max_pseudo_length == 0 {
            bail!("MAX_MESSAGE_LENGTH and MAX_PSEUDO_LENGTH must be at least 1");
        }
        if self.spam.max_similar == 0 {
            bail!("MAX_SIMILAR_MESSAGES must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.spam.similarity_threshold) {
            bail!(
                "SIMILARITY_THRESHOLD must be within 0..=1, got {}",
                self.spam.similarity_threshold
            );
        }
        if self.rate_limit_window.is_zero() {
            bail!("RATE_LIMIT_WINDOW_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn throttle_limits(&self) -> ThrottleLimits {
        ThrottleLimits {
            post: RateLimit {
                max_requests: self.post_rate_limit,
                window: self.rate_limit_window,
            },
            delete: RateLimit {
                max_requests: self.delete_rate_limit,
                window: self.rate_limit_window,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default}");
        return Ok(default);
    };

    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid {key} value {raw:?}: {e}")
    })
}

/// A byte count written as `10240`, `10kb` or `1mb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteSize(usize);

impl FromStr for ByteSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (digits, multiplier) = if let Some(n) = lower.strip_suffix("mb") {
            (n, 1024 * 1024)
        } else if let Some(n) = lower.strip_suffix("kb") {
            (n, 1024)
        } else if let Some(n) = lower.strip_suffix('b') {
            (n, 1)
        } else {
            (lower.as_str(), 1)
        };

        let count: usize = digits
            .trim()
            .parse()
            .with_context(|| format!("not a byte size: {s:?}"))?;
        count
            .checked_mul(multiplier)
            .map(ByteSize)
            .with_context(|| format!("byte size overflows: {s:?}"))
    }
}

impl Display for ByteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}b", self.0)
    }
}

/// Limits the client needs to mirror the server's checks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub max_messages: usize,
    pub max_message_length: usize,
    pub max_pseudo_length: usize,
    pub post_rate_limit: usize,
    pub delete_rate_limit: usize,
}

impl From<&Config> for PublicConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_messages: config.max_messages,
            max_message_length: config.max_message_length,
            max_pseudo_length: config.max_pseudo_length,
            post_rate_limit: config.post_rate_limit,
            delete_rate_limit: config.delete_rate_limit,
        }
    }
}

#[debug_handler]
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfig> {
    Json(PublicConfig::from(state.config.as_ref()))
}
