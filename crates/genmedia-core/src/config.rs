//! Configuration module
//!
//! Provider credentials, endpoints, and the video polling policy, read from
//! the environment (after loading `.env` when present).

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_OPTIMIZER_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
const HTTP_TIMEOUT_SECS: u64 = 120;
const VIDEO_POLL_INTERVAL_SECS: u64 = 10;
const VIDEO_POLL_MAX_TRANSIENT_FAILURES: u32 = 3;

/// Application configuration.
///
/// `api_key` is optional here so that a missing credential can be reported
/// as a configuration error when a provider is built, before any call.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub optimizer_model: String,
    pub video_model: String,
    pub http_timeout_secs: u64,
    pub video_poll_interval_secs: u64,
    /// `None` keeps polling until the job is done.
    pub video_poll_max_attempts: Option<u32>,
    pub video_poll_max_transient_failures: u32,
}

// The API key must never end up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("optimizer_model", &self.optimizer_model)
            .field("video_model", &self.video_model)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("video_poll_interval_secs", &self.video_poll_interval_secs)
            .field("video_poll_max_attempts", &self.video_poll_max_attempts)
            .field(
                "video_poll_max_transient_failures",
                &self.video_poll_max_transient_failures,
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            optimizer_model: DEFAULT_OPTIMIZER_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            video_poll_interval_secs: VIDEO_POLL_INTERVAL_SECS,
            video_poll_max_attempts: None,
            video_poll_max_transient_failures: VIDEO_POLL_MAX_TRANSIENT_FAILURES,
        }
    }
}

/// Parse an optional numeric variable; a value that is set but unparseable
/// is a configuration error.
fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| {
                AppError::Config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    name,
                    value.trim()
                ))
            })
        })
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            api_base_url: non_empty("GEMINI_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            optimizer_model: non_empty("OPTIMIZER_MODEL")
                .unwrap_or_else(|| DEFAULT_OPTIMIZER_MODEL.to_string()),
            video_model: non_empty("VIDEO_MODEL").unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            http_timeout_secs: parse_var(&non_empty, "HTTP_TIMEOUT_SECS")?
                .unwrap_or(HTTP_TIMEOUT_SECS),
            video_poll_interval_secs: parse_var(&non_empty, "VIDEO_POLL_INTERVAL_SECS")?
                .unwrap_or(VIDEO_POLL_INTERVAL_SECS),
            video_poll_max_attempts: parse_var(&non_empty, "VIDEO_POLL_MAX_ATTEMPTS")?,
            video_poll_max_transient_failures: parse_var(
                &non_empty,
                "VIDEO_POLL_MAX_TRANSIENT_FAILURES",
            )?
            .unwrap_or(VIDEO_POLL_MAX_TRANSIENT_FAILURES),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(AppError::Config(
                "GEMINI_API_BASE_URL must be an http(s) URL".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        if self.video_poll_interval_secs == 0 {
            return Err(AppError::Config(
                "VIDEO_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        if self.video_poll_max_attempts == Some(0) {
            return Err(AppError::Config(
                "VIDEO_POLL_MAX_ATTEMPTS must be greater than zero when set".to_string(),
            ));
        }

        Ok(())
    }

    /// The provider credential, or a configuration error if none was provided.
    pub fn require_api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "API key is not set. Set GEMINI_API_KEY (or API_KEY) or select a key.".to_string(),
            )
        })
    }
}
