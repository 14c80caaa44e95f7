use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::error::ConfigError;

/// Monitoring configuration
///
/// Every key is optional in the bootstrap file. A missing url leaves the
/// monitor idle until one is set through [`ConfigStore::set_url`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Status page to sample
    #[serde(default)]
    pub url: String,

    /// Seconds to wait before each sample
    #[serde(rename = "check_interval", default = "default_interval")]
    pub interval: u64,

    /// Alert when the reading drops to or below this value
    #[serde(default)]
    pub threshold: f64,

    /// Upper bound for a single request, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_interval() -> u64 {
    10
}

fn default_timeout() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            interval: default_interval(),
            threshold: 0.0,
            timeout: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if there is none
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
            .map(Config::validated)
            .inspect(|config| trace!("loaded config: {config:?}"))
    }

    /// Apply the setter rules, replacing each invalid field with its default
    pub fn validated(self) -> Self {
        let defaults = Self::default();

        let url = if self.url.trim().is_empty() {
            defaults.url
        } else {
            validate_url(&self.url).unwrap_or_else(|e| {
                warn!("{e}, leaving url unset");
                defaults.url
            })
        };

        let interval = check_positive("interval", self.interval).unwrap_or_else(|e| {
            warn!("{e}, using {}s", defaults.interval);
            defaults.interval
        });

        let threshold = check_finite(self.threshold).unwrap_or_else(|e| {
            warn!("{e}, using {}", defaults.threshold);
            defaults.threshold
        });

        let timeout = check_positive("timeout", self.timeout).unwrap_or_else(|e| {
            warn!("{e}, using {}s", defaults.timeout);
            defaults.timeout
        });

        Self {
            url,
            interval,
            threshold,
            timeout,
        }
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Shared configuration, edited by the foreground while the worker reads it
///
/// Reads and writes go through one lock, so a snapshot never observes a
/// half-written field. Each setter validates first and only then takes the
/// lock, leaving the old value in place on error.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: Mutex<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Mutex::new(config.validated()),
        }
    }

    /// Consistent copy of the current configuration
    pub fn get(&self) -> Config {
        self.inner.lock().clone()
    }

    pub fn set_url(&self, input: &str) -> Result<(), ConfigError> {
        let url = validate_url(input)?;
        debug!("url set to {url}");
        self.inner.lock().url = url;
        Ok(())
    }

    pub fn set_interval(&self, input: &str) -> Result<(), ConfigError> {
        let interval = parse_positive("interval", input)?;
        self.inner.lock().interval = interval;
        debug!("interval set to {interval}s");
        Ok(())
    }

    pub fn set_threshold(&self, input: &str) -> Result<(), ConfigError> {
        let threshold = input
            .trim()
            .parse::<f64>()
            .map_err(|e| ConfigError::invalid("threshold", input, e.to_string()))
            .and_then(check_finite)?;

        self.inner.lock().threshold = threshold;
        debug!("threshold set to {threshold}");
        Ok(())
    }

    pub fn set_timeout(&self, input: &str) -> Result<(), ConfigError> {
        let timeout = parse_positive("timeout", input)?;
        self.inner.lock().timeout = timeout;
        debug!("timeout set to {timeout}s");
        Ok(())
    }
}

fn validate_url(input: &str) -> Result<String, ConfigError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(ConfigError::invalid("url", input, "must not be empty"));
    }

    let parsed =
        reqwest::Url::parse(url).map_err(|e| ConfigError::invalid("url", input, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "url",
            input,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    Ok(url.to_string())
}

fn parse_positive(field: &'static str, input: &str) -> Result<u64, ConfigError> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(field, input, e.to_string()))
        .and_then(|value| check_positive(field, value))
}

fn check_positive(field: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "0", "must be positive"));
    }
    Ok(value)
}

fn check_finite(threshold: f64) -> Result<f64, ConfigError> {
    if !threshold.is_finite() {
        return Err(ConfigError::invalid(
            "threshold",
            &threshold.to_string(),
            "must be a finite number",
        ));
    }
    Ok(threshold)
}
