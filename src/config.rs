use crate::application::RelayRule;
use crate::domain::entities::Instance;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "FEEDRELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid duration {0:?}")]
    Duration(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub rsshub: Vec<InstanceConfig>,
    #[serde(default)]
    pub translate: Option<TranslateConfig>,
    #[serde(default)]
    pub image_proxy: Option<ImageProxyConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub listen: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    pub redis: RedisConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            listen: "0.0.0.0:1200".to_string(),
            request_timeout: Duration::from_secs(10),
            redis: RedisConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedisConfig {
    /// Absent or empty: translations are cached in process memory.
    pub url: Option<String>,
    pub prefix: String,
    /// Zero stores translations without expiry.
    #[serde(deserialize_with = "deserialize_duration")]
    pub cache_expire: Duration,
    /// Bound on connecting and on each command.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            prefix: String::new(),
            cache_expire: Duration::from_secs(24 * 60 * 60),
            timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InstanceConfig {
    pub url: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranslateConfig {
    pub provider: String,
    #[serde(default)]
    pub default_lang: String,
    #[serde(default)]
    pub host_base: String,
    /// Provider-specific YAML, parsed by the provider itself.
    #[serde(default)]
    pub settings: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageProxyConfig {
    pub path: String,
    #[serde(default)]
    pub rules: HashMap<String, RelayRule>,
}

impl Config {
    /// Backend instances in configuration order.
    pub fn instances(&self) -> Vec<Instance> {
        self.rsshub
            .iter()
            .map(|i| Instance::new(i.url.clone(), i.platforms.clone(), i.fallback))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rsshub.is_empty() {
            return Err(ConfigError::Invalid("no rsshub instances configured".to_string()));
        }

        for instance in &self.rsshub {
            let parsed = url::Url::parse(&instance.url).map_err(|e| {
                ConfigError::Invalid(format!("instance url {:?}: {}", instance.url, e))
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "instance url {:?}: scheme must be http or https",
                    instance.url
                )));
            }
        }

        if !self.rsshub.iter().any(|i| i.fallback) {
            tracing::warn!("no fallback instance configured; platforms without affinity will fail");
        }

        if self.system.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("system.request_timeout must be positive".to_string()));
        }

        if self.system.redis.timeout.is_zero() {
            return Err(ConfigError::Invalid("system.redis.timeout must be positive".to_string()));
        }

        if let Some(proxy) = &self.image_proxy {
            if !proxy.path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "image_proxy.path {:?} must start with '/'",
                    proxy.path
                )));
            }
        }

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse a duration such as `300ms`, `10s`, `1h30m` or `1.5h`.
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`. A bare integer is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let s = input.trim();
    let invalid = || ConfigError::Duration(input.to_string());

    if s.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_nanos += value * scale;
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Parse and validate configuration from YAML text.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(yaml)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration from a file.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&text)
}

/// Load configuration from the file named by `FEEDRELAY_CONFIG`
/// (default `config.yml`). A set `DEBUG` variable forces debug logging.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut cfg = load_config_from(&path)?;
    if std::env::var("DEBUG").is_ok() {
        cfg.system.debug = true;
    }
    Ok(cfg)
}
