//! Runtime configuration.
//!
//! Values come from the process environment (after `.env` loading) but are
//! parsed from a plain map so every rule can be exercised without touching
//! the real environment. Anything present but malformed fails immediately.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use gachadiff_domain::GenerationDefaults;
use url::Url;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a {expected}, got '{value}'")]
    InvalidNumber {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{key} is not a valid URL ('{value}'): {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Admission queue and worker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Work channel capacity
    pub depth: usize,
    /// Pause between jobs
    pub cooldown: Duration,
    /// Guilds that may have jobs in flight at the same time
    pub max_guilds: usize,
    /// Members per guild that may have a job in flight
    pub max_guild_reqs: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            depth: 10,
            cooldown: Duration::ZERO,
            max_guilds: 5,
            max_guild_reqs: 5,
        }
    }
}

/// Where and how to reach the image backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub base_url: Url,
    pub generate_path: String,
    pub health_path: String,
    pub request_timeout: Duration,
}

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:7860";
const DEFAULT_GENERATE_PATH: &str = "/sdapi/v1/txt2img";
const DEFAULT_HEALTH_PATH: &str = "/internal/ping";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Full application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub queue: QueueSettings,
    pub backend: BackendSettings,
    pub generation: GenerationDefaults,
    pub database_path: String,
    pub server_host: String,
    pub server_port: u16,
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_map(&vars)
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let queue = QueueSettings::from_map(vars)?;

        let backend = BackendSettings {
            base_url: parse_url(
                "SD_BACKEND_URL",
                get("SD_BACKEND_URL").unwrap_or(DEFAULT_BACKEND_URL),
            )?,
            generate_path: normalize_path(get("SD_GENERATE_PATH").unwrap_or(DEFAULT_GENERATE_PATH)),
            health_path: normalize_path(get("SD_HEALTH_PATH").unwrap_or(DEFAULT_HEALTH_PATH)),
            request_timeout: match get("SD_REQUEST_TIMEOUT_SECS") {
                Some(raw) => parse_seconds("SD_REQUEST_TIMEOUT_SECS", raw)?,
                None => DEFAULT_REQUEST_TIMEOUT,
            },
        };
        if backend.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SD_REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let generation_defaults = GenerationDefaults::default();
        let generation = GenerationDefaults {
            negative_prompt: get("SD_NEGATIVE_PROMPT")
                .map(str::to_string)
                .unwrap_or(generation_defaults.negative_prompt),
            steps: parse_or(
                "SD_STEPS",
                get("SD_STEPS"),
                generation_defaults.steps,
                "positive integer",
            )?,
            cfg_scale: parse_or(
                "SD_CFG_SCALE",
                get("SD_CFG_SCALE"),
                generation_defaults.cfg_scale,
                "number",
            )?,
            width: parse_or(
                "SD_WIDTH",
                get("SD_WIDTH"),
                generation_defaults.width,
                "positive integer",
            )?,
            height: parse_or(
                "SD_HEIGHT",
                get("SD_HEIGHT"),
                generation_defaults.height,
                "positive integer",
            )?,
            sampler_name: get("SD_SAMPLER")
                .map(str::to_string)
                .unwrap_or(generation_defaults.sampler_name),
        };

        Ok(Self {
            queue,
            backend,
            generation,
            database_path: get("DATABASE_PATH").unwrap_or("gachadiff.db").to_string(),
            server_host: get("SERVER_HOST").unwrap_or("0.0.0.0").to_string(),
            server_port: parse_or(
                "SERVER_PORT",
                get("SERVER_PORT").or(get("PORT")),
                3000,
                "port number",
            )?,
            admin_token: get("ADMIN_TOKEN").map(str::to_string),
        })
    }
}

impl QueueSettings {
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            depth: parse_or(
                "SD_QUEUE_DEPTH",
                get("SD_QUEUE_DEPTH"),
                defaults.depth,
                "non-negative integer",
            )?,
            cooldown: match get("SD_COOLDOWN_SECS") {
                Some(raw) => parse_seconds("SD_COOLDOWN_SECS", raw)?,
                None => defaults.cooldown,
            },
            max_guilds: parse_or(
                "SD_MAX_GUILDS",
                get("SD_MAX_GUILDS"),
                defaults.max_guilds,
                "non-negative integer",
            )?,
            max_guild_reqs: parse_or(
                "SD_MAX_GUILD_REQS",
                get("SD_MAX_GUILD_REQS"),
                defaults.max_guild_reqs,
                "non-negative integer",
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: Option<&str>,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidNumber {
            key,
            expected,
            value: value.to_string(),
        }),
    }
}

/// Accepts fractional seconds ("1.5"); rejects negative and non-finite values.
fn parse_seconds(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidNumber {
        key,
        expected: "non-negative number of seconds",
        value: raw.to_string(),
    };
    let secs: f64 = raw.parse().map_err(|_| invalid())?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            key,
            value: raw.to_string(),
            reason: "scheme must be http or https".to_string(),
        });
    }
    Ok(url)
}

fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}
