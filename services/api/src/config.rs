use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use triage_core::breaker::BreakerConfig;
use triage_core::monitor::PowerSettings;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub body_primary_url: String,
    pub body_fallback_url: String,
    pub llm_api_base: String,
    pub llm_api_key: String,
    pub chat_model: String,
    pub history_exchanges: usize,
    pub breaker_threshold: u32,
    pub breaker_retry: Duration,
    pub power_check_interval: Duration,
    pub battery_low_volts: f64,
    pub battery_recover_volts: f64,
    pub log_level: Level,
    pub prompts_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:8889")?;

        let body_primary_url = std::env::var("BODY_PRIMARY_URL")
            .unwrap_or_else(|_| "http://body.local:8888".to_string());
        let body_fallback_url = std::env::var("BODY_FALLBACK_URL")
            .unwrap_or_else(|_| "http://100.64.0.2:8888".to_string());

        let llm_api_base = std::env::var("LLM_API_BASE")
            .unwrap_or_else(|_| "http://127.0.0.1:18789/v1".to_string());
        let llm_api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| ConfigError::MissingVar("LLM_API_KEY".to_string()))?;
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let history_exchanges: usize = parse_var("HISTORY_EXCHANGES", "8")?;
        if history_exchanges == 0 {
            return Err(ConfigError::InvalidValue(
                "HISTORY_EXCHANGES".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let breaker_threshold: u32 = parse_var("BREAKER_THRESHOLD", "5")?;
        if breaker_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "BREAKER_THRESHOLD".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let breaker_retry = Duration::from_secs(parse_var("BREAKER_RETRY_SECS", "30")?);

        let power_check_secs: u64 = parse_var("POWER_CHECK_SECS", "60")?;
        if power_check_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "POWER_CHECK_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let battery_low_volts: f64 = parse_var("BATTERY_LOW_VOLTS", "6.8")?;
        let battery_recover_volts: f64 = parse_var("BATTERY_RECOVER_VOLTS", "7.0")?;
        if battery_recover_volts < battery_low_volts {
            return Err(ConfigError::InvalidValue(
                "BATTERY_RECOVER_VOLTS".to_string(),
                format!("{battery_recover_volts} is below BATTERY_LOW_VOLTS ({battery_low_volts})"),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        Ok(Self {
            bind_address,
            body_primary_url,
            body_fallback_url,
            llm_api_base,
            llm_api_key,
            chat_model,
            history_exchanges,
            breaker_threshold,
            breaker_retry,
            power_check_interval: Duration::from_secs(power_check_secs),
            battery_low_volts,
            battery_recover_volts,
            log_level,
            prompts_path,
        })
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_threshold,
            retry_interval: self.breaker_retry,
        }
    }

    pub fn power(&self) -> PowerSettings {
        PowerSettings {
            interval: self.power_check_interval,
            low_volts: self.battery_low_volts,
            recover_volts: self.battery_recover_volts,
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
