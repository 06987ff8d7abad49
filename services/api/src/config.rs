//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub card_model: String,
    /// Default cap on how many cards a review session presents per day.
    pub daily_review_limit: usize,
    /// How long a user's card list may be served from the read cache.
    pub card_cache_ttl_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let card_model =
            std::env::var("CARD_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let daily_review_limit = match std::env::var("DAILY_REVIEW_LIMIT") {
            Ok(raw) => raw.parse::<usize>().ok().filter(|n| *n >= 1).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DAILY_REVIEW_LIMIT".to_string(),
                    format!("'{}' is not a positive integer", raw),
                )
            })?,
            Err(_) => 20,
        };

        let card_cache_ttl_secs = match std::env::var("CARD_CACHE_TTL_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "CARD_CACHE_TTL_SECS".to_string(),
                    format!("'{}' is not a valid number of seconds", raw),
                )
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            card_model,
            daily_review_limit,
            card_cache_ttl_secs,
        })
    }
}
