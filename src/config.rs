use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::services::nearby::NearbyStrategy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub secure_cookies: bool,
    pub nearby_strategy: NearbyStrategy,
}

#[derive(Debug, Error)]
#[error("invalid {key}: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite:data/wayfarer.db")?,
            port: try_load("PORT", "3000")?,
            secure_cookies: try_load("SECURE_COOKIES", "false")?,
            nearby_strategy: try_load("NEARBY_STRATEGY", "query")?,
        })
    }
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError {
            key,
            message: e.to_string(),
        }
    })
}
