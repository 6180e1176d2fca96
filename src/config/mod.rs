use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// Top-level configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

/// Tunables of the reservation core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingConfig {
    /// How long a PENDING booking keeps its seats before the sweeper reclaims them.
    pub hold_duration_secs: u64,
    pub sweep_interval_secs: u64,
    pub max_seats_per_booking: usize,
    /// Upper bound on waiting for a seat or booking row lock.
    pub lock_timeout_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            hold_duration_secs: 120,
            sweep_interval_secs: 30,
            max_seats_per_booking: 10,
            lock_timeout_ms: 5_000,
        }
    }
}

impl BookingConfig {
    pub fn hold_duration(&self) -> chrono::Duration {
        i64::try_from(self.hold_duration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BookingConfig::default();

        Ok(Config {
            app: AppConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 4000)?,
                environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: lookup("RUST_LOG")
                    .unwrap_or_else(|| "seat_reservation=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                pool_size: parse_or(&lookup, "DB_POOL_SIZE", 20)?,
                acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            },
            booking: BookingConfig {
                hold_duration_secs: parse_or(&lookup, "BOOKING_HOLD_SECS", defaults.hold_duration_secs)?,
                sweep_interval_secs: parse_or(
                    &lookup,
                    "EXPIRY_SWEEP_INTERVAL_SECS",
                    defaults.sweep_interval_secs,
                )?,
                max_seats_per_booking: parse_or(
                    &lookup,
                    "MAX_SEATS_PER_BOOKING",
                    defaults.max_seats_per_booking,
                )?,
                lock_timeout_ms: parse_or(&lookup, "SEAT_LOCK_TIMEOUT_MS", defaults.lock_timeout_ms)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
