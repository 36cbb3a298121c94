use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
    pub features: FeatureFlags,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Настройки Redis; без REDIS_URL кеш выключен
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub availability_ttl_seconds: u64,
}

// Настройки движка бронирования
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Retries after a storage conflict before the request is reported as unavailable.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub max_seats_per_booking: usize,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 10,
            max_seats_per_booking: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleData {
    /// Seed only when the movie catalog is empty.
    Auto,
    Always,
    Off,
}

// Feature flags для включения/выключения функциональности
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub sample_data: SampleData,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },
    #[error("{key} has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn choice<T: Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
    options: &[(&str, T)],
) -> Result<T, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    options
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value.trim()))
        .map(|(_, option)| *option)
        .ok_or(ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source; `from_env` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage = choice(
            &lookup,
            "STORAGE",
            StorageBackend::Postgres,
            &[("postgres", StorageBackend::Postgres), ("memory", StorageBackend::Memory)],
        )?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing { key: "DATABASE_URL" });
        }

        Ok(Config {
            app: AppConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8000)?,
                environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: lookup("RUST_LOG")
                    .unwrap_or_else(|| "cinema_booking=debug,tower_http=debug".to_string()),
                log_format: choice(
                    &lookup,
                    "LOG_FORMAT",
                    LogFormat::Text,
                    &[("text", LogFormat::Text), ("json", LogFormat::Json)],
                )?,
            },
            storage,
            database: DatabaseConfig {
                url: database_url,
                pool_size: parse_or(&lookup, "DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: lookup("REDIS_URL").filter(|v| !v.is_empty()),
                availability_ttl_seconds: parse_or(&lookup, "AVAILABILITY_CACHE_TTL_SECONDS", 60)?,
            },
            booking: BookingConfig {
                max_retries: parse_or(&lookup, "BOOKING_MAX_RETRIES", 3)?,
                retry_backoff_ms: parse_or(&lookup, "BOOKING_RETRY_BACKOFF_MS", 10)?,
                max_seats_per_booking: parse_or(&lookup, "MAX_SEATS_PER_BOOKING", 10)?,
            },
            features: FeatureFlags {
                sample_data: choice(
                    &lookup,
                    "LOAD_SAMPLE_DATA",
                    SampleData::Auto,
                    &[
                        ("auto", SampleData::Auto),
                        ("true", SampleData::Always),
                        ("false", SampleData::Off),
                        ("off", SampleData::Off),
                    ],
                )?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn memory_storage_needs_no_database() {
        let config = config_from(&[("STORAGE", "memory")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.booking.max_retries, 3);
        assert_eq!(config.booking.max_seats_per_booking, 10);
        assert_eq!(config.features.sample_data, SampleData::Auto);
        assert!(config.redis.url.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing { key: "DATABASE_URL" }
        );
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/cinema")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
    }

    #[test]
    fn rejects_bad_numbers_and_choices() {
        assert_eq!(
            config_from(&[("STORAGE", "memory"), ("PORT", "eighty")]).unwrap_err(),
            ConfigError::Invalid { key: "PORT", value: "eighty".to_string() }
        );
        assert!(matches!(
            config_from(&[("STORAGE", "sqlite")]),
            Err(ConfigError::Invalid { key: "STORAGE", .. })
        ));
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("STORAGE", "memory"),
            ("LOG_FORMAT", "JSON"),
            ("BOOKING_MAX_RETRIES", "5"),
            ("LOAD_SAMPLE_DATA", "off"),
            ("REDIS_URL", "redis://127.0.0.1/"),
        ])
        .unwrap();
        assert_eq!(config.app.log_format, LogFormat::Json);
        assert_eq!(config.booking.max_retries, 5);
        assert_eq!(config.features.sample_data, SampleData::Off);
        assert_eq!(config.redis.url.as_deref(), Some("redis://127.0.0.1/"));
    }
}
