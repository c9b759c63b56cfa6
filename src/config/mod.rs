//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/trail-climate/config.toml

pub mod defaults;

use crate::constants::{api, cache, fallback};
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Fallback location settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Upstream service endpoints
    #[serde(default)]
    pub services: ServicesConfig,

    /// Observation fetch tuning
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cache lifetimes and bounds
    #[serde(default)]
    pub cache: CacheConfig,

    /// API keys for various services
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Location used whenever a trail has no usable geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    /// Region code used when reverse geocoding fails
    #[serde(default = "default_region")]
    pub region: String,

    /// Postal code used when IP geolocation fails
    #[serde(default = "default_postal_code")]
    pub postal_code: String,
}

/// Upstream service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_region_url")]
    pub region_url: String,

    #[serde(default = "default_observations_url")]
    pub observations_url: String,

    #[serde(default = "default_ip_location_url")]
    pub ip_location_url: String,
}

/// Observation fetch tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Hard deadline for the observations call
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for region and IP lookups
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,

    #[serde(default = "default_lag_days")]
    pub lag_days: u32,

    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default = "default_result_limit")]
    pub result_limit: u32,

    #[serde(default = "default_dataset")]
    pub dataset: String,
}

/// Cache lifetimes and bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_region_ttl")]
    pub region_ttl_secs: u64,

    #[serde(default = "default_observation_ttl")]
    pub observation_ttl_secs: u64,

    #[serde(default = "default_zip_ttl")]
    pub zip_ttl_secs: u64,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiKeysConfig {
    /// NOAA Climate Data Online token
    #[serde(default)]
    pub noaa: String,

    /// IP geolocation API key
    #[serde(default)]
    pub ip_geolocation: String,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_latitude() -> f64 {
    fallback::LATITUDE
}
fn default_longitude() -> f64 {
    fallback::LONGITUDE
}
fn default_region() -> String {
    fallback::REGION_CODE.to_string()
}
fn default_postal_code() -> String {
    fallback::POSTAL_CODE.to_string()
}
fn default_region_url() -> String {
    api::REGION_URL.to_string()
}
fn default_observations_url() -> String {
    api::OBSERVATIONS_URL.to_string()
}
fn default_ip_location_url() -> String {
    api::IP_LOCATION_URL.to_string()
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_lookup_timeout_ms() -> u64 {
    DEFAULT_LOOKUP_TIMEOUT_MS
}
fn default_lag_days() -> u32 {
    DEFAULT_LAG_DAYS
}
fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
fn default_result_limit() -> u32 {
    DEFAULT_RESULT_LIMIT
}
fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}
fn default_region_ttl() -> u64 {
    cache::REGION_TTL_SECS
}
fn default_observation_ttl() -> u64 {
    cache::OBSERVATION_TTL_SECS
}
fn default_zip_ttl() -> u64 {
    cache::ZIP_TTL_SECS
}
fn default_max_entries() -> usize {
    cache::MAX_ENTRIES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            region: default_region(),
            postal_code: default_postal_code(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            region_url: default_region_url(),
            observations_url: default_observations_url(),
            ip_location_url: default_ip_location_url(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
            lag_days: default_lag_days(),
            window_days: default_window_days(),
            result_limit: default_result_limit(),
            dataset: default_dataset(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            region_ttl_secs: default_region_ttl(),
            observation_ttl_secs: default_observation_ttl(),
            zip_ttl_secs: default_zip_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

impl LocationConfig {
    /// The configured fallback point
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl CacheConfig {
    pub fn region_ttl(&self) -> Duration {
        Duration::from_secs(self.region_ttl_secs)
    }

    pub fn observation_ttl(&self) -> Duration {
        Duration::from_secs(self.observation_ttl_secs)
    }

    pub fn zip_ttl(&self) -> Duration {
        Duration::from_secs(self.zip_ttl_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["location", "latitude"] => Some(self.location.latitude.to_string()),
            ["location", "longitude"] => Some(self.location.longitude.to_string()),
            ["location", "region"] => Some(self.location.region.clone()),
            ["location", "postal_code"] => Some(self.location.postal_code.clone()),

            ["services", "region_url"] => Some(self.services.region_url.clone()),
            ["services", "observations_url"] => Some(self.services.observations_url.clone()),
            ["services", "ip_location_url"] => Some(self.services.ip_location_url.clone()),

            ["fetch", "timeout_ms"] => Some(self.fetch.timeout_ms.to_string()),
            ["fetch", "lookup_timeout_ms"] => Some(self.fetch.lookup_timeout_ms.to_string()),
            ["fetch", "lag_days"] => Some(self.fetch.lag_days.to_string()),
            ["fetch", "window_days"] => Some(self.fetch.window_days.to_string()),
            ["fetch", "result_limit"] => Some(self.fetch.result_limit.to_string()),
            ["fetch", "dataset"] => Some(self.fetch.dataset.clone()),

            ["cache", "region_ttl_secs"] => Some(self.cache.region_ttl_secs.to_string()),
            ["cache", "observation_ttl_secs"] => Some(self.cache.observation_ttl_secs.to_string()),
            ["cache", "zip_ttl_secs"] => Some(self.cache.zip_ttl_secs.to_string()),
            ["cache", "max_entries"] => Some(self.cache.max_entries.to_string()),

            ["api_keys", "noaa"] => Some(self.api_keys.noaa.clone()),
            ["api_keys", "ip_geolocation"] => Some(self.api_keys.ip_geolocation.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(key, value)?,

            ["location", "latitude"] => self.location.latitude = parse_value(key, value)?,
            ["location", "longitude"] => self.location.longitude = parse_value(key, value)?,
            ["location", "region"] => self.location.region = value.to_string(),
            ["location", "postal_code"] => self.location.postal_code = value.to_string(),

            ["services", "region_url"] => self.services.region_url = value.to_string(),
            ["services", "observations_url"] => self.services.observations_url = value.to_string(),
            ["services", "ip_location_url"] => self.services.ip_location_url = value.to_string(),

            ["fetch", "timeout_ms"] => self.fetch.timeout_ms = parse_value(key, value)?,
            ["fetch", "lookup_timeout_ms"] => self.fetch.lookup_timeout_ms = parse_value(key, value)?,
            ["fetch", "lag_days"] => self.fetch.lag_days = parse_value(key, value)?,
            ["fetch", "window_days"] => {
                let days: u32 = parse_value(key, value)?;
                if days == 0 {
                    return Err(Error::Config("window_days must be at least 1".to_string()));
                }
                self.fetch.window_days = days;
            }
            ["fetch", "result_limit"] => self.fetch.result_limit = parse_value(key, value)?,
            ["fetch", "dataset"] => self.fetch.dataset = value.to_string(),

            ["cache", "region_ttl_secs"] => self.cache.region_ttl_secs = parse_value(key, value)?,
            ["cache", "observation_ttl_secs"] => {
                self.cache.observation_ttl_secs = parse_value(key, value)?
            }
            ["cache", "zip_ttl_secs"] => self.cache.zip_ttl_secs = parse_value(key, value)?,
            ["cache", "max_entries"] => self.cache.max_entries = parse_value(key, value)?,

            ["api_keys", "noaa"] => self.api_keys.noaa = value.to_string(),
            ["api_keys", "ip_geolocation"] => self.api_keys.ip_geolocation = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "location.latitude",
            "location.longitude",
            "location.region",
            "location.postal_code",
            "services.region_url",
            "services.observations_url",
            "services.ip_location_url",
            "fetch.timeout_ms",
            "fetch.lookup_timeout_ms",
            "fetch.lag_days",
            "fetch.window_days",
            "fetch.result_limit",
            "fetch.dataset",
            "cache.region_ttl_secs",
            "cache.observation_ttl_secs",
            "cache.zip_ttl_secs",
            "cache.max_entries",
            "api_keys.noaa",
            "api_keys.ip_geolocation",
        ]
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}
