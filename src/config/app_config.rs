use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::model::ModelDescriptor;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
    /// Entity types known to the administrative surface
    pub models: Vec<ModelDescriptor>,
}

/// Global caching switches and defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Default entry lifetime in seconds
    pub ttl: u64,
    pub prefix: String,
    /// Adds `:connection:database` to every key and tag
    pub use_database_keying: bool,
    /// Default store: a name from `stores` or a driver name
    pub store: String,
    pub redis_url: Option<String>,
    pub max_capacity: u64,
    pub stores: BTreeMap<String, StoreSettings>,
}

/// A named cache store
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    /// `in_memory`, `redis` or `null`
    pub driver: String,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: 3600,
            prefix: "model-cache".to_string(),
            use_database_keying: true,
            store: "in_memory".to_string(),
            redis_url: None,
            max_capacity: 10_000,
            stores: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Loads the layered configuration, with an optional extra file on top of
    /// the defaults and below the environment
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("MODEL_CACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
