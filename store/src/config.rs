//! Environment-driven configuration for the seeding binary.

use std::env;
use thiserror::Error;

const DEFAULT_LOCAL_URL: &str = "sqlite:brewsync-local.db?mode=rwc";
const DEFAULT_GLOBAL_URL: &str = "sqlite:brewsync-global.db?mode=rwc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} value {value:?}: expected a u64 seed")]
    InvalidSeed { var: &'static str, value: String },
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection URL of the local store.
    pub local_database_url: String,
    /// Connection URL of the global store.
    pub global_database_url: String,
    /// When set, the seeding copy shuffles rows within each kind using
    /// this seed instead of copying in identifier order.
    pub seed_shuffle: Option<u64>,
    /// When set, catalog assignments (which user gets which order,
    /// address, payment instrument) are drawn from this seed, making a
    /// seeded deployment reproducible. Defaults to the wall clock.
    pub seed_rng: Option<u64>,
}

impl Config {
    /// Read configuration from the environment, falling back to local
    /// on-disk SQLite files.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            local_database_url: env::var("LOCAL_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_LOCAL_URL.to_string()),
            global_database_url: env::var("GLOBAL_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_GLOBAL_URL.to_string()),
            seed_shuffle: optional_seed("SEED_SHUFFLE")?,
            seed_rng: optional_seed("SEED_RNG")?,
        })
    }
}

fn optional_seed(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => parse_seed(var, &value).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_seed(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidSeed {
        var,
        value: value.to_string(),
    })
}
