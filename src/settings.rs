//! Layered configuration
//!
//! Built-in defaults, then an optional TOML file, then environment variables
//! prefixed with `SLABKIT_`. Nested keys use a double underscore:
//!
//! ```bash
//! SLABKIT_POOL__NEXT_BLOCK_ITEMS=4096
//! SLABKIT_HASH_SET__INITIAL_BINS=256
//! ```

use crate::error::{Error, Result};
use crate::hash_set::HashSetConfig;
use crate::slab::PoolConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const ENV_PREFIX: &str = "SLABKIT";

/// Effective settings for pools and hash sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pool: PoolConfig,
    pub hash_set: HashSetConfig,
}

impl Settings {
    /// Load settings, reading `path` as TOML when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading settings file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize::<Settings>)
            .map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a TOML string, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.pool.validate()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
