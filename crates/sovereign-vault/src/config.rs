//! Vault configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! key_length = 32
//!
//! [normalization]
//! case_folding = "lowercase"
//! unicode_form = "nfkc"
//! max_keyword_bytes = 256
//!
//! [index]
//! shard_count = 16
//! persist_timeout_ms = 2000
//! ```

use std::{path::Path, time::Duration};

use serde::Deserialize;
use sovereign_crypto::{NormalizationPolicy, SECRET_KEY_LENGTH, TokenDeriver};
use thiserror::Error;

/// Smallest accepted secret key length in bytes.
pub const MIN_KEY_LENGTH: usize = 16;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for [`crate::EncryptedIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Number of independently locked shards
    pub shard_count: usize,
    /// Upper bound on one durable write, in milliseconds
    pub persist_timeout_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { shard_count: 16, persist_timeout_ms: 2_000 }
    }
}

impl IndexConfig {
    /// Durable write bound as a [`Duration`].
    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    /// Reject a shard count or write bound of zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::Invalid("index.shard_count must be at least 1".to_string()));
        }
        if self.persist_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "index.persist_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for [`crate::VaultEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Required secret key length in bytes
    pub key_length: usize,
    /// Keyword normalization rules
    pub normalization: NormalizationPolicy,
    /// Index sharding and persistence bounds
    pub index: IndexConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_length: SECRET_KEY_LENGTH,
            normalization: NormalizationPolicy::default(),
            index: IndexConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_length < MIN_KEY_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "key_length must be at least {MIN_KEY_LENGTH}, got {}",
                self.key_length
            )));
        }
        self.index.validate()?;
        if self.normalization.max_keyword_bytes == 0 {
            return Err(ConfigError::Invalid(
                "normalization.max_keyword_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Token deriver matching this configuration.
    pub fn token_deriver(&self) -> TokenDeriver {
        TokenDeriver::new(self.key_length, self.normalization)
    }
}
