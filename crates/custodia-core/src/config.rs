//! Configuration parsing and validation.
//!
//! This module handles parsing of the engine configuration file (TOML)
//! that defines storage paths, verification settings, and the operator
//! directory. Validation is fail-closed: a config that parses but carries
//! an unusable value is rejected at load time, not at first use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::StaticDirectory;
use crate::vault::MAX_CONTENT_SIZE;
use crate::verify::DEFAULT_CHUNK_SIZE;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the ledger database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory for the filesystem content vault.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: PathBuf,

    /// Chunk size in bytes for streamed verification.
    #[serde(default = "default_verify_chunk_size")]
    pub verify_chunk_size: usize,

    /// Maximum size in bytes for a single evidence payload.
    #[serde(default = "default_max_content_size")]
    pub max_content_size: u64,

    /// Roles permitted to run administrative operations (entry deletion,
    /// disposal marking).
    #[serde(default = "default_elevated_roles")]
    pub elevated_roles: Vec<String>,

    /// Maximum number of rows returned by listing operations.
    #[serde(default = "default_list_limit")]
    pub list_limit: u64,

    /// Operator directory configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            vault_dir: default_vault_dir(),
            verify_chunk_size: default_verify_chunk_size(),
            max_content_size: default_max_content_size(),
            elevated_roles: default_elevated_roles(),
            list_limit: default_list_limit(),
            identity: IdentityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validates field values beyond what parsing enforces.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for any value the engine could not run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verify_chunk_size == 0 {
            return Err(ConfigError::Validation(
                "verify_chunk_size must be positive".to_string(),
            ));
        }
        if self.max_content_size == 0 {
            return Err(ConfigError::Validation(
                "max_content_size must be positive".to_string(),
            ));
        }
        if self.elevated_roles.is_empty() {
            return Err(ConfigError::Validation(
                "elevated_roles must name at least one role; \
                 administrative operations would otherwise be impossible"
                    .to_string(),
            ));
        }
        if self.list_limit == 0 {
            return Err(ConfigError::Validation(
                "list_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the role may run administrative operations.
    #[must_use]
    pub fn is_elevated(&self, role: &str) -> bool {
        self.elevated_roles.iter().any(|r| r == role)
    }
}

/// Operator directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Explicitly listed operators, id to role.
    #[serde(default)]
    pub actors: HashMap<String, String>,

    /// Role granted to unlisted operator ids. Set to the empty string to
    /// close the directory: unlisted ids then fail to resolve and their
    /// requests are refused.
    #[serde(default = "default_role")]
    pub default_role: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            actors: HashMap::new(),
            default_role: default_role(),
        }
    }
}

impl IdentityConfig {
    /// Builds the static operator directory this config describes.
    #[must_use]
    pub fn build_directory(&self) -> StaticDirectory {
        let mut dir = StaticDirectory::from_table(self.actors.clone());
        match &self.default_role {
            Some(role) if !role.is_empty() => {
                dir = dir.with_default_role(role.clone());
            }
            _ => {}
        }
        dir
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("custodia.db")
}

fn default_vault_dir() -> PathBuf {
    PathBuf::from("vault")
}

const fn default_verify_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_max_content_size() -> u64 {
    MAX_CONTENT_SIZE
}

fn default_elevated_roles() -> Vec<String> {
    vec!["admin".to_string(), "evidence_manager".to_string()]
}

const fn default_list_limit() -> u64 {
    1000
}

fn default_role() -> Option<String> {
    Some("operator".to_string())
}

/// Errors that can occur during configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}
