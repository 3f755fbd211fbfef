//! Persistence-unit configuration loaded from TOML.
//!
//! ```toml
//! [[unit]]
//! name = "blog"
//! backend = "column"
//! nodes = ["10.0.0.1"]
//! port = 9160
//! keyspace = "Blog"
//! ```

use crate::core::{
    db::{ClientIdentity, PersistenceUnit},
    error::{Error, ErrorClass, ErrorOrigin},
    model::BackendKind,
};
use serde::Deserialize;
use std::{collections::BTreeSet, fs, io, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no persistence units configured")]
    Empty,

    #[error("persistence unit '{0}' declared more than once")]
    DuplicateUnit(String),

    #[error("persistence unit '{unit}': {reason}")]
    InvalidUnit { unit: String, reason: String },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();

        match err {
            ConfigError::Read { source, .. } => {
                Self::new(ErrorClass::Validation, ErrorOrigin::Config, message).with_cause(source)
            }
            ConfigError::Parse(source) => {
                Self::new(ErrorClass::Validation, ErrorOrigin::Config, message).with_cause(source)
            }
            _ => Self::new(ErrorClass::Validation, ErrorOrigin::Config, message),
        }
    }
}

///
/// PersistenceConfig
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceConfig {
    #[serde(rename = "unit", default)]
    pub units: Vec<PersistenceUnitConfig>,
}

///
/// PersistenceUnitConfig
///

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistenceUnitConfig {
    pub name: String,
    pub backend: BackendKind,
    pub nodes: Vec<String>,
    pub port: u16,
    pub keyspace: String,
}

impl PersistenceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut names = BTreeSet::new();
        for unit in &self.units {
            unit.validate()?;
            if !names.insert(unit.name.as_str()) {
                return Err(ConfigError::DuplicateUnit(unit.name.clone()));
            }
        }

        Ok(())
    }

    /// Convert every configured unit into a core persistence unit.
    #[must_use]
    pub fn into_units(self) -> Vec<PersistenceUnit> {
        self.units
            .into_iter()
            .map(PersistenceUnitConfig::into_unit)
            .collect()
    }
}

impl PersistenceUnitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUnit {
            unit: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.nodes.is_empty() {
            return Err(invalid("at least one node is required"));
        }
        if self.nodes.iter().any(|node| node.trim().is_empty()) {
            return Err(invalid("node addresses must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.keyspace.trim().is_empty() {
            return Err(invalid("keyspace must not be empty"));
        }

        Ok(())
    }

    #[must_use]
    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(
            self.nodes.iter().cloned(),
            self.port,
            self.keyspace.clone(),
            self.backend,
            self.name.clone(),
        )
    }

    #[must_use]
    pub fn into_unit(self) -> PersistenceUnit {
        PersistenceUnit::new(self.identity())
    }
}
