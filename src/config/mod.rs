//! Policy document for verification runs.
//!
//! The policy lists the datasets this tool knows about and the measurements
//! to extract from a run. It is loaded once, validated, and then handed to
//! consumers by reference as a [`PolicyConfig`].
//!
//! # Example
//!
//! ```
//! use ap_verify::config::PolicyConfig;
//!
//! let policy: PolicyConfig = r#"
//! datasets:
//!   HiTS2015: ap_verify_hits2015
//! measurements:
//!   timing:
//!     ap_pipe.ApPipeTime: apPipe
//! "#
//! .parse()
//! .unwrap();
//!
//! assert!(policy.datasets().contains_key("HiTS2015"));
//! ```

pub mod loader;
pub mod validator;


pub use loader::{
    default_policy_path, default_policy_path_with, package_dir, package_dir_with, EnvSource,
    MapEnv, ProcessEnv, POLICY_FILE_NAME, POLICY_PACKAGE,
};
pub use validator::ShapeError;

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document does not have the required shape.
    #[error("Invalid config file.")]
    Invalid {
        #[source]
        source: ShapeError,
    },

    #[error("Could not read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Cannot locate package {package}: environment variable {var} is not set")]
    PackageNotFound { package: String, var: String },
}

/// A validated policy document.
///
/// Holds the whole document, not just the validated sections; other keys
/// remain reachable through [`PolicyConfig::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    document: Mapping,
    datasets: Mapping,
    timing: Mapping,
}

impl PolicyConfig {
    /// Load the policy shipped with the package.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_path(default_policy_path()?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!("Loading policy from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Mapping(mapping) => Self::from_mapping(mapping),
            _ => Err(ConfigError::Invalid {
                source: ShapeError::NotMapping("<document>".to_string()),
            }),
        }
    }

    pub fn from_mapping(document: Mapping) -> Result<Self, ConfigError> {
        let sections =
            validator::validate(&document).map_err(|source| ConfigError::Invalid { source })?;
        Ok(Self {
            datasets: sections.datasets.clone(),
            timing: sections.timing.clone(),
            document,
        })
    }

    /// Read access to a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Dataset name to the package that provides it.
    pub fn datasets(&self) -> &Mapping {
        &self.datasets
    }

    /// Metric name to the metadata prefix of the task it times.
    pub fn timing(&self) -> &Mapping {
        &self.timing
    }
}

impl FromStr for PolicyConfig {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: "<string>".to_string(),
            source,
        })?;
        Self::from_value(value)
    }
}
