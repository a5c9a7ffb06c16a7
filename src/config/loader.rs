use std::collections::HashMap;
use std::path::PathBuf;

use super::ConfigError;

/// Package that ships the default policy document.
pub const POLICY_PACKAGE: &str = "ap_verify";

/// File name of the default policy document inside `<package>/config`.
pub const POLICY_FILE_NAME: &str = "dataset_config.yaml";

/// Where package locations are looked up.
///
/// Installed packages advertise their root as `<PACKAGE>_DIR`.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

fn package_var(package: &str) -> String {
    format!("{}_DIR", package.to_uppercase().replace('-', "_"))
}

/// Resolve the root directory of an installed package.
pub fn package_dir(package: &str) -> Result<PathBuf, ConfigError> {
    package_dir_with(package, &ProcessEnv)
}

pub fn package_dir_with(package: &str, env: &dyn EnvSource) -> Result<PathBuf, ConfigError> {
    let var = package_var(package);
    match env.var(&var) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(ConfigError::PackageNotFound {
            package: package.to_string(),
            var,
        }),
    }
}

/// Location of the policy document shipped with this package.
pub fn default_policy_path() -> Result<PathBuf, ConfigError> {
    default_policy_path_with(&ProcessEnv)
}

pub fn default_policy_path_with(env: &dyn EnvSource) -> Result<PathBuf, ConfigError> {
    Ok(package_dir_with(POLICY_PACKAGE, env)?
        .join("config")
        .join(POLICY_FILE_NAME))
}
