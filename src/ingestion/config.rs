use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{package_dir_with, EnvSource};
use crate::dataset::Dataset;
use crate::{Error, Result};

/// Name of the override file searched for in each config directory.
pub const OVERRIDE_FILE: &str = "datasetIngest.yaml";

/// Settings for ingesting one dataset.
///
/// Everything the ingest programs would normally take on their command line
/// is fixed by the dataset, so it lives here instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetIngestConfig {
    /// Raw science files to ingest (file names, wildcards allowed).
    pub data_files: Vec<String>,
    /// Raw files to skip; wins over `data_files`.
    pub data_bad_files: Vec<String>,
    pub calib_files: Vec<String>,
    pub calib_bad_files: Vec<String>,
    /// Validity period of every calib, in days.
    pub calib_validity: u32,
    /// Top of the text defect tree. Relative paths are taken from the dataset root.
    pub text_defect_path: String,
    /// Refcat name to the tarball holding its shards.
    pub refcats: BTreeMap<String, String>,

    pub data_ingester: String,
    pub calib_ingester: String,
    pub defect_ingester: String,
}

fn default_file_patterns() -> Vec<String> {
    ["*.fits", "*.fz", "*.fits.gz"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for DatasetIngestConfig {
    fn default() -> Self {
        Self {
            data_files: default_file_patterns(),
            data_bad_files: Vec::new(),
            calib_files: default_file_patterns(),
            calib_bad_files: Vec::new(),
            calib_validity: 9999,
            text_defect_path: String::new(),
            refcats: BTreeMap::new(),
            data_ingester: "ingest_images.py".to_string(),
            calib_ingester: "ingest_calibs.py".to_string(),
            defect_ingester: "ingest_defects.py".to_string(),
        }
    }
}

impl DatasetIngestConfig {
    /// Defaults, then the obs package's overrides, then the dataset's own.
    pub fn for_dataset(dataset: &Dataset, env: &dyn EnvSource) -> Result<Self> {
        let obs_dir = package_dir_with(dataset.obs_package(), env)?;

        let mut config = Self::default();
        for dir in [
            obs_dir.join("config"),
            obs_dir.join("config").join(dataset.camera()),
            dataset.config_location(),
        ] {
            let path = dir.join(OVERRIDE_FILE);
            if path.is_file() {
                tracing::debug!("Applying ingest overrides from {}", path.display());
                config.apply_override(&path)?;
            }
        }
        Ok(config)
    }

    /// Replace every key present in the YAML file at `path`.
    pub fn apply_override(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let overrides = match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => return Ok(()),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(Error::Ingestion(format!(
                    "{} must contain a mapping",
                    path.display()
                )))
            }
        };

        let mut merged = match serde_yaml::to_value(&*self)? {
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(Error::Ingestion(format!(
                    "ingest config serialized to {other:?}, expected a mapping"
                )))
            }
        };
        for (key, value) in overrides {
            merged.insert(key, value);
        }
        *self = serde_yaml::from_value(Value::Mapping(merged))?;
        Ok(())
    }

    /// Defect tree location, resolved against `dataset_root` when relative.
    pub fn defect_path(&self, dataset_root: &Path) -> Option<PathBuf> {
        if self.text_defect_path.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.text_defect_path);
        Some(if path.is_absolute() {
            path
        } else {
            dataset_root.join(path)
        })
    }
}
