//! Datasets known to the policy and their on-disk layout.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{package_dir_with, EnvSource, PolicyConfig, ProcessEnv};
use crate::{Error, Result};

/// Metadata file at the root of every dataset package.
pub const METADATA_FILE: &str = "dataset.yaml";

/// Marker naming the mapper a repository is read with.
pub const MAPPER_FILE: &str = "_mapper";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct DatasetMetadata {
    obs_package: String,
    camera: String,
}

/// A dataset package installed on this machine.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    package: String,
    root: PathBuf,
    metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new(name: &str, config: &PolicyConfig) -> Result<Self> {
        Self::new_with(name, config, &ProcessEnv)
    }

    /// Look `name` up in the policy and locate its package through `env`.
    pub fn new_with(name: &str, config: &PolicyConfig, env: &dyn EnvSource) -> Result<Self> {
        let package = match config.datasets().get(name) {
            Some(value) => value.as_str().map(str::to_string).ok_or_else(|| {
                Error::Dataset(format!("package for dataset {name} is not a string"))
            })?,
            None => {
                return Err(Error::UnsupportedDataset {
                    name: name.to_string(),
                    supported: Self::supported_datasets(config),
                })
            }
        };

        let root = package_dir_with(&package, env)?;
        let metadata = Self::read_metadata(&root)?;
        tracing::debug!(
            "Dataset {} found at {} (camera {})",
            name,
            root.display(),
            metadata.camera
        );

        Ok(Self {
            name: name.to_string(),
            package,
            root,
            metadata,
        })
    }

    /// Names of every dataset the policy declares.
    pub fn supported_datasets(config: &PolicyConfig) -> Vec<String> {
        config
            .datasets()
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect()
    }

    fn read_metadata(root: &Path) -> Result<DatasetMetadata> {
        let path = root.join(METADATA_FILE);
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn dataset_root(&self) -> &Path {
        &self.root
    }

    pub fn raw_location(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn calib_location(&self) -> PathBuf {
        self.root.join("calib")
    }

    pub fn template_location(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn refcats_location(&self) -> PathBuf {
        self.root.join("refcats")
    }

    pub fn config_location(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Skeleton repository that output repositories are modelled on.
    pub fn template_repo(&self) -> PathBuf {
        self.root.join("repo")
    }

    pub fn obs_package(&self) -> &str {
        &self.metadata.obs_package
    }

    pub fn camera(&self) -> &str {
        &self.metadata.camera
    }

    /// Make `repo` and `calib_repo` readable with this dataset's mapper.
    ///
    /// Missing directories are created. A repository that already has a
    /// mapper marker is left as is, and unrelated files are never touched.
    pub fn make_compatible_repo(&self, repo: &Path, calib_repo: &Path) -> Result<()> {
        let template = self.template_repo().join(MAPPER_FILE);
        if !template.is_file() {
            return Err(Error::Dataset(format!(
                "dataset {} has no {} in {}",
                self.name,
                MAPPER_FILE,
                self.template_repo().display()
            )));
        }

        let mut targets = vec![repo];
        if calib_repo != repo {
            targets.push(calib_repo);
        }

        for target in targets {
            fs::create_dir_all(target).map_err(|e| Error::io(target, e))?;
            let marker = target.join(MAPPER_FILE);
            if marker.exists() {
                tracing::debug!("{} already has a mapper", target.display());
                continue;
            }
            fs::copy(&template, &marker).map_err(|e| Error::io(&marker, e))?;
        }
        Ok(())
    }
}
