//! On-disk layout of a verification run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Directory layout for one verification run.
///
/// Creating a `Workspace` makes the root and its repositories; pointing at an
/// existing workspace is fine and leaves its contents alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    work_dir: PathBuf,
}

impl Workspace {
    pub fn new(location: impl AsRef<Path>) -> Result<Self> {
        let workspace = Self {
            work_dir: location.as_ref().to_path_buf(),
        };

        for dir in [
            workspace.work_dir.clone(),
            workspace.config_dir(),
            workspace.data_repo(),
            workspace.calib_repo(),
            workspace.template_repo(),
            workspace.output_repo(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }

        tracing::debug!("Workspace ready at {}", workspace.work_dir.display());
        Ok(workspace)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Task config overrides copied in from the dataset.
    pub fn config_dir(&self) -> PathBuf {
        self.work_dir.join("config")
    }

    pub fn data_repo(&self) -> PathBuf {
        self.work_dir.join("ingested")
    }

    pub fn calib_repo(&self) -> PathBuf {
        self.work_dir.join("calibingested")
    }

    pub fn template_repo(&self) -> PathBuf {
        self.work_dir.join("templates")
    }

    pub fn output_repo(&self) -> PathBuf {
        self.work_dir.join("output")
    }

    /// SQLite file backing the prompt products database.
    pub fn db_location(&self) -> PathBuf {
        self.work_dir.join("association.db")
    }

    pub fn alert_location(&self) -> PathBuf {
        self.work_dir.join("alerts")
    }
}
