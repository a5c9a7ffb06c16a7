//! Dataset ingestion.
//!
//! Copies a dataset into the repositories of a [`Workspace`] so that the
//! pipeline never needs to know about the dataset layout. Every step is
//! skipped when the workspace already holds its output, which makes
//! re-running ingestion against a half-finished workspace safe.

pub mod config;
pub mod files;
pub mod refcats;

pub use config::DatasetIngestConfig;
pub use files::find_matching_files;
pub use refcats::extract_refcat;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::EnvSource;
use crate::dataset::Dataset;
use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};
use crate::workspace::Workspace;
use crate::{Error, Result};

/// Runs every ingestion step for one dataset.
pub struct DatasetIngester {
    config: DatasetIngestConfig,
    subprocess: SubprocessManager,
}

impl DatasetIngester {
    pub fn new(config: DatasetIngestConfig, subprocess: SubprocessManager) -> Self {
        Self { config, subprocess }
    }

    pub async fn run(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        dataset.make_compatible_repo(&workspace.data_repo(), &workspace.calib_repo())?;
        self.ingest_raws(dataset, workspace).await?;
        self.ingest_calibs(dataset, workspace).await?;
        self.ingest_defects(dataset, workspace).await?;
        self.ingest_refcats(dataset, workspace)?;
        self.copy_configs(dataset, workspace)?;
        Ok(())
    }

    async fn ingest_raws(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        let repo = workspace.data_repo();
        if repo.join("registry.sqlite3").exists() {
            info!("Raw images were previously ingested, skipping...");
            return Ok(());
        }

        info!("Ingesting raw images...");
        let data_files = find_matching_files(
            &dataset.raw_location(),
            &self.config.data_files,
            &[],
        )?;
        if data_files.is_empty() {
            return Err(Error::Ingestion(format!(
                "No raw files found at {}",
                dataset.raw_location().display()
            )));
        }

        let mut command = ProcessCommandBuilder::new(&self.config.data_ingester)
            .path(&repo)
            .option("--calib", display(&workspace.calib_repo()))
            .option("--mode", "link")
            .paths(&data_files);
        if !self.config.data_bad_files.is_empty() {
            command = command
                .arg("--badFile")
                .args(&self.config.data_bad_files);
        }

        self.run_ingester(command, "raw files").await?;
        info!("Images are now ingested in {}", repo.display());
        Ok(())
    }

    async fn ingest_calibs(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        let calib_repo = workspace.calib_repo();
        if calib_repo.join("calibRegistry.sqlite3").exists() {
            info!("Calibration files were previously ingested, skipping...");
            return Ok(());
        }

        info!("Ingesting calibration files...");
        let calib_files = find_matching_files(
            &dataset.calib_location(),
            &self.config.calib_files,
            &self.config.calib_bad_files,
        )?;
        if calib_files.is_empty() {
            return Err(Error::Ingestion(format!(
                "No calib files found at {}",
                dataset.calib_location().display()
            )));
        }

        let command = ProcessCommandBuilder::new(&self.config.calib_ingester)
            .path(&workspace.data_repo())
            .option("--calib", display(&calib_repo))
            // The calib ingester insists on an output repository of its own.
            .option("--output", display(&calib_repo.join("dummy")))
            .option("--mode", "link")
            .option("--validity", self.config.calib_validity.to_string())
            .paths(&calib_files);

        self.run_ingester(command, "calibration files").await?;
        info!(
            "Calibrations corresponding to {} are now ingested in {}",
            workspace.data_repo().display(),
            calib_repo.display()
        );
        Ok(())
    }

    async fn ingest_defects(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        let calib_repo = workspace.calib_repo();
        if calib_repo.join("defects").exists() {
            info!("Defects were previously ingested, skipping...");
            return Ok(());
        }
        let Some(defect_path) = self.config.defect_path(dataset.dataset_root()) else {
            info!("No defects configured for {}, skipping...", dataset.name());
            return Ok(());
        };

        info!("Ingesting defects...");
        let command = ProcessCommandBuilder::new(&self.config.defect_ingester)
            .path(&workspace.data_repo())
            .path(&defect_path)
            .option("--calib", display(&calib_repo));
        self.run_ingester(command, "defect files").await?;
        info!("Defects are now ingested in {}", calib_repo.display());
        Ok(())
    }

    fn ingest_refcats(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        let refcat_root = workspace.data_repo().join("ref_cats");
        if refcat_root.exists() {
            info!("Refcats were previously ingested, skipping...");
            return Ok(());
        }

        info!("Ingesting reference catalogs...");
        let extracted = self.config.refcats.iter().try_for_each(|(name, tarball)| {
            let tarball = dataset.refcats_location().join(tarball);
            tracing::debug!("Extracting refcat {} from {}", name, tarball.display());
            extract_refcat(&tarball, &refcat_root.join(name))
        });
        // `ref_cats` marks a finished step; never leave a partial one behind.
        if let Err(e) = extracted {
            if refcat_root.exists() {
                fs::remove_dir_all(&refcat_root).map_err(|e| Error::io(&refcat_root, e))?;
            }
            return Err(e);
        }
        info!(
            "Reference catalogs are now ingested in {}",
            workspace.data_repo().display()
        );
        Ok(())
    }

    fn copy_configs(&self, dataset: &Dataset, workspace: &Workspace) -> Result<()> {
        let config_dir = workspace.config_dir();
        let mut existing = fs::read_dir(&config_dir).map_err(|e| Error::io(&config_dir, e))?;
        if existing.next().is_some() {
            info!("Configs already copied, skipping...");
            return Ok(());
        }

        info!("Storing data-specific configs...");
        let configs = find_matching_files(
            &dataset.config_location(),
            &["*.py".to_string()],
            &[],
        )?;
        copy_flat(&configs, &config_dir)?;
        info!("Configs are now stored in {}", config_dir.display());
        Ok(())
    }

    async fn run_ingester(&self, command: ProcessCommandBuilder, what: &str) -> Result<()> {
        let command = command.build();
        let program = command.program.clone();
        tracing::debug!("Running {}", command.display());

        let output = self.subprocess.run(command).await?;
        if output.status.success() {
            return Ok(());
        }

        if output.stderr.contains("UNIQUE constraint failed") {
            return Err(Error::Ingestion(format!("Not all {what} are unique")));
        }
        Err(Error::Ingestion(format!(
            "{program} failed ({:?}) while ingesting {what}: {}",
            output.status,
            output.stderr.trim()
        )))
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn copy_flat(files: &BTreeSet<PathBuf>, destination: &Path) -> Result<()> {
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = destination.join(name);
        fs::copy(file, &target).map_err(|e| Error::io(&target, e))?;
    }
    Ok(())
}

/// Ingest `dataset` into `workspace` with the dataset's own settings.
pub async fn ingest_dataset(
    dataset: &Dataset,
    workspace: &Workspace,
    subprocess: SubprocessManager,
    env: &dyn EnvSource,
) -> Result<()> {
    let config = DatasetIngestConfig::for_dataset(dataset, env)?;
    let ingester = DatasetIngester::new(config, subprocess);
    ingester.run(dataset, workspace).await?;
    info!("Data ingested");
    Ok(())
}
