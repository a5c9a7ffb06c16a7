//! Common test utilities and helpers
#![allow(dead_code)]

use anyhow::Result;
use ap_verify::config::{MapEnv, PolicyConfig};
use ap_verify::dataset::{Dataset, MAPPER_FILE, METADATA_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DATASET_NAME: &str = "TestData";
pub const DATASET_PACKAGE: &str = "ap_verify_testdata";
pub const OBS_PACKAGE: &str = "obs_test";
pub const CAMERA: &str = "testcam";

pub const POLICY: &str = r#"
datasets:
  TestData: ap_verify_testdata
measurements:
  timing:
    ap_pipe.ApPipeTime: apPipe
"#;

/// Builder for a fake software stack holding the policy, one dataset
/// package and its obs package, each under `<tmp>/stack/<package>`.
pub struct TestContextBuilder {
    temp_dir: TempDir,
    policy: String,
    initial_files: Vec<(PathBuf, String)>,
}

impl TestContextBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            policy: POLICY.to_string(),
            initial_files: Vec::new(),
        })
    }

    /// Replace the policy document.
    pub fn with_policy(mut self, policy: &str) -> Self {
        self.policy = policy.to_string();
        self
    }

    /// Add a file to the dataset package.
    pub fn with_dataset_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.initial_files.push((
            Path::new("stack")
                .join(DATASET_PACKAGE)
                .join(path.as_ref()),
            content.to_string(),
        ));
        self
    }

    /// Add a file to the obs package.
    pub fn with_obs_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.initial_files.push((
            Path::new("stack").join(OBS_PACKAGE).join(path.as_ref()),
            content.to_string(),
        ));
        self
    }

    pub fn build(self) -> Result<TestContext> {
        let stack = self.temp_dir.path().join("stack");

        let policy_dir = stack.join("ap_verify").join("config");
        fs::create_dir_all(&policy_dir)?;
        fs::write(policy_dir.join("dataset_config.yaml"), &self.policy)?;

        let dataset_root = stack.join(DATASET_PACKAGE);
        fs::create_dir_all(dataset_root.join("repo"))?;
        fs::write(
            dataset_root.join(METADATA_FILE),
            format!("obs_package: {OBS_PACKAGE}\ncamera: {CAMERA}\n"),
        )?;
        fs::write(
            dataset_root.join("repo").join(MAPPER_FILE),
            "lsst.obs.test.TestMapper\n",
        )?;
        fs::create_dir_all(stack.join(OBS_PACKAGE).join("config"))?;

        for (file_path, content) in self.initial_files {
            let full_path = self.temp_dir.path().join(file_path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full_path, content)?;
        }

        Ok(TestContext {
            temp_dir: self.temp_dir,
        })
    }
}

/// Test context that manages temporary directories and cleanup
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn stack_dir(&self) -> PathBuf {
        self.temp_dir.path().join("stack")
    }

    pub fn dataset_root(&self) -> PathBuf {
        self.stack_dir().join(DATASET_PACKAGE)
    }

    /// A fresh directory for a workspace.
    pub fn workspace_dir(&self) -> PathBuf {
        self.temp_dir.path().join("workspace")
    }

    /// `<PACKAGE>_DIR` variables pointing into the fake stack.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        [
            ("AP_VERIFY_DIR", "ap_verify"),
            ("AP_VERIFY_TESTDATA_DIR", DATASET_PACKAGE),
            ("OBS_TEST_DIR", OBS_PACKAGE),
        ]
        .iter()
        .map(|(var, package)| {
            (
                var.to_string(),
                self.stack_dir().join(package).display().to_string(),
            )
        })
        .collect()
    }

    pub fn env(&self) -> MapEnv {
        self.env_vars()
            .iter()
            .fold(MapEnv::new(), |env, (var, value)| env.with_var(var, value.as_str()))
    }

    pub fn policy(&self) -> Result<PolicyConfig> {
        Ok(PolicyConfig::from_path(
            self.stack_dir()
                .join("ap_verify/config/dataset_config.yaml"),
        )?)
    }

    pub fn dataset(&self) -> Result<Dataset> {
        Ok(Dataset::new_with(DATASET_NAME, &self.policy()?, &self.env())?)
    }

    pub fn create_file(&self, path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let full_path = self.temp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;
        Ok(full_path)
    }
}

/// Common assertion helpers
pub mod assertions {
    use std::path::Path;

    pub fn assert_file_contains(path: &Path, content: &str) {
        let file_content = std::fs::read_to_string(path)
            .unwrap_or_else(|_| panic!("Failed to read file: {}", path.display()));
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content: {}",
            path.display(),
            content
        );
    }
}
