//! Timing measurements extracted from pipeline metadata.
//!
//! The policy's `measurements.timing` section maps a metric name to the
//! metadata prefix of the task being timed. A task records
//! `<prefix>.runStartCpuTime` and `<prefix>.runEndCpuTime`; the metric is
//! their difference.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::PolicyConfig;
use crate::workspace::Workspace;
use crate::{Error, Result};

/// Metadata file the pipeline leaves in the output repository.
pub const METADATA_FILE: &str = "apPipe_metadata.yaml";

/// Flat numeric task metadata, keyed by dotted name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskMetadata(BTreeMap<String, f64>);

impl TaskMetadata {
    /// Load the numeric entries of a metadata file; anything else is skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: Mapping = match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(Error::Pipeline(format!(
                    "{} is not a metadata mapping: {:?}",
                    path.display(),
                    other
                )))
            }
        };

        let mut metadata = Self::default();
        for (key, value) in entries {
            match (key.as_str(), value.as_f64()) {
                (Some(key), Some(number)) => metadata.insert(key, number),
                _ => tracing::debug!("Skipping non-numeric metadata {:?}: {:?}", key, value),
            }
        }
        Ok(metadata)
    }

    /// Metadata written by the last pipeline run in `workspace`, if any.
    pub fn from_workspace(workspace: &Workspace) -> Result<Option<Self>> {
        let path = workspace.output_repo().join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metric: String,
    pub value: f64,
    pub unit: String,
}

/// One measurement per timing metric whose task left both timestamps.
pub fn measure_timing(config: &PolicyConfig, metadata: &TaskMetadata) -> Vec<Measurement> {
    let mut measurements = Vec::new();

    for (metric, prefix) in config.timing() {
        let (Some(metric), Some(prefix)) = (metric.as_str(), prefix.as_str()) else {
            tracing::warn!("Ignoring malformed timing entry {:?}: {:?}", metric, prefix);
            continue;
        };

        let start = metadata.get(&format!("{prefix}.runStartCpuTime"));
        let end = metadata.get(&format!("{prefix}.runEndCpuTime"));
        match (start, end) {
            (Some(start), Some(end)) => measurements.push(Measurement {
                metric: metric.to_string(),
                value: end - start,
                unit: "s".to_string(),
            }),
            _ => tracing::debug!("No timing information for {} ({})", metric, prefix),
        }
    }
    measurements
}

pub fn write_measurements(path: &Path, measurements: &[Measurement]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(measurements)?;
    fs::write(path, json).map_err(|e| Error::io(path, e))
}
