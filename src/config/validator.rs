use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Why a policy document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("`{0}` is missing")]
    MissingKey(String),

    #[error("`{0}` is not a dictionary")]
    NotMapping(String),
}

/// The sections of a policy document that were checked.
pub struct Sections<'a> {
    pub datasets: &'a Mapping,
    pub timing: &'a Mapping,
}

/// Check that `datasets` and `measurements.timing` exist and are mappings.
///
/// Nothing else in the document is inspected.
pub fn validate(document: &Mapping) -> Result<Sections<'_>, ShapeError> {
    let datasets = require_mapping(document, "datasets", "datasets")?;
    let measurements = require_mapping(document, "measurements", "measurements")?;
    let timing = require_mapping(measurements, "timing", "measurements.timing")?;

    tracing::trace!(
        "Policy declares {} dataset(s) and {} timing metric(s)",
        datasets.len(),
        timing.len()
    );

    Ok(Sections { datasets, timing })
}

fn require_mapping<'a>(
    parent: &'a Mapping,
    key: &str,
    path: &str,
) -> Result<&'a Mapping, ShapeError> {
    match parent.get(key) {
        Some(Value::Mapping(mapping)) => Ok(mapping),
        Some(_) => Err(ShapeError::NotMapping(path.to_string())),
        None => Err(ShapeError::MissingKey(path.to_string())),
    }
}
