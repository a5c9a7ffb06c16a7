use thiserror::Error;

use crate::config::ConfigError;
use crate::subprocess::ProcessError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset {name} not supported; supported datasets are: {}", supported.join(", "))]
    UnsupportedDataset {
        name: String,
        supported: Vec<String>,
    },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Invalid data ID {input:?}: {reason}")]
    DataId { input: String, reason: String },
}

impl Error {
    /// Attach the offending path to an I/O failure.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
