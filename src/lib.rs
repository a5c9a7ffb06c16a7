//! # ap-verify
//!
//! Drives an alert-production verification run end to end: load the policy,
//! lay out a workspace, ingest a dataset into it, run the AP pipeline, and
//! extract timing measurements.
//!
//! ## Usage
//!
//! ```bash
//! ap-verify run --dataset HiTS2015 --output /scratch/hits --id "visit=410915 ccd=25"
//! ap-verify ingest --dataset HiTS2015 --output /scratch/hits
//! ```
//!
//! ## Modules
//!
//! - `config` - Policy document loading and validation
//! - `dataset` - Datasets declared by the policy and their layout on disk
//! - `workspace` - Directory layout of a verification run
//! - `ingestion` - Ingest a dataset into a workspace
//! - `pipeline` - Drive the external AP pipeline and database factory
//! - `measurements` - Timing metrics from pipeline metadata
//! - `subprocess` - Subprocess abstraction layer for testing
pub mod config;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod measurements;
pub mod pipeline;
pub mod subprocess;
pub mod workspace;

pub use error::{Error, Result};
