//! AP pipeline driver.
//!
//! The pipeline itself and the database factory are external programs; this
//! module only assembles their command lines from a [`Workspace`] and the
//! user's [`ApPipeArgs`]. Both sit behind traits ([`PipelineTask`],
//! [`PpdbFactory`]) so tests can supply recording fakes.
//!
//! [`Workspace`]: crate::workspace::Workspace

pub mod args;
pub mod data_id;
pub mod driver;
pub mod task;

pub use args::ApPipeArgs;
pub use data_id::{parse_id_arguments, DataId, DataIdContainer, DataIdValue};
pub use driver::{config_arguments, run_ap_pipe, workspace_db_url, PIPELINE_CONFIG_FILE};
pub use task::{
    ApPipeCommand, MakePpdbCommand, ParsedCmd, PipelineResult, PipelineTask, PpdbFactory,
    TaskResult,
};
