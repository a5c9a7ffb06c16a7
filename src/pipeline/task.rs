use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::data_id::{parse_id_arguments, DataIdContainer};
use crate::subprocess::{ExitStatus, ProcessCommandBuilder, SubprocessManager};
use crate::{Error, Result};

/// What the task made of its command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCmd {
    pub id: DataIdContainer,
    pub args: Vec<String>,
}

impl ParsedCmd {
    pub fn from_args(args: Vec<String>) -> Result<Self> {
        Ok(Self {
            id: parse_id_arguments(&args)?,
            args,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub exit_status: i32,
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub parsed_cmd: ParsedCmd,
    /// Empty when the pipeline was not run.
    pub result_list: Vec<TaskResult>,
}

impl PipelineResult {
    pub fn succeeded(&self) -> bool {
        self.result_list.iter().all(|r| r.exit_status == 0)
    }
}

/// The external task that performs alert production.
#[async_trait]
pub trait PipelineTask: Send + Sync {
    fn default_name(&self) -> &str;

    /// Parse a full command line and run the task on it.
    async fn parse_and_run(&self, args: Vec<String>) -> Result<PipelineResult>;
}

/// Creates the prompt products database the pipeline writes into.
#[async_trait]
pub trait PpdbFactory: Send + Sync {
    /// `args` are `--config key=value` style overrides, e.g. the database URL.
    async fn make_ppdb(&self, args: Vec<String>) -> Result<()>;
}

/// Runs the AP pipeline as an external command-line task.
pub struct ApPipeCommand {
    program: String,
    subprocess: SubprocessManager,
}

impl ApPipeCommand {
    pub const DEFAULT_PROGRAM: &'static str = "ap_pipe.py";

    pub fn new(subprocess: SubprocessManager) -> Self {
        Self::with_program(Self::DEFAULT_PROGRAM, subprocess)
    }

    pub fn with_program(program: &str, subprocess: SubprocessManager) -> Self {
        Self {
            program: program.to_string(),
            subprocess,
        }
    }
}

#[async_trait]
impl PipelineTask for ApPipeCommand {
    fn default_name(&self) -> &str {
        "apPipe"
    }

    async fn parse_and_run(&self, args: Vec<String>) -> Result<PipelineResult> {
        let parsed_cmd = ParsedCmd::from_args(args)?;
        let command = ProcessCommandBuilder::new(&self.program)
            .args(&parsed_cmd.args)
            .build();

        let output = self.subprocess.run(command).await?;
        let exit_status = match output.status {
            ExitStatus::Success => 0,
            ExitStatus::Error(code) => code,
            ExitStatus::Signal(signal) => 128 + signal,
            ExitStatus::Timeout => {
                return Err(Error::Pipeline(format!("{} timed out", self.program)))
            }
        };
        if exit_status != 0 {
            tracing::debug!("{} stderr: {}", self.program, output.stderr.trim());
        }

        Ok(PipelineResult {
            parsed_cmd,
            result_list: vec![TaskResult { exit_status }],
        })
    }
}

/// Creates the database by running the external `make_ppdb.py` program.
pub struct MakePpdbCommand {
    program: String,
    subprocess: SubprocessManager,
}

impl MakePpdbCommand {
    pub const DEFAULT_PROGRAM: &'static str = "make_ppdb.py";

    pub fn new(subprocess: SubprocessManager) -> Self {
        Self::with_program(Self::DEFAULT_PROGRAM, subprocess)
    }

    pub fn with_program(program: &str, subprocess: SubprocessManager) -> Self {
        Self {
            program: program.to_string(),
            subprocess,
        }
    }
}

#[async_trait]
impl PpdbFactory for MakePpdbCommand {
    async fn make_ppdb(&self, args: Vec<String>) -> Result<()> {
        let command = ProcessCommandBuilder::new(&self.program).args(args).build();
        let output = self.subprocess.run(command).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Pipeline(format!(
                "{} failed ({:?}): {}",
                self.program,
                output.status,
                output.stderr.trim()
            )))
        }
    }
}
