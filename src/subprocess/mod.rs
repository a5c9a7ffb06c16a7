//! Subprocess abstraction.
//!
//! The ingest programs, the PPDB factory and the AP pipeline are all external
//! executables. They are reached only through [`ProcessRunner`], so the rest of
//! the crate can be exercised against [`MockProcessRunner`].

pub mod builder;
pub mod error;
pub mod mock;
pub mod runner;


pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};

use std::sync::Arc;

/// Shared handle to the runner every external program goes through.
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    /// A manager backed by a fresh [`MockProcessRunner`] with no expectations.
    pub fn mock() -> (Self, MockProcessRunner) {
        Self::with_mock(MockProcessRunner::new())
    }

    /// Like [`mock`](Self::mock), but unexpected programs exit cleanly.
    pub fn succeeding_mock() -> (Self, MockProcessRunner) {
        Self::with_mock(MockProcessRunner::succeeding())
    }

    fn with_mock(mock: MockProcessRunner) -> (Self, MockProcessRunner) {
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.runner.run(command).await
    }
}
