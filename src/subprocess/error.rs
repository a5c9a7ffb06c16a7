use std::time::Duration;

/// Failure to run an external program at all.
///
/// A program that runs and exits non-zero is not an error at this level;
/// callers inspect [`ExitStatus`](super::ExitStatus) for that.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{0} not found; is the stack set up?")]
    CommandNotFound(String),

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("Could not run process: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}
