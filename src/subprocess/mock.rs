use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type ArgsMatcher = Box<dyn Fn(&[String]) -> bool + Send + Sync>;

/// In-memory [`ProcessRunner`] that records every command it receives.
///
/// Programs without an expectation fail with
/// [`ProcessError::MockExpectationNotMet`], unless the runner was built with
/// [`MockProcessRunner::succeeding`]. Clones share expectations and history.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    state: Arc<Mutex<MockState>>,
    succeed_by_default: bool,
}

#[derive(Default)]
struct MockState {
    expectations: Vec<Expectation>,
    history: Vec<ProcessCommand>,
}

struct Expectation {
    program: String,
    matcher: Option<ArgsMatcher>,
    response: ProcessOutput,
    calls: usize,
    limit: Option<usize>,
}

impl Expectation {
    fn accepts(&self, command: &ProcessCommand) -> bool {
        self.program == command.program
            && self
                .matcher
                .as_ref()
                .map_or(true, |matcher| matcher(&command.args))
    }
}

/// Configures one expectation; takes effect on [`finish`](Self::finish).
pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: Expectation,
}

fn clean_exit() -> ProcessOutput {
    ProcessOutput {
        status: ExitStatus::Success,
        stdout: String::new(),
        stderr: String::new(),
        duration: Duration::from_millis(10),
    }
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that answers every unexpected program with a clean exit.
    pub fn succeeding() -> Self {
        Self {
            succeed_by_default: true,
            ..Self::default()
        }
    }

    // A poisoned lock only means another test thread panicked.
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: Expectation {
                program: program.to_string(),
                matcher: None,
                response: clean_exit(),
                calls: 0,
                limit: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        self.calls_to(program).len() == times
    }

    /// Every recorded invocation of `program`, oldest first.
    pub fn calls_to(&self, program: &str) -> Vec<ProcessCommand> {
        self.state()
            .history
            .iter()
            .filter(|command| command.program == program)
            .cloned()
            .collect()
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.state().history.clone()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let mut state = self.state();
        state.history.push(command.clone());

        if let Some(expectation) = state
            .expectations
            .iter_mut()
            .find(|expectation| expectation.accepts(&command))
        {
            expectation.calls += 1;
            return match expectation.limit {
                Some(limit) if expectation.calls > limit => {
                    Err(ProcessError::MockExpectationNotMet(format!(
                        "{} called {} times, expected {}",
                        command.program, expectation.calls, limit
                    )))
                }
                _ => Ok(expectation.response.clone()),
            };
        }

        if self.succeed_by_default {
            return Ok(clean_exit());
        }
        Err(ProcessError::MockExpectationNotMet(format!(
            "unexpected command: {}",
            command.display()
        )))
    }
}

impl MockCommandConfig {
    /// Only match invocations whose arguments satisfy `matcher`.
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.response.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.response.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.status = match code {
            0 => ExitStatus::Success,
            code => ExitStatus::Error(code),
        };
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.limit = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner.state().expectations.push(self.expectation);
    }
}
