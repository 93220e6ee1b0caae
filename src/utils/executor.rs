//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use anyhow::Result;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

/// Abstraction for command execution, enabling mocking in tests
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout, capturing its output
    fn run_command(
        &self,
        program: &str,
        args: &[&str],
        working_dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Output>;

    /// Run a command with stdout redirected into a file
    fn run_command_to_file(
        &self,
        program: &str,
        args: &[&str],
        stdout_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<Output>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealExecutor {
    fn run_command(
        &self,
        program: &str,
        args: &[&str],
        working_dir: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command(program, args, working_dir, timeout)
    }

    fn run_command_to_file(
        &self,
        program: &str,
        args: &[&str],
        stdout_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command_to_file(program, args, stdout_path, timeout)
    }
}

/// A mock executor for testing that records calls and returns configured responses
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub stdout_path: Option<String>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { stderr: String, exit_code: i32 },
        Timeout,
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    type SideEffect = Arc<dyn Fn(&[String]) + Send + Sync>;

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Pre-configured responses: program name -> response
        responses: Arc<Mutex<HashMap<String, MockResponse>>>,
        /// Actions run on a successful call, e.g. creating a dump directory
        side_effects: Arc<Mutex<HashMap<String, SideEffect>>>,
        /// Default response when no specific response is configured
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure a response for a specific program.
        ///
        /// Programs are matched by their full string first and then by file
        /// name, so `"mongodump"` also matches `/opt/tools/bin/mongodump`.
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(program.to_string(), response);
            self
        }

        /// Run `effect` with the call arguments whenever `program` succeeds
        pub fn on_call<F>(self, program: &str, effect: F) -> Self
        where
            F: Fn(&[String]) + Send + Sync + 'static,
        {
            self.side_effects
                .lock()
                .unwrap()
                .insert(program.to_string(), Arc::new(effect));
            self
        }

        /// Set the default response for unconfigured programs
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.call_count(program) > 0
        }

        /// Get number of calls to a specific program
        pub fn call_count(&self, program: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program || file_name(&c.program) == program)
                .count()
        }

        fn record_call(&self, program: &str, args: &[&str], stdout_path: Option<&Path>) {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                stdout_path: stdout_path.map(|p| p.display().to_string()),
            });
        }

        fn lookup<T: Clone>(map: &HashMap<String, T>, program: &str) -> Option<T> {
            map.get(program)
                .or_else(|| map.get(file_name(program)))
                .cloned()
        }

        fn get_response(&self, program: &str) -> MockResponse {
            Self::lookup(&self.responses.lock().unwrap(), program)
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }

        fn execute(&self, program: &str, args: &[&str], stdout_path: Option<&Path>) -> Result<Output> {
            self.record_call(program, args, stdout_path);

            match self.get_response(program) {
                MockResponse::Success { stdout, stderr } => {
                    let effect = Self::lookup(&self.side_effects.lock().unwrap(), program);
                    if let Some(effect) = effect {
                        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
                        effect(&owned);
                    }

                    let stdout = match stdout_path {
                        Some(path) => {
                            std::fs::write(path, stdout.as_bytes())?;
                            Vec::new()
                        }
                        None => stdout.into_bytes(),
                    };

                    Ok(Output {
                        status: std::process::ExitStatus::default(),
                        stdout,
                        stderr: stderr.into_bytes(),
                    })
                }
                MockResponse::Failure { stderr, exit_code } => {
                    if let Some(path) = stdout_path {
                        std::fs::write(path, b"")?;
                    }
                    anyhow::bail!("Command failed with exit code {:?}: {}", Some(exit_code), stderr)
                }
                MockResponse::Timeout => {
                    anyhow::bail!("Command timed out")
                }
            }
        }
    }

    fn file_name(program: &str) -> &str {
        Path::new(program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(program)
    }

    impl CommandExecutor for MockExecutor {
        fn run_command(
            &self,
            program: &str,
            args: &[&str],
            _working_dir: Option<&Path>,
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            self.execute(program, args, None)
        }

        fn run_command_to_file(
            &self,
            program: &str,
            args: &[&str],
            stdout_path: &Path,
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            self.execute(program, args, Some(stdout_path))
        }
    }
}
