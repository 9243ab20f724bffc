//! Bounded-time execution of external programs
//!
//! Every invocation has a wall-clock budget. On expiry the child is killed
//! (`kill_on_drop`) and the caller gets [`ExecError::Timeout`]; a run never
//! hangs past its budget.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use capstan_common::ExecError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// A program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Text written to standard input, which is closed afterwards
    pub stdin: Option<String>,
    /// Wall-clock budget
    pub timeout: Duration,
}

impl CommandSpec {
    /// Invocation of `program` with no arguments
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` on standard input
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

/// Runs external programs
///
/// Exit code 0 yields the captured output; anything else is an
/// [`ExecError`]. Callers decide which failures mean "absent".
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion or until the budget expires
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// [`CommandRunner`] backed by tokio child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    async fn run_to_completion(spec: &CommandSpec) -> std::io::Result<std::process::Output> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let input = spec.stdin.as_deref().unwrap_or_default();
        let write = async move {
            match stdin {
                // the pipe is dropped after the write, so the child sees EOF
                Some(mut pipe) => pipe.write_all(input.as_bytes()).await,
                None => Ok(()),
            }
        };

        // stdin is written while output is collected
        let (written, output) = tokio::join!(write, child.wait_with_output());
        match written {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
            Err(_) => debug!(program = %spec.program, "child closed stdin early"),
            Ok(()) => {}
        }
        output
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: CommandSpec) -> Result<CommandOutput, ExecError> {
        debug!(command = %spec, timeout = ?spec.timeout, "running external command");

        let output = tokio::time::timeout(spec.timeout, Self::run_to_completion(&spec))
            .await
            .map_err(|_| {
                warn!(program = %spec.program, timeout = ?spec.timeout, "command timed out");
                ExecError::Timeout {
                    program: spec.program.clone(),
                    timeout: spec.timeout,
                }
            })?
            .map_err(|source| ExecError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            debug!(
                program = %spec.program,
                exit_code = ?output.status.code(),
                stderr = %stderr.trim_end(),
                "command failed"
            );
            return Err(ExecError::Failed {
                program: spec.program,
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| ExecError::InvalidOutput {
            program: spec.program.clone(),
            message: format!("stdout is not valid UTF-8: {}", e),
        })?;

        Ok(CommandOutput { stdout, stderr })
    }
}
