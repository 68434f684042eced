//! External process invocation for the AWS CLI.

use async_trait::async_trait;
use log::debug;

use crate::error::{BootstrapError, BootstrapResult};

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `1` when the process was terminated by a signal
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Turn a non-zero exit into [`BootstrapError::ExternalCommand`], keeping the
    /// captured output verbatim.
    pub fn into_result(self, program: &str) -> BootstrapResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(BootstrapError::ExternalCommand {
                program: program.to_string(),
                code: self.code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs a program to completion and captures its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> BootstrapResult<CommandOutput>;
}

/// [`CommandRunner`] backed by real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> BootstrapResult<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| BootstrapError::spawn(program, e))?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
