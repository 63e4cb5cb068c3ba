//! Shell command jobs
//!
//! The concrete job type the CLI dispatches: a command line handed to the
//! system shell, capturing exit status and output.

use serde::{Deserialize, Serialize};
use std::process::Command;

use crate::job::{Job, JobResult};

/// A job that runs one command line through the system shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellJob {
    pub command: String,
}

impl ShellJob {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    #[cfg(not(windows))]
    fn shell(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.command);
        cmd
    }

    #[cfg(windows)]
    fn shell(&self) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(&self.command);
        cmd
    }
}

impl Job for ShellJob {
    fn execute(&self) -> JobResult {
        match self.shell().output() {
            Ok(output) if output.status.success() => {
                JobResult::ok_with(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => JobResult::failed(format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )),
            Err(e) => JobResult::failed(format!("failed to spawn shell: {}", e)),
        }
    }
}
