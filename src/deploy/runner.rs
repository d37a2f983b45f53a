//! Deploy command execution
//!
//! - CommandRunner trait: the seam between orchestration and the deploy tool
//! - ProcessRunner: spawns the real process
//! - RecordingRunner: records commands in-process for tests

use std::process::{Command, Stdio};
use std::sync::Mutex;

use super::{DeployCommand, DeployError};
use crate::config::Verbosity;

/// Executes one deploy command to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &DeployCommand) -> Result<(), DeployError>;
}

/// Runs commands as child processes with the caller's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    verbosity: Verbosity,
}

impl ProcessRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &DeployCommand) -> Result<(), DeployError> {
        let output = || {
            if self.verbosity.is_quiet() {
                Stdio::null()
            } else {
                Stdio::inherit()
            }
        };

        let status = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .status()
            .map_err(|e| DeployError::ExternalTool {
                command: command.to_string(),
                detail: format!("failed to start: {}", e),
            })?;

        if !status.success() {
            return Err(DeployError::ExternalTool {
                command: command.to_string(),
                detail: format!("exited with {}", status),
            });
        }
        Ok(())
    }
}

/// Records every command instead of running it.
///
/// Optionally fails the n-th command (0-based) to exercise fail-fast paths.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<DeployCommand>>,
    fail_at: Option<usize>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose `index`-th command fails.
    pub fn failing_at(index: usize) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_at: Some(index),
        }
    }

    /// Commands seen so far, including a failed one.
    pub fn commands(&self) -> Vec<DeployCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &DeployCommand) -> Result<(), DeployError> {
        let mut commands = self
            .commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = commands.len();
        commands.push(command.clone());

        if self.fail_at == Some(index) {
            return Err(DeployError::ExternalTool {
                command: command.to_string(),
                detail: "exited with exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}
