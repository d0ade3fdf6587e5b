use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;

/// Runs an opaque command line.
///
/// `Ok(None)` means the process ran but reported no exit code (for example
/// it was killed by a signal). `Err` means it could not be started.
pub trait CommandExecutor {
    fn execute(&self, command_line: &str) -> Result<Option<i32>>;
}

/// Runs command lines through the platform shell with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    working_dir: Option<PathBuf>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command_line: &str) -> Result<Option<i32>> {
        let mut command = shell_command(command_line);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        let status = command
            .status()
            .with_context(|| format!("failed to start shell for: {command_line}"))?;
        Ok(status.code())
    }
}

fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}
