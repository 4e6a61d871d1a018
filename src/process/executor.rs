use crate::error::{ReleaseError, Result};
use crate::process::StepContext;
use crate::ui;
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

/// Runs the external tools a task shells out to
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line for a task
    ///
    /// # Returns
    /// * `Ok(())` if the command exits with code 0
    /// * `Err` if it cannot be started or exits non-zero
    fn run(&self, command_line: &str, context: &StepContext) -> Result<()>;
}

/// Executes command lines through `sh -c` in the project root
pub struct ShellRunner {
    root: PathBuf,
    shell: String,
}

impl ShellRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ShellRunner {
            root: root.into(),
            shell: "sh".to_string(),
        }
    }

    /// Use a different POSIX shell (e.g. `bash`)
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl CommandRunner for ShellRunner {
    /// The command's stdout and stderr are captured, echoed to the console,
    /// and attached to the error on a non-zero exit.
    fn run(&self, command_line: &str, context: &StepContext) -> Result<()> {
        tracing::debug!(task = %context.task, command = command_line, "spawning");
        let started = Instant::now();

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .current_dir(&self.root)
            .envs(context.to_env_vars())
            .output()
            .map_err(|e| {
                ReleaseError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to execute `{}`: {}", command_line, e),
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        ui::display_command_output(&context.task, &stdout, &stderr);

        tracing::debug!(
            task = %context.task,
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );

        if !output.status.success() {
            return Err(ReleaseError::Command {
                task: context.task.clone(),
                command: command_line.to_string(),
                code: output.status.code().unwrap_or(-1),
                stdout,
                stderr,
            });
        }

        Ok(())
    }
}
