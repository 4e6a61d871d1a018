use crate::error::{ReleaseError, Result};
use crate::process::{CommandRunner, StepContext};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

/// A command invocation as seen by [RecordingRunner]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub task: String,
    pub command: String,
}

/// Command runner that records invocations instead of spawning processes
///
/// Tasks listed with [RecordingRunner::fail_task] exit with code 1.
#[derive(Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<Invocation>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands run by `task` fail
    pub fn fail_task(mut self, task: impl Into<String>) -> Self {
        self.failing.insert(task.into());
        self
    }

    /// Sleep inside every command, to make concurrency observable
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Task names in invocation order
    pub fn tasks(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.task).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command_line: &str, context: &StepContext) -> Result<()> {
        self.invocations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Invocation {
                task: context.task.clone(),
                command: command_line.to_string(),
            });

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.failing.contains(&context.task) {
            return Err(ReleaseError::Command {
                task: context.task.clone(),
                command: command_line.to_string(),
                code: 1,
                stdout: String::new(),
                stderr: format!("{} failed", context.task),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_fails_selected_tasks() {
        let runner = RecordingRunner::new().fail_task("lint");

        runner.run("tsc", &StepContext::new("compile")).unwrap();
        assert!(runner.run("tslint", &StepContext::new("lint")).is_err());

        assert_eq!(runner.tasks(), vec!["compile", "lint"]);
        assert_eq!(runner.invocations()[1].command, "tslint");
    }
}
