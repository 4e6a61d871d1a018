use thiserror::Error;

/// Unified error type for release-runner operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("{0}")]
    BumpType(String),

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Circular task reference: {0}")]
    TaskCycle(String),

    #[error("Command `{command}` in task '{task}' exited with code {code}")]
    Command {
        task: String,
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Task '{task}' failed")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<ReleaseError>,
    },

    #[error("{} parallel task(s) failed: {}", failures.len(), failure_summary(failures))]
    Parallel { failures: Vec<(String, ReleaseError)> },

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-runner
pub type Result<T> = std::result::Result<T, ReleaseError>;

fn failure_summary(failures: &[(String, ReleaseError)]) -> String {
    failures
        .iter()
        .map(|(task, err)| format!("'{}' ({})", task, err))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::Manifest(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Wrap an error with the name of the task it escaped from
    pub fn task_failed(task: impl Into<String>, source: ReleaseError) -> Self {
        ReleaseError::TaskFailed {
            task: task.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping `TaskFailed` wrappers
    pub fn root_cause(&self) -> &ReleaseError {
        match self {
            ReleaseError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Names of the tasks this error passed through, outermost first
    pub fn task_trail(&self) -> Vec<&str> {
        let mut trail = Vec::new();
        let mut current = self;
        while let ReleaseError::TaskFailed { task, source } = current {
            trail.push(task.as_str());
            current = source;
        }
        trail
    }
}
