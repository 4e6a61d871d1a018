use std::collections::HashMap;

/// Context passed to an external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepContext {
    /// Name of the task running the command
    pub task: String,
    /// Manifest version, if it could be read
    pub version: Option<String>,
    /// Requested bump type, if any
    pub bump_type: Option<String>,
    /// Branch HEAD points at, if known
    pub branch: Option<String>,
}

impl StepContext {
    pub fn new(task: impl Into<String>) -> Self {
        StepContext {
            task: task.into(),
            ..Default::default()
        }
    }

    /// Convert context to environment variables for the command
    ///
    /// Maps context fields to RELEASE_* environment variables
    pub fn to_env_vars(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();

        env.insert("RELEASE_TASK".to_string(), self.task.clone());

        if let Some(ref version) = self.version {
            env.insert("RELEASE_VERSION".to_string(), version.clone());
        }

        if let Some(ref bump) = self.bump_type {
            env.insert("RELEASE_BUMP_TYPE".to_string(), bump.clone());
        }

        if let Some(ref branch) = self.branch {
            env.insert("RELEASE_BRANCH".to_string(), branch.clone());
        }

        env
    }
}
