use semver::Version;

/// Represents a git branch with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub name: String,
    pub is_main: bool,
}

impl BranchContext {
    /// Create a new branch context
    pub fn new(name: impl Into<String>) -> Self {
        let name_str = name.into();
        let is_main = matches!(name_str.as_str(), "main" | "master");

        BranchContext {
            name: name_str,
            is_main,
        }
    }
}

/// Name of the transient branch that stages release artifacts,
/// e.g. `release-1.4.0`.
pub fn release_branch_name(prefix: &str, version: &Version) -> String {
    format!("{}{}", prefix, version)
}

/// Branch bookkeeping shared between `switch-to-release-branch` and
/// `switch-to-start-branch` within one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseState {
    pub starting_branch: BranchContext,
    pub release_branch: Option<String>,
}

impl ReleaseState {
    pub fn new(default_start_branch: impl Into<String>) -> Self {
        ReleaseState {
            starting_branch: BranchContext::new(default_start_branch),
            release_branch: None,
        }
    }

    /// Record the branch we left and the release branch we switched to
    pub fn enter_release(&mut self, starting: impl Into<String>, release: impl Into<String>) {
        self.starting_branch = BranchContext::new(starting);
        self.release_branch = Some(release.into());
    }

    /// Forget the release branch once it has been deleted
    pub fn leave_release(&mut self) -> Option<String> {
        self.release_branch.take()
    }
}
