use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met while running the pipeline.
/// These are reported to the user and the task carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// The index matched HEAD, so no commit was created
    NothingToCommit { task: String, message: String },
    /// `switch-to-start-branch` ran without a preceding release branch switch
    NoReleaseBranch { starting_branch: String },
    /// HEAD is detached, so there is no branch to return to
    DetachedHead { fallback_branch: String },
    /// A watch path does not exist and is not watched
    WatchPathMissing { path: PathBuf },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::NothingToCommit { task, message } => {
                write!(
                    f,
                    "Nothing to commit in '{}', skipped commit \"{}\"",
                    task, message
                )
            }
            PipelineWarning::NoReleaseBranch { starting_branch } => {
                write!(
                    f,
                    "No release branch was created; only checked out '{}'",
                    starting_branch
                )
            }
            PipelineWarning::DetachedHead { fallback_branch } => {
                write!(
                    f,
                    "HEAD is detached; will return to '{}' after the release",
                    fallback_branch
                )
            }
            PipelineWarning::WatchPathMissing { path } => {
                write!(f, "Watch path '{}' does not exist", path.display())
            }
        }
    }
}
