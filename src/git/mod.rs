//! Git operations abstraction layer
//!
//! This module provides a trait-based abstraction over the version-control
//! steps of the release pipeline, allowing for a real implementation backed
//! by `git2` and a recording mock for tests.
//!
//! # Overview
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: Records every call so tests can assert ordering
//!
//! Tasks depend on the [Repository] trait rather than on a concrete type.

pub mod mock;
pub mod repository;

pub use mock::{GitCall, MockRepository};
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;

/// Version-control operations used by the release tasks
///
/// ## Thread Safety
///
/// All implementors must be `Send + Sync`: tasks in a parallel group share
/// one repository handle.
///
/// ## Error Handling
///
/// Implementations map underlying errors (like `git2::Error`) to
/// [crate::error::ReleaseError] variants.
pub trait Repository: Send + Sync {
    /// Short name of the branch HEAD points at (`git rev-parse --abbrev-ref HEAD`)
    fn current_branch(&self) -> Result<String>;

    /// Create a branch at HEAD and switch to it (`git checkout -b <name>`)
    fn create_and_checkout_branch(&self, name: &str) -> Result<()>;

    /// Switch to an existing local branch (`git checkout <name>`)
    fn checkout_branch(&self, name: &str) -> Result<()>;

    /// Delete a local branch regardless of merge status (`git branch -D <name>`)
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Stage paths (`git add [-f] <paths>`)
    ///
    /// With `force`, ignored files are staged too.
    fn add_all(&self, paths: &[&str], force: bool) -> Result<()>;

    /// Commit the index on HEAD
    ///
    /// # Returns
    /// * `Ok(Some(oid))` - The new commit
    /// * `Ok(None)` - The index matches HEAD, nothing was committed
    fn commit(&self, message: &str) -> Result<Option<Oid>>;

    /// Create an annotated tag on HEAD (`git tag -a <name> -m <message>`)
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push a branch, and optionally every tag, to a remote
    /// (`git push <remote> <branch> [--tags]`)
    fn push(&self, remote: &str, branch: &str, with_tags: bool) -> Result<()>;
}
