use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use git2::Oid;
use std::sync::Mutex;

/// A git operation as recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    CurrentBranch,
    CreateAndCheckout(String),
    Checkout(String),
    DeleteBranch(String),
    Add { paths: Vec<String>, force: bool },
    Commit(String),
    Tag { name: String, message: String },
    Push {
        remote: String,
        branch: String,
        with_tags: bool,
    },
}

#[derive(Debug)]
struct MockState {
    head: String,
    branches: Vec<String>,
    tags: Vec<String>,
    commits: usize,
    calls: Vec<GitCall>,
}

/// Mock repository for testing without actual git operations
///
/// Tracks the current branch and the set of branches so branch switching
/// behaves plausibly, and records every call in order.
pub struct MockRepository {
    state: Mutex<MockState>,
    fail_push: bool,
    nothing_to_commit: bool,
}

impl MockRepository {
    /// Create a mock repository whose HEAD is on `branch`
    pub fn new(branch: impl Into<String>) -> Self {
        let head = branch.into();
        MockRepository {
            state: Mutex::new(MockState {
                branches: vec![head.clone()],
                head,
                tags: Vec::new(),
                commits: 0,
                calls: Vec::new(),
            }),
            fail_push: false,
            nothing_to_commit: false,
        }
    }

    /// Make every push fail, as with an unreachable remote
    pub fn with_failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Detach HEAD; existing branches stay available for checkout
    pub fn detached(self) -> Self {
        self.lock().head = "HEAD".to_string();
        self
    }

    /// Make every commit report a clean index
    pub fn with_nothing_to_commit(mut self) -> Self {
        self.nothing_to_commit = true;
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<GitCall> {
        self.lock().calls.clone()
    }

    pub fn head(&self) -> String {
        self.lock().head.clone()
    }

    pub fn branches(&self) -> Vec<String> {
        self.lock().branches.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.lock().tags.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, call: GitCall) -> std::sync::MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new("master")
    }
}

fn mock_error(msg: String) -> ReleaseError {
    ReleaseError::Git(git2::Error::from_str(&msg))
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.record(GitCall::CurrentBranch).head.clone())
    }

    fn create_and_checkout_branch(&self, name: &str) -> Result<()> {
        let mut state = self.record(GitCall::CreateAndCheckout(name.to_string()));
        if state.branches.iter().any(|b| b == name) {
            return Err(mock_error(format!("A branch named '{}' already exists", name)));
        }
        state.branches.push(name.to_string());
        state.head = name.to_string();
        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let mut state = self.record(GitCall::Checkout(name.to_string()));
        if !state.branches.iter().any(|b| b == name) {
            return Err(mock_error(format!("Branch not found: {}", name)));
        }
        state.head = name.to_string();
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let mut state = self.record(GitCall::DeleteBranch(name.to_string()));
        if state.head == name {
            return Err(mock_error(format!("Cannot delete checked out branch '{}'", name)));
        }
        let before = state.branches.len();
        state.branches.retain(|b| b != name);
        if state.branches.len() == before {
            return Err(mock_error(format!("Branch not found: {}", name)));
        }
        Ok(())
    }

    fn add_all(&self, paths: &[&str], force: bool) -> Result<()> {
        drop(self.record(GitCall::Add {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            force,
        }));
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Option<Oid>> {
        let mut state = self.record(GitCall::Commit(message.to_string()));
        if self.nothing_to_commit {
            return Ok(None);
        }
        state.commits += 1;
        let mut bytes = [0u8; 20];
        bytes[..8].copy_from_slice(&(state.commits as u64).to_be_bytes());
        Ok(Some(Oid::from_bytes(&bytes)?))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let mut state = self.record(GitCall::Tag {
            name: name.to_string(),
            message: message.to_string(),
        });
        if state.tags.iter().any(|t| t == name) {
            return Err(mock_error(format!("Tag '{}' already exists", name)));
        }
        state.tags.push(name.to_string());
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str, with_tags: bool) -> Result<()> {
        drop(self.record(GitCall::Push {
            remote: remote.to_string(),
            branch: branch.to_string(),
            with_tags,
        }));
        if self.fail_push {
            return Err(mock_error(format!("Cannot reach remote '{}'", remote)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_push_are_recorded_in_order() {
        let repo = MockRepository::default();
        repo.add_all(&["dist"], true).unwrap();
        repo.push("origin", "master", false).unwrap();

        assert_eq!(
            repo.calls(),
            vec![
                GitCall::Add {
                    paths: vec!["dist".to_string()],
                    force: true,
                },
                GitCall::Push {
                    remote: "origin".to_string(),
                    branch: "master".to_string(),
                    with_tags: false,
                },
            ]
        );
    }

    #[test]
    fn test_detached_head_reports_head() {
        let repo = MockRepository::new("master").detached();
        assert_eq!(repo.current_branch().unwrap(), "HEAD");
        repo.checkout_branch("master").unwrap();
        assert_eq!(repo.head(), "master");
    }

    #[test]
    fn test_mock_branch_switching() {
        let repo = MockRepository::new("develop");
        assert_eq!(repo.current_branch().unwrap(), "develop");

        repo.create_and_checkout_branch("release-1.0.0").unwrap();
        assert_eq!(repo.head(), "release-1.0.0");
        assert!(repo.delete_branch("release-1.0.0").is_err());

        repo.checkout_branch("develop").unwrap();
        repo.delete_branch("release-1.0.0").unwrap();
        assert_eq!(repo.branches(), vec!["develop".to_string()]);
    }

    #[test]
    fn test_mock_records_calls_in_order() {
        let repo = MockRepository::default();
        repo.add_all(&["."], false).unwrap();
        repo.commit("chore: release 1.0.0").unwrap();
        repo.push("origin", "master", true).unwrap();

        assert_eq!(
            repo.calls(),
            vec![
                GitCall::Add {
                    paths: vec![".".to_string()],
                    force: false
                },
                GitCall::Commit("chore: release 1.0.0".to_string()),
                GitCall::Push {
                    remote: "origin".to_string(),
                    branch: "master".to_string(),
                    with_tags: true
                },
            ]
        );
    }

    #[test]
    fn test_mock_commit_ids_are_distinct() {
        let repo = MockRepository::default();
        let a = repo.commit("one").unwrap();
        let b = repo.commit("two").unwrap();
        assert_ne!(a, b);

        let clean = MockRepository::default().with_nothing_to_commit();
        assert!(clean.commit("noop").unwrap().is_none());
    }

    #[test]
    fn test_mock_duplicate_tag_fails() {
        let repo = MockRepository::default();
        repo.create_annotated_tag("1.0.0", "msg").unwrap();
        assert!(repo.create_annotated_tag("1.0.0", "msg").is_err());
        assert_eq!(repo.tags(), vec!["1.0.0".to_string()]);
    }

    #[test]
    fn test_mock_failing_push() {
        let repo = MockRepository::default().with_failing_push();
        assert!(repo.push("origin", "master", false).is_err());
    }
}
