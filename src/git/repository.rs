use crate::error::{ReleaseError, Result};
use git2::{
    build::CheckoutBuilder, BranchType, Cred, CredentialType, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository as Git2Repo,
};
use std::cell::RefCell;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Wrapper around git2::Repository with our trait interface
///
/// `git2::Repository` is `Send` but not `Sync`, so access is serialised
/// behind a mutex.
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository {
            repo: Mutex::new(repo),
        })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Git2Repo> {
        // A panic while holding the lock leaves the repository itself intact.
        self.repo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Credentials callback: ssh keys from ~/.ssh, then the ssh agent, then defaults
fn credential_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let user = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(user, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                return Ok(cred);
            }
        }

        Cred::default()
    });
    callbacks
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let repo = self.lock();
        let head = repo.head()?;

        if !head.is_branch() {
            return Ok("HEAD".to_string());
        }

        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str("HEAD name is not UTF-8")))
    }

    fn create_and_checkout_branch(&self, name: &str) -> Result<()> {
        let repo = self.lock();
        let head = repo.head()?.peel_to_commit()?;

        let branch = repo.branch(name, &head, false)?;
        let refname = branch
            .get()
            .name()
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str("Branch name is not UTF-8")))?
            .to_string();

        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::new().safe()))?;

        tracing::debug!(branch = name, "created and checked out branch");
        Ok(())
    }

    fn checkout_branch(&self, name: &str) -> Result<()> {
        let repo = self.lock();
        let branch = repo.find_branch(name, BranchType::Local)?;
        let reference = branch.into_reference();
        let refname = reference
            .name()
            .ok_or_else(|| ReleaseError::Git(git2::Error::from_str("Branch name is not UTF-8")))?
            .to_string();
        let tree = reference.peel_to_tree()?;

        repo.checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))?;
        repo.set_head(&refname)?;

        tracing::debug!(branch = name, "checked out branch");
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let repo = self.lock();
        let mut branch = repo.find_branch(name, BranchType::Local)?;
        branch.delete()?;

        tracing::debug!(branch = name, "deleted branch");
        Ok(())
    }

    fn add_all(&self, paths: &[&str], force: bool) -> Result<()> {
        let repo = self.lock();
        let mut index = repo.index()?;

        let flags = if force {
            IndexAddOption::FORCE
        } else {
            IndexAddOption::DEFAULT
        };
        index.add_all(paths.iter().copied(), flags, None)?;
        // `git add` also stages deletions of tracked files.
        index.update_all(paths.iter().copied(), None)?;
        index.write()?;

        tracing::debug!(?paths, force, "staged paths");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Option<Oid>> {
        let repo = self.lock();
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                return Ok(None);
            }
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = repo.signature()?;
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        tracing::debug!(%oid, message, "created commit");
        Ok(Some(oid))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let repo = self.lock();
        let target = repo.head()?.peel(git2::ObjectType::Commit)?;
        let signature = repo.signature()?;

        repo.tag(name, &target, &signature, message, false)?;

        tracing::debug!(tag = name, "created annotated tag");
        Ok(())
    }

    fn push(&self, remote_name: &str, branch: &str, with_tags: bool) -> Result<()> {
        let repo = self.lock();
        let mut remote = repo.find_remote(remote_name)?;

        let mut refspecs = vec![format!("refs/heads/{0}:refs/heads/{0}", branch)];
        if with_tags {
            for tag in repo.tag_names(None)?.iter().flatten() {
                refspecs.push(format!("refs/tags/{0}:refs/tags/{0}", tag));
            }
        }

        let rejected: RefCell<Vec<String>> = RefCell::new(Vec::new());
        {
            let mut callbacks = credential_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(reason) = status {
                    rejected
                        .borrow_mut()
                        .push(format!("{}: {}", refname, reason));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&refspecs, Some(&mut options))?;
        }

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(ReleaseError::Git(git2::Error::from_str(&format!(
                "Remote '{}' rejected: {}",
                remote_name,
                rejected.join(", ")
            ))));
        }

        tracing::debug!(remote = remote_name, branch, with_tags, "pushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::Repository;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Git2Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Release Bot").unwrap();
            config.set_str("user.email", "release@example.com").unwrap();
        }
        (dir, Git2Repository::from_git2(repo))
    }

    #[test]
    fn test_commit_and_nothing_to_commit() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("a.txt"), "one").unwrap();

        repo.add_all(&["."], false).unwrap();
        assert!(repo.commit("chore: first").unwrap().is_some());

        repo.add_all(&["."], false).unwrap();
        assert!(repo.commit("chore: empty").unwrap().is_none());
    }

    #[test]
    fn test_branch_switching() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("a.txt"), "one").unwrap();
        repo.add_all(&["."], false).unwrap();
        repo.commit("chore: first").unwrap();

        let start = repo.current_branch().unwrap();
        repo.create_and_checkout_branch("release-1.0.0").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "release-1.0.0");

        repo.checkout_branch(&start).unwrap();
        assert_eq!(repo.current_branch().unwrap(), start);

        repo.delete_branch("release-1.0.0").unwrap();
        assert!(repo.checkout_branch("release-1.0.0").is_err());
    }

    #[test]
    fn test_annotated_tag() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("a.txt"), "one").unwrap();
        repo.add_all(&["."], false).unwrap();
        repo.commit("chore: first").unwrap();

        repo.create_annotated_tag("1.0.0", "Created Tag for version: 1.0.0")
            .unwrap();

        let raw = repo.lock();
        let tag = raw
            .find_reference("refs/tags/1.0.0")
            .unwrap()
            .peel_to_tag()
            .unwrap();
        assert_eq!(
            tag.message().map(str::trim),
            Some("Created Tag for version: 1.0.0")
        );
    }

    #[test]
    fn test_push_to_missing_remote_fails() {
        let (_dir, repo) = init_repo();
        assert!(repo.push("origin", "master", true).is_err());
    }
}
