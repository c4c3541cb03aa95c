//! Version-control collaborator.
//!
//! The store only sequences repository calls; the calls themselves live behind
//! the [`VersionControl`] trait. [`GitRepository`] implements it over `git2`
//! and is what [`git_factory`] produces. Callers can bind any other
//! implementation through a [`RepositoryFactory`].

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use git2::{ErrorCode, IndexAddOption, Repository, RepositoryInitOptions, Signature};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{FALLBACK_AUTHOR_EMAIL, FALLBACK_AUTHOR_NAME, STAGE_ALL};
use crate::errors::VcsError;

// ============================================================================
// Types
// ============================================================================

/// Identifier of a commit (full hex object id for git).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Wrap an identifier produced by a collaborator.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The full identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first 8 characters, for display.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the repository history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    /// Commit identifier.
    pub id: CommitId,
    /// Commit message without trailing newline.
    pub message: String,
    /// Author name.
    pub author: String,
    /// Author time.
    pub time: DateTime<Utc>,
}

/// Flags for repository initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitFlags {
    /// Create a bare repository (no working tree).
    pub bare: bool,
    /// Name of the initial branch; git's default when `None`.
    pub initial_branch: Option<String>,
}

/// Operations the store needs from a version-control system.
pub trait VersionControl: fmt::Debug {
    /// Directory the handle is bound to.
    fn root(&self) -> &Path;

    /// Whether a repository exists at [`root`](Self::root).
    fn is_initialized(&self) -> bool;

    /// Create the repository. Calling it on an existing repository is a no-op.
    fn init(&self, flags: &InitFlags) -> Result<(), VcsError>;

    /// Stage every path matching `patterns`, including deletions.
    fn add(&self, patterns: &[&str]) -> Result<(), VcsError>;

    /// Record the staged tree as a new commit on HEAD.
    ///
    /// Fails with [`VcsError::NothingToCommit`] when the staged tree matches HEAD.
    fn commit(&self, message: &str) -> Result<CommitId, VcsError>;

    /// Most recent commits first, at most `limit` of them.
    fn log(&self, limit: usize) -> Result<Vec<CommitInfo>, VcsError>;
}

/// Produces a repository handle bound to a directory.
pub type RepositoryFactory = Box<dyn Fn(&Path) -> Box<dyn VersionControl>>;

/// The default factory: a [`GitRepository`] bound to the directory.
pub fn git_factory() -> RepositoryFactory {
    Box::new(|root: &Path| Box::new(GitRepository::new(root)) as Box<dyn VersionControl>)
}

// ============================================================================
// GitRepository
// ============================================================================

/// A `git2`-backed repository handle.
///
/// Binding is lazy: the handle only records the directory, and each operation
/// opens the repository. Parent directories are never searched, so a store
/// nested inside another checkout keeps its own history.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Bind a handle to `root` without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn open(&self) -> Result<Repository, VcsError> {
        Repository::open(&self.root).map_err(|e| match e.code() {
            ErrorCode::NotFound => VcsError::NotInitialized {
                path: self.root.clone(),
            },
            _ => VcsError::git("open_repository", e),
        })
    }

    fn signature(repo: &Repository) -> Result<Signature<'static>, VcsError> {
        match repo.signature() {
            Ok(signature) => Ok(signature),
            Err(_) => {
                debug!("No git identity configured, using fallback author");
                Signature::now(FALLBACK_AUTHOR_NAME, FALLBACK_AUTHOR_EMAIL)
                    .map_err(|e| VcsError::git("create_signature", e))
            }
        }
    }
}

impl VersionControl for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_initialized(&self) -> bool {
        Repository::open(&self.root).is_ok()
    }

    fn init(&self, flags: &InitFlags) -> Result<(), VcsError> {
        if self.is_initialized() {
            debug!("Repository already initialized at {}", self.root.display());
            return Ok(());
        }

        let mut options = RepositoryInitOptions::new();
        options.bare(flags.bare);
        if let Some(branch) = &flags.initial_branch {
            options.initial_head(branch);
        }

        Repository::init_opts(&self.root, &options)
            .map_err(|e| VcsError::git("init_repository", e))?;
        info!("Initialized repository at {}", self.root.display());
        Ok(())
    }

    fn add(&self, patterns: &[&str]) -> Result<(), VcsError> {
        let repo = self.open()?;
        let mut index = repo.index().map_err(|e| VcsError::git("get_index", e))?;

        // libgit2 pathspecs have no `.` shorthand for the whole tree.
        let specs: Vec<&str> = patterns
            .iter()
            .map(|p| if *p == STAGE_ALL { "*" } else { *p })
            .collect();

        index
            .add_all(specs.iter(), IndexAddOption::DEFAULT, None)
            .map_err(|e| VcsError::git("add_all", e))?;
        index
            .update_all(specs.iter(), None)
            .map_err(|e| VcsError::git("update_all", e))?;
        index.write().map_err(|e| VcsError::git("write_index", e))?;

        debug!(patterns = ?patterns, "Staged changes");
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<CommitId, VcsError> {
        let repo = self.open()?;
        let mut index = repo.index().map_err(|e| VcsError::git("get_index", e))?;
        let tree_id = index
            .write_tree()
            .map_err(|e| VcsError::git("write_tree", e))?;
        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| VcsError::git("find_tree", e))?;

        let parent = match repo.head() {
            Ok(head) => Some(
                head.peel_to_commit()
                    .map_err(|e| VcsError::git("peel_to_commit", e))?,
            ),
            Err(_) => None,
        };
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(VcsError::NothingToCommit {
                path: self.root.clone(),
            });
        }
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let signature = Self::signature(&repo)?;
        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| VcsError::git("create_commit", e))?;

        info!("Created commit: {} - {}", oid, message);
        Ok(CommitId::new(oid.to_string()))
    }

    fn log(&self, limit: usize) -> Result<Vec<CommitInfo>, VcsError> {
        let repo = self.open()?;
        match repo.head() {
            Ok(_) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(VcsError::git("get_head", e)),
        }

        let mut walk = repo.revwalk().map_err(|e| VcsError::git("revwalk", e))?;
        walk.push_head().map_err(|e| VcsError::git("push_head", e))?;

        let mut entries = Vec::new();
        for oid in walk.take(limit) {
            let oid = oid.map_err(|e| VcsError::git("revwalk_next", e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| VcsError::git("find_commit", e))?;
            let author = commit.author();
            entries.push(CommitInfo {
                id: CommitId::new(oid.to_string()),
                message: commit.message().unwrap_or("").trim_end().to_string(),
                author: author.name().unwrap_or("").to_string(),
                time: DateTime::from_timestamp(author.when().seconds(), 0).unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_commit_id_short() {
        let id = CommitId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert_eq!(CommitId::new("abc").short(), "abc");
    }

    #[test]
    fn test_uninitialized_repository() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepository::new(temp.path());
        assert!(!repo.is_initialized());
        assert!(matches!(
            repo.add(&["."]).unwrap_err(),
            VcsError::NotInitialized { .. }
        ));
    }

    #[test]
    fn test_init_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepository::new(temp.path());
        repo.init(&InitFlags::default()).unwrap();
        assert!(repo.is_initialized());
        repo.init(&InitFlags::default()).unwrap();
        assert!(repo.log(10).unwrap().is_empty());
    }

    #[test]
    fn test_add_commit_and_log() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepository::new(temp.path());
        repo.init(&InitFlags {
            initial_branch: Some("main".to_string()),
            ..InitFlags::default()
        })
        .unwrap();

        fs::write(temp.path().join("a.json"), "{}").unwrap();
        repo.add(&["."]).unwrap();
        let first = repo.commit("first").unwrap();

        fs::remove_file(temp.path().join("a.json")).unwrap();
        fs::write(temp.path().join("b.json"), "[]").unwrap();
        repo.add(&["."]).unwrap();
        let second = repo.commit("second").unwrap();

        let log = repo.log(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].id, second);
        assert_eq!(log[0].message, "second");
        assert_eq!(log[1].id, first);

        let git = Repository::open(temp.path()).unwrap();
        let tree = git.head().unwrap().peel_to_tree().unwrap();
        assert!(tree.get_name("b.json").is_some());
        assert!(tree.get_name("a.json").is_none());
        assert_eq!(git.head().unwrap().shorthand(), Some("main"));
    }

    #[test]
    fn test_commit_refuses_unchanged_tree() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepository::new(temp.path());
        repo.init(&InitFlags::default()).unwrap();

        repo.add(&["."]).unwrap();
        assert!(matches!(
            repo.commit("empty").unwrap_err(),
            VcsError::NothingToCommit { .. }
        ));

        fs::write(temp.path().join("a.json"), "{}").unwrap();
        repo.add(&["."]).unwrap();
        repo.commit("first").unwrap();

        repo.add(&["."]).unwrap();
        assert!(matches!(
            repo.commit("again").unwrap_err(),
            VcsError::NothingToCommit { .. }
        ));
        assert_eq!(repo.log(10).unwrap().len(), 1);
    }

    #[test]
    fn test_log_respects_limit() {
        let temp = TempDir::new().unwrap();
        let repo = GitRepository::new(temp.path());
        repo.init(&InitFlags::default()).unwrap();
        for i in 0..3 {
            fs::write(temp.path().join("n.txt"), i.to_string()).unwrap();
            repo.add(&["."]).unwrap();
            repo.commit(&format!("rev {}", i)).unwrap();
        }
        let log = repo.log(2).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "rev 2");
    }
}
