//! Write → stage → commit pipeline.
//!
//! A cycle moves through three phases in order and stops at the first
//! failure:
//!
//! ```text
//! Idle -> Writing -> Staging -> Committing -> Idle
//! Writing    -> Failed(Write)    nothing staged or committed
//! Staging    -> Failed(Stage)    file on disk, not in history
//! Committing -> Failed(Commit)   file on disk, not in history
//! ```
//!
//! Nothing is retried here; the error says which phase failed and callers
//! decide whether to stage/commit again.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::constants::STAGE_ALL;
use crate::errors::FilebaseError;
use crate::repository::{CommitId, VersionControl};

/// A phase of the write pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistPhase {
    /// Writing content to disk.
    Writing,
    /// Staging all changes in the repository.
    Staging,
    /// Recording the commit.
    Committing,
}

impl fmt::Display for PersistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Writing => write!(f, "writing"),
            Self::Staging => write!(f, "staging"),
            Self::Committing => write!(f, "committing"),
        }
    }
}

/// Progress notification for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistEvent {
    /// A phase started.
    Entered(PersistPhase),
    /// A phase failed; the run is over.
    Failed(PersistPhase),
    /// All phases succeeded.
    Completed(CommitId),
}

/// Callback receiving [`PersistEvent`]s.
pub type PersistObserver = Box<dyn FnMut(&PersistEvent)>;

/// Result of a successful write-and-commit cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// The new commit.
    pub commit: CommitId,
    /// Message the commit was recorded with.
    pub message: String,
}

/// Write `content` to `path` atomically, creating parent directories.
///
/// The content goes to a temporary file in the same directory, which is then
/// renamed over the target.
pub fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(content)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Run one write → stage → commit cycle.
pub(crate) fn write_and_commit(
    repo: &dyn VersionControl,
    path: &Path,
    content: &[u8],
    message: &str,
    mut notify: impl FnMut(&PersistEvent),
) -> Result<WriteOutcome, FilebaseError> {
    notify(&PersistEvent::Entered(PersistPhase::Writing));
    if let Err(source) = write_atomic(path, content) {
        notify(&PersistEvent::Failed(PersistPhase::Writing));
        return Err(FilebaseError::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    debug!("Wrote {} bytes to {}", content.len(), path.display());

    notify(&PersistEvent::Entered(PersistPhase::Staging));
    if let Err(source) = repo.add(&[STAGE_ALL]) {
        notify(&PersistEvent::Failed(PersistPhase::Staging));
        warn!("{} written but not staged: {}", path.display(), source);
        return Err(FilebaseError::Stage {
            path: path.to_path_buf(),
            source,
        });
    }

    notify(&PersistEvent::Entered(PersistPhase::Committing));
    let commit = match repo.commit(message) {
        Ok(commit) => commit,
        Err(source) => {
            notify(&PersistEvent::Failed(PersistPhase::Committing));
            warn!("{} written but not committed: {}", path.display(), source);
            return Err(FilebaseError::Commit {
                path: path.to_path_buf(),
                message: message.to_string(),
                source,
            });
        }
    };

    info!(commit = %commit.short(), "Committed {}", path.display());
    notify(&PersistEvent::Completed(commit.clone()));
    Ok(WriteOutcome {
        path: path.to_path_buf(),
        commit,
        message: message.to_string(),
    })
}
