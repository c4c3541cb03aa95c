//! Error types for filebase-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::persistence::PersistPhase;

/// Domain-specific errors for filebase operations.
#[derive(Error, Debug)]
pub enum FilebaseError {
    /// Malformed input, e.g. an empty key prefix or an escaping file name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempt to assign a configuration property that is derived from others.
    #[error("`{property}` is derived from the destination directory and cannot be set.")]
    ImmutableProperty {
        /// Name of the rejected property.
        property: String,
    },

    /// An unknown configuration property name was given.
    #[error("Unknown configuration property `{0}`.")]
    UnknownProperty(String),

    // =========================================================================
    // Write pipeline errors
    // =========================================================================
    /// Writing the file failed. Nothing was staged or committed.
    #[error("Failed to write `{path}`: {source}")]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Staging failed after the file was written.
    ///
    /// The new content is on disk but not recorded in history.
    #[error("Wrote `{path}` but failed to stage it: {source}")]
    Stage {
        /// File that was written.
        path: PathBuf,
        /// Underlying repository failure.
        #[source]
        source: VcsError,
    },

    /// Committing failed after the file was written and staged.
    ///
    /// The new content is on disk but not recorded in history.
    #[error("Wrote `{path}` but failed to commit (\"{message}\"): {source}")]
    Commit {
        /// File that was written.
        path: PathBuf,
        /// Message that was going to be used.
        message: String,
        /// Underlying repository failure.
        #[source]
        source: VcsError,
    },

    // =========================================================================
    // Collaborator and ambient errors
    // =========================================================================
    /// A repository operation outside the write pipeline failed.
    #[error(transparent)]
    Repository(#[from] VcsError),

    /// The options file exists but could not be read or parsed.
    #[error("Options file invalid: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FilebaseError {
    /// The pipeline phase that failed, if this is a write pipeline error.
    pub fn phase(&self) -> Option<PersistPhase> {
        match self {
            Self::Write { .. } => Some(PersistPhase::Writing),
            Self::Stage { .. } => Some(PersistPhase::Staging),
            Self::Commit { .. } => Some(PersistPhase::Committing),
            _ => None,
        }
    }

    /// True when the content reached disk but not version control.
    pub fn is_durable(&self) -> bool {
        matches!(self, Self::Stage { .. } | Self::Commit { .. })
    }
}

/// Errors reported by a version-control collaborator.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VcsError {
    /// No repository exists at the bound directory.
    #[error("No repository at '{path}'. Run `filebase init` first.")]
    NotInitialized {
        /// The directory the handle is bound to.
        path: PathBuf,
    },

    /// The staged tree is identical to HEAD.
    #[error("Nothing to commit in '{path}'")]
    NothingToCommit {
        /// The directory the handle is bound to.
        path: PathBuf,
    },

    /// A git2 call failed.
    #[error("git operation '{operation}' failed: {source}")]
    Git {
        /// Name of the failing operation.
        operation: String,
        /// The git2 error.
        #[source]
        source: git2::Error,
    },

    /// Any other collaborator failure.
    #[error("{operation}: {message}")]
    Failed {
        /// Name of the failing operation.
        operation: String,
        /// Description of the failure.
        message: String,
    },
}

impl VcsError {
    /// Wrap a git2 error with the operation it came from.
    pub fn git(operation: &str, source: git2::Error) -> Self {
        Self::Git {
            operation: operation.to_string(),
            source,
        }
    }

    /// Build a generic failure for custom collaborators.
    pub fn failed(operation: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_tags() {
        let write = FilebaseError::Write {
            path: PathBuf::from("a.json"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(write.phase(), Some(PersistPhase::Writing));
        assert!(!write.is_durable());

        let stage = FilebaseError::Stage {
            path: PathBuf::from("a.json"),
            source: VcsError::failed("add", "index locked"),
        };
        assert_eq!(stage.phase(), Some(PersistPhase::Staging));
        assert!(stage.is_durable());

        let commit = FilebaseError::Commit {
            path: PathBuf::from("a.json"),
            message: "Wrote file".to_string(),
            source: VcsError::failed("commit", "no signature"),
        };
        assert_eq!(commit.phase(), Some(PersistPhase::Committing));
        assert!(commit.is_durable());

        assert_eq!(FilebaseError::InvalidArgument("x".into()).phase(), None);
    }

    #[test]
    fn test_immutable_property_message_names_property() {
        let err = FilebaseError::ImmutableProperty {
            property: "path".to_string(),
        };
        assert!(err.to_string().contains("`path`"));
    }
}
