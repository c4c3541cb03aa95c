//! # filebase-core
//!
//! A locale-scoped, git-versioned JSON key-value store.
//!
//! Each namespace is one JSON document at `<dest>/<name>.json`, and `dest` is
//! also the root of a git repository. Writes go through a write → stage →
//! commit pipeline whose failures say which phase broke.
//!
//! ## Main Types
//!
//! - [`Filebase`] – the entry point: configuration, document, persistence
//! - [`FilebaseOptions`] – instance options, loadable from YAML
//! - [`FilebaseError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`keys`] – key composition and directory expressions
//! - [`cache`] – lazily resolved configuration properties
//! - [`document`] – the in-memory document
//! - [`persistence`] – the write pipeline
//! - [`repository`] – the version-control collaborator
//!
//! ## Example
//!
//! ```ignore
//! use filebase_core::{Filebase, FilebaseOptions};
//!
//! let mut fb = Filebase::new(FilebaseOptions::load_default()?);
//! fb.init_sync()?;
//! fb.load()?;
//!
//! let key = fb.to_default_key(None)?;
//! fb.set(key, serde_json::json!({"title": "Hello"}));
//! fb.commit_document("save")?;
//! ```

// Modules
pub mod cache;
pub mod config;
pub mod constants;
pub mod document;
pub mod errors;
pub mod filebase;
pub mod keys;
pub mod messages;
pub mod persistence;
pub mod repository;

// Re-exports for convenience
pub use cache::{ConfigCache, ConfigProperty, ResolvedConfig};
pub use config::FilebaseOptions;
pub use document::{DocumentStore, VisitOp};
pub use errors::{FilebaseError, VcsError};
pub use filebase::Filebase;
pub use keys::{compose_key, split_key, split_key_once, unescape_key};
pub use messages::MessageTable;
pub use persistence::{PersistEvent, PersistPhase, WriteOutcome};
pub use repository::{
    git_factory, CommitId, CommitInfo, GitRepository, InitFlags, RepositoryFactory,
    VersionControl,
};
