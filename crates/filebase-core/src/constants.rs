//! Common constants used throughout filebase-core.
//!
//! This module centralizes default paths, names, and message keys to avoid
//! duplication across the configuration, store, and persistence layers.

// ============================================================================
// Defaults
// ============================================================================

/// Destination directory used when the options do not name one.
pub const DEFAULT_DEST: &str = "~/filebase";

/// Locale used when the options do not name one.
pub const DEFAULT_LOCALE: &str = "en";

/// Namespace used when the options do not name one.
///
/// The document lives at `<dest>/<name>.json`.
pub const DEFAULT_NAME: &str = "filebase";

/// Field suffix of the per-locale default key (`<locale>.default`).
pub const DEFAULT_KEY_SUFFIX: &str = "default";

/// Extension of the persisted document.
pub const DOCUMENT_EXTENSION: &str = "json";

// ============================================================================
// Directory Names
// ============================================================================

/// Template directory, relative to the destination directory.
pub const TEMPLATES_DIR: &str = "support/templates";

/// The name of the user-level filebase directory (`~/.filebase`).
pub const FILEBASE_HOME_DIR: &str = ".filebase";

/// File name of the options file inside [`FILEBASE_HOME_DIR`].
pub const OPTIONS_FILENAME: &str = "config.yaml";

// ============================================================================
// Version Control
// ============================================================================

/// Pathspec that stages everything under the repository root.
pub const STAGE_ALL: &str = ".";

/// Reason key used by `write_file`.
pub const REASON_WRITE_FILE: &str = "writeFile";

/// Reason key used when persisting the document itself.
pub const REASON_SAVE: &str = "save";

/// Reason key used by a bare `commit`.
pub const REASON_COMMIT: &str = "commit";

/// Author name used when the repository has no configured identity.
pub const FALLBACK_AUTHOR_NAME: &str = "filebase";

/// Author email used when the repository has no configured identity.
pub const FALLBACK_AUTHOR_EMAIL: &str = "filebase@localhost";
