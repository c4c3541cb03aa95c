//! The [`Filebase`] facade.
//!
//! One instance owns a configuration cache, the in-memory document of its
//! namespace, and the commit message table. Mutations stay in memory until
//! [`Filebase::save`] or [`Filebase::commit_document`] is called.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{is_contained, ConfigCache, ConfigProperty, ResolvedConfig};
use crate::config::FilebaseOptions;
use crate::constants::{DEFAULT_KEY_SUFFIX, STAGE_ALL};
use crate::document::{DocumentStore, VisitOp};
use crate::errors::FilebaseError;
use crate::keys::compose_key;
use crate::messages::MessageTable;
use crate::persistence::{
    write_and_commit, write_atomic, PersistEvent, PersistObserver, WriteOutcome,
};
use crate::repository::{CommitId, CommitInfo, InitFlags, RepositoryFactory, VersionControl};

// ============================================================================
// Filebase
// ============================================================================

/// A locale-scoped, git-versioned JSON document.
///
/// # Example
///
/// ```no_run
/// use filebase_core::{Filebase, FilebaseOptions};
///
/// let mut fb = Filebase::new(FilebaseOptions::new().with_dest("~/notes"));
/// fb.init_sync()?;
///
/// let key = fb.to_path_key(None)?;
/// fb.set(key, "remember the milk");
/// let outcome = fb.commit_document("save")?;
/// println!("{}", outcome.commit.short());
/// # Ok::<(), filebase_core::FilebaseError>(())
/// ```
pub struct Filebase {
    config: ConfigCache,
    store: DocumentStore,
    messages: MessageTable,
    observer: Option<PersistObserver>,
}

impl fmt::Debug for Filebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filebase")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("messages", &self.messages)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Filebase {
    /// Create an instance backed by git repositories.
    pub fn new(options: FilebaseOptions) -> Self {
        let messages = Self::message_table(&options);
        Self {
            config: ConfigCache::new(options),
            store: DocumentStore::new(),
            messages,
            observer: None,
        }
    }

    /// Create an instance whose repository handle comes from `factory`.
    pub fn with_repository_factory(options: FilebaseOptions, factory: RepositoryFactory) -> Self {
        let messages = Self::message_table(&options);
        Self {
            config: ConfigCache::with_factory(options, factory),
            store: DocumentStore::new(),
            messages,
            observer: None,
        }
    }

    fn message_table(options: &FilebaseOptions) -> MessageTable {
        let mut messages = MessageTable::default();
        messages.extend(options.messages.clone());
        messages
    }

    /// Receive a [`PersistEvent`] for every pipeline phase. Replaces any
    /// previous observer.
    pub fn observe(&mut self, callback: impl FnMut(&PersistEvent) + 'static) -> &mut Self {
        self.observer = Some(Box::new(callback));
        self
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// The configuration cache.
    pub fn config(&self) -> &ConfigCache {
        &self.config
    }

    /// Working directory used by [`to_path_key`](Self::to_path_key).
    pub fn cwd(&mut self) -> Result<PathBuf, FilebaseError> {
        self.config.cwd()
    }

    /// Override the working directory.
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) -> &mut Self {
        self.config.set_cwd(cwd);
        self
    }

    /// Destination directory, created if missing.
    pub fn dest(&mut self) -> Result<PathBuf, FilebaseError> {
        self.config.dest()
    }

    /// Override the destination directory.
    pub fn set_dest(&mut self, dest: impl Into<PathBuf>) -> &mut Self {
        self.config.set_dest(dest);
        self
    }

    /// Path of the persisted document.
    pub fn path(&mut self) -> Result<PathBuf, FilebaseError> {
        self.config.path()
    }

    /// Active locale.
    pub fn locale(&mut self) -> String {
        self.config.locale()
    }

    /// Override the active locale.
    pub fn set_locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.config.set_locale(locale);
        self
    }

    /// Repository handle bound to the destination directory.
    pub fn repo(&mut self) -> Result<&dyn VersionControl, FilebaseError> {
        self.config.repo()
    }

    /// Template directory, created if missing.
    pub fn templates(&mut self) -> Result<PathBuf, FilebaseError> {
        self.config.templates()
    }

    /// Assign a configuration property by name (`cwd`, `dest`, `locale`).
    ///
    /// # Errors
    ///
    /// [`FilebaseError::UnknownProperty`] for unrecognized names and
    /// [`FilebaseError::ImmutableProperty`] for `path`, `repo` and `templates`.
    pub fn set_property(&mut self, name: &str, value: &str) -> Result<(), FilebaseError> {
        let property: ConfigProperty = name.parse()?;
        self.config.set_property(property, value)
    }

    /// Resolve every property.
    pub fn resolved_config(&mut self) -> Result<ResolvedConfig, FilebaseError> {
        self.config.resolve_all()
    }

    // -------------------------------------------------------------------------
    // Keys
    // -------------------------------------------------------------------------

    /// `<locale>.default`, using the active locale when `locale` is `None`.
    pub fn to_default_key(&mut self, locale: Option<&str>) -> Result<String, FilebaseError> {
        let locale = self.locale_or_active(locale);
        compose_key(&locale, Some(DEFAULT_KEY_SUFFIX))
    }

    /// `<locale>.<cwd>`, using the active locale when `locale` is `None`.
    pub fn to_path_key(&mut self, locale: Option<&str>) -> Result<String, FilebaseError> {
        let locale = self.locale_or_active(locale);
        let cwd = self.cwd()?;
        compose_key(&locale, Some(&cwd.to_string_lossy()))
    }

    fn locale_or_active(&mut self, locale: Option<&str>) -> String {
        match locale {
            Some(locale) => locale.to_string(),
            None => self.locale(),
        }
    }

    // -------------------------------------------------------------------------
    // Document
    // -------------------------------------------------------------------------

    /// The in-memory document.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Mutable access to the in-memory document.
    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    /// Insert or replace `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.store.set(key, value);
        self
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }

    /// Remove `key`, if present.
    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.store.delete(key);
        self
    }

    /// Apply `op` across a bulk input. See [`DocumentStore::visit`].
    pub fn visit(&mut self, op: VisitOp, input: Value) -> Result<&mut Self, FilebaseError> {
        self.store.visit(op, input)?;
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    /// Override the commit message for `key`.
    pub fn message(&mut self, key: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.messages.set(key, text);
        self
    }

    /// The commit message table.
    pub fn messages(&self) -> &MessageTable {
        &self.messages
    }

    // -------------------------------------------------------------------------
    // Repository
    // -------------------------------------------------------------------------

    /// Initialize the repository at the destination directory.
    ///
    /// Does nothing if one already exists.
    pub fn init_repository(&mut self, flags: &InitFlags) -> Result<(), FilebaseError> {
        self.config.repo()?.init(flags)?;
        Ok(())
    }

    /// [`init_repository`](Self::init_repository) with default flags.
    pub fn init_sync(&mut self) -> Result<(), FilebaseError> {
        self.init_repository(&InitFlags::default())
    }

    /// Stage paths matching `patterns`.
    pub fn add(&mut self, patterns: &[&str]) -> Result<(), FilebaseError> {
        self.config.repo()?.add(patterns)?;
        Ok(())
    }

    /// Stage everything and commit with the message for `reason`.
    pub fn commit(&mut self, reason: &str) -> Result<CommitId, FilebaseError> {
        let message = self.messages.resolve(reason).to_string();
        let repo = self.config.repo()?;
        repo.add(&[STAGE_ALL])?;
        Ok(repo.commit(&message)?)
    }

    /// Recent commits, newest first.
    pub fn history(&mut self, limit: usize) -> Result<Vec<CommitInfo>, FilebaseError> {
        Ok(self.config.repo()?.log(limit)?)
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write `content` to `<dest>/<relative>`, stage everything, and commit
    /// with the message for `reason`.
    ///
    /// # Errors
    ///
    /// [`FilebaseError::InvalidArgument`] if `relative` is absolute or leaves
    /// the destination directory. Otherwise the first failing phase, as
    /// [`FilebaseError::Write`], [`FilebaseError::Stage`] or
    /// [`FilebaseError::Commit`].
    pub fn write_file(
        &mut self,
        relative: impl AsRef<Path>,
        content: impl AsRef<[u8]>,
        reason: &str,
    ) -> Result<WriteOutcome, FilebaseError> {
        let target = self.resolve_in_dest(relative.as_ref())?;
        self.persist(&target, content.as_ref(), reason)
    }

    /// Read `<dest>/<relative>` as UTF-8.
    pub fn read_file(&mut self, relative: impl AsRef<Path>) -> Result<String, FilebaseError> {
        let target = self.resolve_in_dest(relative.as_ref())?;
        Ok(fs::read_to_string(target)?)
    }

    /// Serialize the document to [`path`](Self::path), without committing.
    pub fn save(&mut self) -> Result<PathBuf, FilebaseError> {
        let path = self.path()?;
        let content = self.serialized_document()?;
        write_atomic(&path, content.as_bytes()).map_err(|source| FilebaseError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Saved {} entries to {}", self.store.len(), path.display());
        Ok(path)
    }

    /// Serialize the document to [`path`](Self::path) and commit it.
    pub fn commit_document(&mut self, reason: &str) -> Result<WriteOutcome, FilebaseError> {
        let path = self.path()?;
        let content = self.serialized_document()?;
        self.persist(&path, content.as_bytes(), reason)
    }

    /// Replace the in-memory document with the persisted one.
    ///
    /// Returns `false`, leaving the document untouched, if nothing has been
    /// persisted yet.
    pub fn load(&mut self) -> Result<bool, FilebaseError> {
        let path = self.path()?;
        if !path.exists() {
            debug!("No document at {}", path.display());
            return Ok(false);
        }
        let content = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&content)?;
        self.store = DocumentStore::from_value(value)?;
        debug!("Loaded {} entries from {}", self.store.len(), path.display());
        Ok(true)
    }

    fn serialized_document(&self) -> Result<String, FilebaseError> {
        let mut content = serde_json::to_string_pretty(self.store.as_map())?;
        content.push('\n');
        Ok(content)
    }

    fn resolve_in_dest(&mut self, relative: &Path) -> Result<PathBuf, FilebaseError> {
        if !is_contained(relative) {
            return Err(FilebaseError::InvalidArgument(format!(
                "`{}` must be a relative path inside the destination directory",
                relative.display()
            )));
        }
        Ok(self.dest()?.join(relative))
    }

    fn persist(
        &mut self,
        target: &Path,
        content: &[u8],
        reason: &str,
    ) -> Result<WriteOutcome, FilebaseError> {
        let message = self.messages.resolve(reason).to_string();
        let repo = self.config.repo()?;
        let observer = &mut self.observer;
        write_and_commit(repo, target, content, &message, |event| {
            if let Some(callback) = observer.as_mut() {
                callback(event);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn filebase_in(temp: &TempDir) -> Filebase {
        Filebase::new(FilebaseOptions::new().with_dest(temp.path().display().to_string()))
    }

    #[test]
    fn test_path_key_uses_locale_and_cwd() {
        let mut fb = Filebase::new(FilebaseOptions::new().with_cwd("/home/u"));
        assert_eq!(fb.to_path_key(None).unwrap(), "en./home/u");
        assert_eq!(
            fb.to_path_key(None).unwrap(),
            compose_key("en", Some("/home/u")).unwrap()
        );
        assert_eq!(fb.to_path_key(Some("en.GB")).unwrap(), "en\\.GB./home/u");
    }

    #[test]
    fn test_default_key() {
        let mut fb = Filebase::new(FilebaseOptions::new().with_locale("fr"));
        assert_eq!(fb.to_default_key(None).unwrap(), "fr.default");
        assert_eq!(fb.to_default_key(Some("de")).unwrap(), "de.default");
        assert!(fb.to_default_key(Some("")).is_err());
    }

    #[test]
    fn test_crud_is_chainable() {
        let mut fb = Filebase::new(FilebaseOptions::new());
        fb.set("a", 1).set("b", "two").delete("a").delete("missing");
        assert!(!fb.has("a"));
        assert_eq!(fb.get("b"), Some(&json!("two")));
    }

    #[test]
    fn test_set_property_by_name() {
        let mut fb = Filebase::new(FilebaseOptions::new());
        fb.set_property("locale", "it").unwrap();
        assert_eq!(fb.locale(), "it");
        assert!(matches!(
            fb.set_property("path", "/x").unwrap_err(),
            FilebaseError::ImmutableProperty { .. }
        ));
        assert!(matches!(
            fb.set_property("colour", "red").unwrap_err(),
            FilebaseError::UnknownProperty(_)
        ));
    }

    #[test]
    fn test_messages_from_options_and_override() {
        let mut fb = Filebase::new(FilebaseOptions::new().with_message("save", "Snapshot"));
        assert_eq!(fb.messages().resolve("save"), "Snapshot");
        assert_eq!(fb.messages().resolve("writeFile"), "Wrote file");
        fb.message("writeFile", "Update file");
        assert_eq!(fb.messages().resolve("writeFile"), "Update file");
    }

    #[test]
    fn test_write_file_rejects_escaping_paths() {
        let temp = TempDir::new().unwrap();
        let mut fb = filebase_in(&temp);
        for name in ["../outside.json", "/etc/passwd", ""] {
            let err = fb.write_file(name, "{}", "writeFile").unwrap_err();
            assert!(matches!(err, FilebaseError::InvalidArgument(_)), "{name}");
        }
        assert!(!temp.path().join("../outside.json").exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut fb = filebase_in(&temp);
        fb.set("a.b", 1).set("list", json!([1, 2]));
        let path = fb.save().unwrap();
        assert_eq!(path, temp.path().join("filebase.json"));

        let mut other = filebase_in(&temp);
        assert!(other.load().unwrap());
        assert_eq!(other.store(), fb.store());
    }

    #[test]
    fn test_load_without_document() {
        let temp = TempDir::new().unwrap();
        let mut fb = filebase_in(&temp);
        fb.set("kept", true);
        assert!(!fb.load().unwrap());
        assert!(fb.has("kept"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("filebase.json"), "[1, 2]").unwrap();
        let mut fb = filebase_in(&temp);
        assert!(matches!(
            fb.load().unwrap_err(),
            FilebaseError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_read_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), "hello").unwrap();
        let mut fb = filebase_in(&temp);
        assert_eq!(fb.read_file("notes.txt").unwrap(), "hello");
        assert!(fb.read_file("../notes.txt").is_err());
    }
}
