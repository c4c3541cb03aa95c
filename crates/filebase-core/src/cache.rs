//! Lazily resolved instance configuration.
//!
//! [`ConfigCache`] holds one slot per derived property. A slot is filled the
//! first time its getter runs and is never recomputed afterwards, even if the
//! inputs it was computed from change later. Overridable properties
//! (`cwd`, `dest`, `locale`) have setters that replace the slot; derived
//! properties (`path`, `repo`, `templates`) have none.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::config::FilebaseOptions;
use crate::constants::{DEFAULT_DEST, DEFAULT_LOCALE, DOCUMENT_EXTENSION, TEMPLATES_DIR};
use crate::errors::FilebaseError;
use crate::keys::resolve_dir;
use crate::repository::{git_factory, RepositoryFactory, VersionControl};

// ============================================================================
// ConfigProperty
// ============================================================================

/// The properties managed by [`ConfigCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigProperty {
    /// Working directory used for path keys.
    WorkingDirectory,
    /// Root of the document, repository, and templates.
    DestinationDirectory,
    /// `<dest>/<name>.json`.
    DocumentPath,
    /// Active locale.
    Locale,
    /// Repository handle bound to the destination directory.
    RepositoryHandle,
    /// `<dest>/support/templates`.
    TemplateDirectory,
}

impl ConfigProperty {
    /// All properties, in resolution order.
    pub const ALL: [ConfigProperty; 6] = [
        Self::WorkingDirectory,
        Self::DestinationDirectory,
        Self::DocumentPath,
        Self::Locale,
        Self::RepositoryHandle,
        Self::TemplateDirectory,
    ];

    /// Short name of the property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkingDirectory => "cwd",
            Self::DestinationDirectory => "dest",
            Self::DocumentPath => "path",
            Self::Locale => "locale",
            Self::RepositoryHandle => "repo",
            Self::TemplateDirectory => "templates",
        }
    }

    /// Whether the property is computed from others and cannot be assigned.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Self::DocumentPath | Self::RepositoryHandle | Self::TemplateDirectory
        )
    }
}

impl fmt::Display for ConfigProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigProperty {
    type Err = FilebaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cwd" | "workingDirectory" | "working_directory" => Ok(Self::WorkingDirectory),
            "dest" | "destinationDirectory" | "destination_directory" => {
                Ok(Self::DestinationDirectory)
            }
            "path" | "documentPath" | "document_path" => Ok(Self::DocumentPath),
            "locale" => Ok(Self::Locale),
            "repo" | "repositoryHandle" | "repository_handle" => Ok(Self::RepositoryHandle),
            "templates" | "templateDirectory" | "template_directory" => {
                Ok(Self::TemplateDirectory)
            }
            _ => Err(FilebaseError::UnknownProperty(s.to_string())),
        }
    }
}

// ============================================================================
// ResolvedConfig
// ============================================================================

/// A snapshot of every resolved property, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    /// Resolved working directory.
    pub working_directory: PathBuf,
    /// Resolved destination directory.
    pub destination_directory: PathBuf,
    /// Resolved document path.
    pub document_path: PathBuf,
    /// Active locale.
    pub locale: String,
    /// Resolved template directory.
    pub template_directory: PathBuf,
    /// Whether a repository exists at the destination directory.
    pub repository_initialized: bool,
}

// ============================================================================
// ConfigCache
// ============================================================================

/// Memoized configuration for one filebase instance.
///
/// Getters take `&mut self`: resolution fills a slot, and exclusive access is
/// how the cache stays single-owner.
pub struct ConfigCache {
    options: FilebaseOptions,
    factory: RepositoryFactory,
    cwd: Option<PathBuf>,
    dest: Option<PathBuf>,
    path: Option<PathBuf>,
    locale: Option<String>,
    repo: Option<Box<dyn VersionControl>>,
    templates: Option<PathBuf>,
}

impl fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCache")
            .field("options", &self.options)
            .field("cwd", &self.cwd)
            .field("dest", &self.dest)
            .field("path", &self.path)
            .field("locale", &self.locale)
            .field("repo", &self.repo)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}

impl ConfigCache {
    /// Create an empty cache that binds git repositories.
    pub fn new(options: FilebaseOptions) -> Self {
        Self::with_factory(options, git_factory())
    }

    /// Create an empty cache with a custom repository factory.
    pub fn with_factory(options: FilebaseOptions, factory: RepositoryFactory) -> Self {
        Self {
            options,
            factory,
            cwd: None,
            dest: None,
            path: None,
            locale: None,
            repo: None,
            templates: None,
        }
    }

    /// The options this cache resolves from.
    pub fn options(&self) -> &FilebaseOptions {
        &self.options
    }

    /// Whether `property` has been resolved (or assigned) already.
    pub fn is_cached(&self, property: ConfigProperty) -> bool {
        match property {
            ConfigProperty::WorkingDirectory => self.cwd.is_some(),
            ConfigProperty::DestinationDirectory => self.dest.is_some(),
            ConfigProperty::DocumentPath => self.path.is_some(),
            ConfigProperty::Locale => self.locale.is_some(),
            ConfigProperty::RepositoryHandle => self.repo.is_some(),
            ConfigProperty::TemplateDirectory => self.templates.is_some(),
        }
    }

    // -------------------------------------------------------------------------
    // Overridable properties
    // -------------------------------------------------------------------------

    /// The working directory: `options.cwd`, else the process working directory.
    pub fn cwd(&mut self) -> Result<PathBuf, FilebaseError> {
        if let Some(cwd) = &self.cwd {
            return Ok(cwd.clone());
        }
        let cwd = match &self.options.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        debug!("Resolved cwd: {}", cwd.display());
        Ok(self.cwd.insert(cwd).clone())
    }

    /// Override the working directory.
    pub fn set_cwd(&mut self, cwd: impl Into<PathBuf>) {
        self.cwd = Some(cwd.into());
    }

    /// The destination directory, created on first resolution.
    ///
    /// Resolves `options.dest` (or `~/filebase`) with [`resolve_dir`].
    pub fn dest(&mut self) -> Result<PathBuf, FilebaseError> {
        if let Some(dest) = &self.dest {
            return Ok(dest.clone());
        }
        let expr = self.options.dest.as_deref().unwrap_or(DEFAULT_DEST);
        let dest = ensure_dir(resolve_dir(expr)?)?;
        debug!("Resolved dest: {}", dest.display());
        Ok(self.dest.insert(dest).clone())
    }

    /// Override the destination directory. The directory is not created.
    pub fn set_dest(&mut self, dest: impl Into<PathBuf>) {
        self.dest = Some(dest.into());
    }

    /// The active locale: `options.locale`, else `en`.
    pub fn locale(&mut self) -> String {
        if let Some(locale) = &self.locale {
            return locale.clone();
        }
        let locale = self
            .options
            .locale
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        self.locale.insert(locale).clone()
    }

    /// Override the locale.
    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = Some(locale.into());
    }

    // -------------------------------------------------------------------------
    // Derived properties
    // -------------------------------------------------------------------------

    /// The document path, `<dest>/<name>.json`.
    pub fn path(&mut self) -> Result<PathBuf, FilebaseError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let file_name = format!("{}.{}", self.options.name(), DOCUMENT_EXTENSION);
        let path = self.dest()?.join(file_name);
        debug!("Resolved document path: {}", path.display());
        Ok(self.path.insert(path).clone())
    }

    /// The repository handle bound to the destination directory.
    pub fn repo(&mut self) -> Result<&dyn VersionControl, FilebaseError> {
        let handle = match self.repo.take() {
            Some(handle) => handle,
            None => {
                let dest = self.dest()?;
                debug!("Binding repository handle to {}", dest.display());
                (self.factory)(&dest)
            }
        };
        Ok(&**self.repo.insert(handle))
    }

    /// The template directory, `<dest>/support/templates`.
    ///
    /// The path is cached; the directory is re-created on every call if it
    /// went missing.
    pub fn templates(&mut self) -> Result<PathBuf, FilebaseError> {
        let templates = match &self.templates {
            Some(templates) => templates.clone(),
            None => self.dest()?.join(TEMPLATES_DIR),
        };
        let templates = ensure_dir(templates)?;
        Ok(self.templates.insert(templates).clone())
    }

    // -------------------------------------------------------------------------
    // Dynamic access
    // -------------------------------------------------------------------------

    /// Assign a property by name.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::ImmutableProperty`] for derived properties.
    pub fn set_property(
        &mut self,
        property: ConfigProperty,
        value: &str,
    ) -> Result<(), FilebaseError> {
        match property {
            ConfigProperty::WorkingDirectory => self.set_cwd(value),
            ConfigProperty::DestinationDirectory => self.set_dest(resolve_dir(value)?),
            ConfigProperty::Locale => self.set_locale(value),
            ConfigProperty::DocumentPath
            | ConfigProperty::RepositoryHandle
            | ConfigProperty::TemplateDirectory => {
                return Err(FilebaseError::ImmutableProperty {
                    property: property.as_str().to_string(),
                })
            }
        }
        debug!(property = %property, value, "Property overridden");
        Ok(())
    }

    /// Resolve every property and return a snapshot.
    pub fn resolve_all(&mut self) -> Result<ResolvedConfig, FilebaseError> {
        Ok(ResolvedConfig {
            working_directory: self.cwd()?,
            destination_directory: self.dest()?,
            document_path: self.path()?,
            locale: self.locale(),
            template_directory: self.templates()?,
            repository_initialized: self.repo()?.is_initialized(),
        })
    }
}

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: PathBuf) -> Result<PathBuf, FilebaseError> {
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        debug!("Created directory {}", dir.display());
    }
    Ok(dir)
}

/// Whether `path` is a plain relative path that stays inside its base.
pub(crate) fn is_contained(path: &Path) -> bool {
    use std::path::Component;

    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        && path.components().any(|c| matches!(c, Component::Normal(_)))
}
