//! Instance configuration for filebase.
//!
//! [`FilebaseOptions`] is the immutable input of a [`Filebase`](crate::Filebase)
//! instance. It can be built in code, loaded from a YAML options file
//! (`~/.filebase/config.yaml` by default), and layered with [`FilebaseOptions::merge`].
//!
//! # Example YAML
//!
//! ```yaml
//! dest: ~/notes-store
//! locale: fr
//! name: notes
//! messages:
//!   writeFile: "Update file"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::ConfigProperty;
use crate::constants::{DEFAULT_NAME, FILEBASE_HOME_DIR, OPTIONS_FILENAME};
use crate::errors::FilebaseError;

/// Options recognized by a filebase instance.
///
/// Every field is optional; unset fields fall back to the defaults documented
/// on [`ConfigCache`](crate::cache::ConfigCache).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilebaseOptions {
    /// Working directory override. Defaults to the process working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Destination directory expression (`~` is expanded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    /// Active locale. Defaults to `en`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Namespace; the document is stored as `<dest>/<name>.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Commit message overrides, keyed by reason.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<String, String>,
}

impl FilebaseOptions {
    /// Empty options; every property uses its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory override.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the destination directory expression.
    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the namespace.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a commit message override.
    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }

    /// The namespace, or [`DEFAULT_NAME`].
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Load options from the default location (`~/.filebase/config.yaml`).
    ///
    /// Returns defaults if the home directory or the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::Config`] if the file exists but cannot be parsed.
    pub fn load_default() -> Result<Self, FilebaseError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default options");
                Ok(Self::default())
            }
        }
    }

    /// Load options from a specific YAML file.
    ///
    /// A missing file yields default options.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::Config`] if the file cannot be read, parsed,
    /// or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, FilebaseError> {
        if !path.exists() {
            tracing::debug!("Options file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            FilebaseError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        // An empty file deserializes to `()` in YAML; treat it as no options.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let options: Self = serde_yaml::from_str(&content).map_err(|e| {
            FilebaseError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        for warning in options.validate()? {
            tracing::warn!("Options warning: {}", warning);
        }

        Ok(options)
    }

    /// The user-level filebase directory (`~/.filebase`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(FILEBASE_HOME_DIR))
    }

    /// The default options file path (`~/.filebase/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(OPTIONS_FILENAME))
    }

    /// Write the options as YAML to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), FilebaseError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        tracing::debug!("Wrote options to {}", path.display());
        Ok(())
    }

    /// Store `value` for an overridable property.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::ImmutableProperty`] for derived properties.
    pub fn assign(&mut self, property: ConfigProperty, value: &str) -> Result<(), FilebaseError> {
        match property {
            ConfigProperty::WorkingDirectory => self.cwd = Some(PathBuf::from(value)),
            ConfigProperty::DestinationDirectory => self.dest = Some(value.to_string()),
            ConfigProperty::Locale => self.locale = Some(value.to_string()),
            ConfigProperty::DocumentPath
            | ConfigProperty::RepositoryHandle
            | ConfigProperty::TemplateDirectory => {
                return Err(FilebaseError::ImmutableProperty {
                    property: property.as_str().to_string(),
                })
            }
        }
        Ok(())
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Fields set in `overrides` win; message tables are merged key by key.
    pub fn merge(mut self, overrides: FilebaseOptions) -> Self {
        if overrides.cwd.is_some() {
            self.cwd = overrides.cwd;
        }
        if overrides.dest.is_some() {
            self.dest = overrides.dest;
        }
        if overrides.locale.is_some() {
            self.locale = overrides.locale;
        }
        if overrides.name.is_some() {
            self.name = overrides.name;
        }
        self.messages.extend(overrides.messages);
        self
    }

    /// Validate the options, returning non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::Config`] if the name is empty or contains a
    /// path separator, or if the locale is empty.
    pub fn validate(&self) -> Result<Vec<String>, FilebaseError> {
        let mut warnings = Vec::new();

        if let Some(name) = &self.name {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                return Err(FilebaseError::Config(format!(
                    "name `{}` must be a non-empty file stem without path separators",
                    name
                )));
            }
        }

        if matches!(self.locale.as_deref(), Some("")) {
            return Err(FilebaseError::Config("locale must not be empty".to_string()));
        }

        if let Some(dest) = &self.dest {
            if !dest.starts_with('~') && Path::new(dest).is_relative() {
                warnings.push(format!(
                    "dest `{}` is relative and will be resolved against the process working directory",
                    dest
                ));
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_options_default() {
        let options = FilebaseOptions::default();
        assert!(options.dest.is_none());
        assert_eq!(options.name(), DEFAULT_NAME);
    }

    #[test]
    fn test_options_from_yaml() {
        let yaml = r#"
dest: ~/store
locale: fr
name: notes
messages:
  writeFile: Update file
"#;
        let options: FilebaseOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(options.dest.as_deref(), Some("~/store"));
        assert_eq!(options.locale.as_deref(), Some("fr"));
        assert_eq!(options.name(), "notes");
        assert_eq!(options.messages["writeFile"], "Update file");
    }

    #[test]
    fn test_options_missing_file() {
        let temp = TempDir::new().unwrap();
        let options = FilebaseOptions::from_path(&temp.path().join("nope.yaml")).unwrap();
        assert_eq!(options, FilebaseOptions::default());
    }

    #[test]
    fn test_options_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "").unwrap();
        assert_eq!(FilebaseOptions::from_path(&path).unwrap(), FilebaseOptions::default());
    }

    #[test]
    fn test_options_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "dest: [unclosed").unwrap();
        let err = FilebaseOptions::from_path(&path).unwrap_err();
        assert!(matches!(err, FilebaseError::Config(_)));
    }

    #[test]
    fn test_options_invalid_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "name: ../escape").unwrap();
        assert!(matches!(
            FilebaseOptions::from_path(&path).unwrap_err(),
            FilebaseError::Config(_)
        ));
    }

    #[test]
    fn test_validate_warns_on_relative_dest() {
        let options = FilebaseOptions::new().with_dest("relative/store");
        let warnings = options.validate().unwrap();
        assert_eq!(warnings.len(), 1);

        let options = FilebaseOptions::new().with_dest("~/store");
        assert!(options.validate().unwrap().is_empty());
    }

    #[test]
    fn test_save_to_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.yaml");
        let mut options = FilebaseOptions::new().with_name("notes");
        options
            .assign(ConfigProperty::Locale, "fr")
            .unwrap();
        options.save_to(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("cwd"));
        assert_eq!(FilebaseOptions::from_path(&path).unwrap(), options);
    }

    #[test]
    fn test_assign_rejects_derived_properties() {
        let mut options = FilebaseOptions::new();
        assert!(matches!(
            options.assign(ConfigProperty::TemplateDirectory, "/t").unwrap_err(),
            FilebaseError::ImmutableProperty { .. }
        ));
        options.assign(ConfigProperty::DestinationDirectory, "~/x").unwrap();
        assert_eq!(options.dest.as_deref(), Some("~/x"));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = FilebaseOptions::new()
            .with_dest("~/a")
            .with_locale("de")
            .with_message("writeFile", "base");
        let merged = base.merge(
            FilebaseOptions::new()
                .with_dest("/b")
                .with_message("save", "saved"),
        );
        assert_eq!(merged.dest.as_deref(), Some("/b"));
        assert_eq!(merged.locale.as_deref(), Some("de"));
        assert_eq!(merged.messages["writeFile"], "base");
        assert_eq!(merged.messages["save"], "saved");
    }
}
