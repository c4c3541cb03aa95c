//! CLI definition and command dispatch for filebase.
//!
//! ## Configuration Precedence
//!
//! Options are resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--dest`, `--locale`)
//! 2. Environment variables (`FILEBASE_DEST`, `FILEBASE_LOCALE`, ...)
//! 3. Options file (`~/.filebase/config.yaml` or path from `--config`/`FILEBASE_CONFIG`)
//! 4. Built-in defaults

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::ui::{ColorMode, MessageType, Style};

use filebase_core::{
    ConfigProperty, Filebase, FilebaseError, FilebaseOptions, InitFlags, VcsError,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Default number of commits shown by `filebase log`.
const DEFAULT_LOG_LIMIT: usize = 10;

/// Filebase – locale-scoped, git-versioned JSON key-value store
#[derive(Parser, Debug)]
#[command(name = "filebase")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "FILEBASE_VERBOSE")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true, env = "FILEBASE_QUIET")]
    pub quiet: bool,

    /// Path to the options file (default: ~/.filebase/config.yaml)
    #[arg(long, global = true, env = "FILEBASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Destination directory holding the document and its repository
    #[arg(long, global = true, env = "FILEBASE_DEST")]
    pub dest: Option<String>,

    /// Working directory used for path keys
    #[arg(long, global = true, env = "FILEBASE_CWD")]
    pub cwd: Option<PathBuf>,

    /// Active locale (default: en)
    #[arg(long, global = true, env = "FILEBASE_LOCALE")]
    pub locale: Option<String>,

    /// Namespace; the document is stored as <dest>/<name>.json
    #[arg(long, global = true, env = "FILEBASE_NAME")]
    pub name: Option<String>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "FILEBASE_COLOR", default_value = "auto")]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the repository in the destination directory
    #[command(after_help = r#"EXAMPLES:
    # Initialize the default store (~/filebase)
    filebase init

    # Initialize a store elsewhere, on branch main
    filebase --dest ./store init --branch main
"#)]
    Init {
        /// Create a bare repository
        #[arg(long)]
        bare: bool,

        /// Name of the initial branch
        #[arg(long, value_name = "NAME")]
        branch: Option<String>,
    },

    /// Set a key and commit the document
    #[command(after_help = r#"EXAMPLES:
    # Store a string (values that are not JSON are stored as strings)
    filebase set greeting hello

    # Store JSON
    filebase set limits '{"max": 10}'

    # Store under a nested path
    filebase set --path en.default.title "Hello"

    # Update the document without committing
    filebase set draft true --no-commit
"#)]
    Set {
        /// Key to set
        key: String,

        /// Value, parsed as JSON when possible
        value: String,

        /// Treat the key as a dotted path into nested objects
        #[arg(long)]
        path: bool,

        /// Only save the document, do not stage or commit
        #[arg(long)]
        no_commit: bool,

        /// Commit message key (or literal message)
        #[arg(long, default_value = "save")]
        reason: String,
    },

    /// Print the value stored under a key
    #[command(after_help = r#"EXAMPLES:
    filebase get greeting
    filebase get --path en.default.title
    filebase get limits --json
"#)]
    Get {
        /// Key to read
        key: String,

        /// Treat the key as a dotted path into nested objects
        #[arg(long)]
        path: bool,

        /// Print the value as pretty JSON
        #[arg(long)]
        json: bool,
    },

    /// Print whether a key is present
    Has {
        /// Key to check
        key: String,

        /// Treat the key as a dotted path into nested objects
        #[arg(long)]
        path: bool,
    },

    /// Delete a key and commit the document
    #[command(name = "rm")]
    Rm {
        /// Key to delete
        key: String,

        /// Treat the key as a dotted path into nested objects
        #[arg(long)]
        path: bool,

        /// Only save the document, do not stage or commit
        #[arg(long)]
        no_commit: bool,

        /// Commit message key (or literal message)
        #[arg(long, default_value = "save")]
        reason: String,
    },

    /// List the top-level keys of the document
    Keys {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Write a file inside the destination directory and commit it
    #[command(after_help = r#"EXAMPLES:
    # Write literal content
    filebase write notes/todo.md --content "- buy milk"

    # Write from stdin
    cat report.json | filebase write reports/latest.json
"#)]
    Write {
        /// File name relative to the destination directory
        file: PathBuf,

        /// Content to write (read from stdin when omitted)
        #[arg(long)]
        content: Option<String>,

        /// Commit message key (or literal message)
        #[arg(long, default_value = "writeFile")]
        reason: String,
    },

    /// Stage everything in the destination directory and commit
    Commit {
        /// Commit message key (or literal message)
        #[arg(short, long, default_value = "commit")]
        reason: String,
    },

    /// Show recent commits
    Log {
        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: usize,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print a composed key for the active locale
    #[command(after_help = r#"EXAMPLES:
    # <locale>.<cwd>
    filebase key

    # <locale>.default for French
    filebase key --default --locale fr
"#)]
    Key {
        /// Print the default key instead of the working-directory key
        #[arg(long)]
        default: bool,
    },

    /// Inspect or change options
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show every resolved property
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Store an overridable property (cwd, dest, locale) in the options file
    Set {
        /// Property name
        property: String,

        /// New value
        value: String,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Returns `ExitCode::SUCCESS` on success, or `ExitCode::FAILURE` on error.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always; debug only with --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("filebase_core={},filebase_cli={}", log_level, log_level);

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color).with_quiet(cli.quiet);

    let file_options = match load_file_options(&cli) {
        Ok(options) => options,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your options at {}", path.display()),
                None => "Check your options at ~/.filebase/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context("Failed to load options", Some(&e.to_string()), Some(&hint))
            );
            return ExitCode::FAILURE;
        }
    };

    let options = file_options.clone().merge(cli_overrides(&cli));
    match options.validate() {
        Ok(warnings) => {
            for warning in warnings {
                eprintln!("{}", style.message(MessageType::Warn, &warning));
            }
        }
        Err(e) => {
            eprintln!("{}", style.message(MessageType::Err, &e.to_string()));
            return ExitCode::FAILURE;
        }
    }

    tracing::debug!(?options, "Resolved options");
    let mut fb = Filebase::new(options);

    let result = match cli.command {
        Command::Init { bare, branch } => handle_init(&style, &mut fb, bare, branch),
        Command::Set {
            key,
            value,
            path,
            no_commit,
            reason,
        } => handle_set(&style, &mut fb, key, &value, path, no_commit, &reason),
        Command::Get { key, path, json } => handle_get(&mut fb, &key, path, json),
        Command::Has { key, path } => handle_has(&mut fb, &key, path),
        Command::Rm {
            key,
            path,
            no_commit,
            reason,
        } => handle_rm(&style, &mut fb, &key, path, no_commit, &reason),
        Command::Keys { json } => handle_keys(&mut fb, json),
        Command::Write {
            file,
            content,
            reason,
        } => handle_write(&style, &mut fb, file, content, &reason),
        Command::Commit { reason } => handle_commit(&style, &mut fb, &reason),
        Command::Log { limit, json } => handle_log(&style, &mut fb, limit, json),
        Command::Key { default } => handle_key(&mut fb, default),
        Command::Config { action } => match action {
            ConfigAction::Show { json } => handle_config_show(&style, &mut fb, json),
            ConfigAction::Set { property, value } => {
                handle_config_set(&style, &cli.config, file_options, &property, &value)
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&style, &e);
            ExitCode::FAILURE
        }
    }
}

fn load_file_options(cli: &Cli) -> Result<FilebaseOptions, FilebaseError> {
    match &cli.config {
        Some(path) => FilebaseOptions::from_path(path),
        None => FilebaseOptions::load_default(),
    }
}

fn cli_overrides(cli: &Cli) -> FilebaseOptions {
    FilebaseOptions {
        cwd: cli.cwd.clone(),
        dest: cli.dest.clone(),
        locale: cli.locale.clone(),
        name: cli.name.clone(),
        ..FilebaseOptions::default()
    }
}

fn report_error(style: &Style, error: &FilebaseError) {
    let message = error.to_string();
    if error.is_durable() {
        eprintln!(
            "{}",
            style.error_with_context(
                &message,
                None,
                Some("The file is on disk; run `filebase commit` to record it"),
            )
        );
    } else if matches!(
        error,
        FilebaseError::Repository(VcsError::NotInitialized { .. })
    ) {
        eprintln!(
            "{}",
            style.error_with_context(&message, None, Some("Run `filebase init` first"))
        );
    } else {
        eprintln!("{}", style.message(MessageType::Err, &message));
    }
}

/// Parse a CLI value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a value for plain output: strings unquoted, everything else as JSON.
fn render_value(value: &Value, pretty: bool) -> Result<String, FilebaseError> {
    match value {
        Value::String(s) if !pretty => Ok(s.clone()),
        _ if pretty => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(serde_json::to_string(value)?),
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_init(
    style: &Style,
    fb: &mut Filebase,
    bare: bool,
    branch: Option<String>,
) -> Result<(), FilebaseError> {
    let dest = fb.dest()?;
    if fb.repo()?.is_initialized() {
        style.print(
            MessageType::Info,
            &format!(
                "Repository already initialized at {}",
                style.file_path(&dest.display().to_string())
            ),
        );
        return Ok(());
    }

    fb.init_repository(&InitFlags {
        bare,
        initial_branch: branch,
    })?;
    style.print(
        MessageType::Ok,
        &format!(
            "Initialized filebase repository at {}",
            style.file_path(&dest.display().to_string())
        ),
    );
    style.print(MessageType::Hint, "Next: filebase set <key> <value>");
    Ok(())
}

/// Save or commit the document after a mutation.
fn persist(
    style: &Style,
    fb: &mut Filebase,
    no_commit: bool,
    reason: &str,
) -> Result<(), FilebaseError> {
    if no_commit {
        let path = fb.save()?;
        style.print(
            MessageType::Ok,
            &format!("Saved {}", style.file_path(&path.display().to_string())),
        );
    } else {
        let outcome = fb.commit_document(reason)?;
        style.print(
            MessageType::Ok,
            &format!(
                "{} {}",
                style.revision(outcome.commit.as_str()),
                outcome.message
            ),
        );
    }
    Ok(())
}

fn handle_set(
    style: &Style,
    fb: &mut Filebase,
    key: String,
    raw: &str,
    path: bool,
    no_commit: bool,
    reason: &str,
) -> Result<(), FilebaseError> {
    fb.load()?;
    let value = parse_value(raw);
    if path {
        fb.store_mut().set_path(&key, value)?;
    } else {
        fb.set(key, value);
    }
    persist(style, fb, no_commit, reason)
}

fn handle_get(fb: &mut Filebase, key: &str, path: bool, json: bool) -> Result<(), FilebaseError> {
    fb.load()?;
    let value = if path {
        fb.store().get_path(key)
    } else {
        fb.get(key)
    };
    match value {
        Some(value) => {
            println!("{}", render_value(value, json)?);
            Ok(())
        }
        None => Err(FilebaseError::InvalidArgument(format!(
            "no value stored under `{}`",
            key
        ))),
    }
}

fn handle_has(fb: &mut Filebase, key: &str, path: bool) -> Result<(), FilebaseError> {
    fb.load()?;
    let present = if path {
        fb.store().has_path(key)
    } else {
        fb.has(key)
    };
    println!("{}", present);
    Ok(())
}

fn handle_rm(
    style: &Style,
    fb: &mut Filebase,
    key: &str,
    path: bool,
    no_commit: bool,
    reason: &str,
) -> Result<(), FilebaseError> {
    fb.load()?;
    let present = if path {
        fb.store().has_path(key)
    } else {
        fb.has(key)
    };
    if !present {
        style.print(MessageType::Info, &format!("`{}` is not set", key));
        return Ok(());
    }

    if path {
        fb.store_mut().delete_path(key);
    } else {
        fb.delete(key);
    }
    persist(style, fb, no_commit, reason)
}

fn handle_keys(fb: &mut Filebase, json: bool) -> Result<(), FilebaseError> {
    fb.load()?;
    let keys: Vec<&str> = fb.store().keys().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        for key in keys {
            println!("{}", key);
        }
    }
    Ok(())
}

fn handle_write(
    style: &Style,
    fb: &mut Filebase,
    file: PathBuf,
    content: Option<String>,
    reason: &str,
) -> Result<(), FilebaseError> {
    let content = match content {
        Some(content) => content,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let outcome = fb.write_file(&file, content, reason)?;
    style.print(
        MessageType::Ok,
        &format!(
            "{} {}",
            style.revision(outcome.commit.as_str()),
            outcome.message
        ),
    );
    style.print(
        MessageType::Info,
        &style.message_detail("File", &outcome.path.display().to_string()),
    );
    Ok(())
}

fn handle_commit(style: &Style, fb: &mut Filebase, reason: &str) -> Result<(), FilebaseError> {
    let commit = fb.commit(reason)?;
    style.print(
        MessageType::Ok,
        &format!(
            "{} {}",
            style.revision(commit.as_str()),
            fb.messages().resolve(reason)
        ),
    );
    Ok(())
}

fn handle_log(
    style: &Style,
    fb: &mut Filebase,
    limit: usize,
    json: bool,
) -> Result<(), FilebaseError> {
    let history = fb.history(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        style.print(MessageType::Info, "No commits yet");
        return Ok(());
    }

    for entry in &history {
        println!(
            "{} {} {}  {}",
            style.revision(entry.id.as_str()),
            entry.time.format("%Y-%m-%d %H:%M"),
            entry.author,
            entry.message
        );
    }
    Ok(())
}

fn handle_key(fb: &mut Filebase, default: bool) -> Result<(), FilebaseError> {
    let key = if default {
        fb.to_default_key(None)?
    } else {
        fb.to_path_key(None)?
    };
    println!("{}", key);
    Ok(())
}

fn handle_config_show(style: &Style, fb: &mut Filebase, json: bool) -> Result<(), FilebaseError> {
    let resolved = fb.resolved_config()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    style.print(MessageType::Info, "Resolved configuration:");
    let rows = [
        (ConfigProperty::WorkingDirectory, resolved.working_directory.display().to_string()),
        (ConfigProperty::DestinationDirectory, resolved.destination_directory.display().to_string()),
        (ConfigProperty::DocumentPath, resolved.document_path.display().to_string()),
        (ConfigProperty::Locale, resolved.locale.clone()),
        (ConfigProperty::TemplateDirectory, resolved.template_directory.display().to_string()),
        (
            ConfigProperty::RepositoryHandle,
            if resolved.repository_initialized {
                "initialized".to_string()
            } else {
                "not initialized".to_string()
            },
        ),
    ];
    for (property, value) in rows {
        println!("  {}", style.key_value(property.as_str(), &value));
    }
    Ok(())
}

fn handle_config_set(
    style: &Style,
    config_path: &Option<PathBuf>,
    mut file_options: FilebaseOptions,
    property: &str,
    value: &str,
) -> Result<(), FilebaseError> {
    let property: ConfigProperty = property.parse()?;
    file_options.assign(property, value)?;
    file_options.validate()?;

    let path = match config_path {
        Some(path) => path.clone(),
        None => FilebaseOptions::default_path().ok_or_else(|| {
            FilebaseError::Config("could not determine the home directory".to_string())
        })?,
    };
    file_options.save_to(&path)?;

    style.print(
        MessageType::Ok,
        &format!(
            "Set {} = {} in {}",
            property,
            value,
            style.file_path(&path.display().to_string())
        ),
    );
    Ok(())
}
