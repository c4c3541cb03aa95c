//! Shared test utilities for filebase-cli integration tests.

use std::path::Path;

use assert_cmd::Command;

/// Get a Command for the filebase binary, isolated from the user's
/// environment: `HOME` points at `home` and no `FILEBASE_*` variables leak in.
///
/// # Panics
///
/// Panics if the filebase binary cannot be found.
#[allow(deprecated)]
pub fn filebase_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("filebase").expect("filebase binary should exist");
    cmd.env("HOME", home).env("NO_COLOR", "1");
    for var in [
        "FILEBASE_DEST",
        "FILEBASE_CWD",
        "FILEBASE_LOCALE",
        "FILEBASE_NAME",
        "FILEBASE_CONFIG",
        "FILEBASE_VERBOSE",
        "FILEBASE_QUIET",
        "FILEBASE_COLOR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A command bound to a store at `<home>/store`.
pub fn store_cmd(home: &Path) -> Command {
    let mut cmd = filebase_cmd(home);
    cmd.arg("--dest").arg(home.join("store"));
    cmd
}
