//! Key composition and directory expressions.
//!
//! Keys address values inside a single JSON document. A `.` separates path
//! segments; a literal dot inside a segment is written as `\.` and a literal
//! backslash as `\\`. Locale and working-directory prefixes routinely contain
//! dots (`en.US`, `/srv/app.v2`) and sometimes backslashes (`C:\`), so
//! [`compose_key`] escapes them before joining.
//!
//! Nothing in this module touches the filesystem.

use std::path::{Path, PathBuf};

use crate::errors::FilebaseError;

/// The structural separator between key segments.
pub const KEY_SEPARATOR: char = '.';

/// Escape character inside a segment.
pub const ESCAPE: char = '\\';

/// Escape every backslash and then every literal dot in `segment`.
pub fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == ESCAPE || c == KEY_SEPARATOR {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Turn every `\.` back into `.` and every `\\` back into `\`.
///
/// A backslash before any other character is kept as is.
pub fn unescape_key(key: &str) -> String {
    let mut unescaped = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            if let Some(&next) = chars.peek() {
                if next == ESCAPE || next == KEY_SEPARATOR {
                    unescaped.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        unescaped.push(c);
    }
    unescaped
}

/// Build a lookup key from a prefix and an optional field suffix.
///
/// Backslashes and dots in `prefix` are escaped so the prefix survives later splitting as a
/// single segment. A non-empty `suffix` is appended after a structural dot,
/// verbatim.
///
/// # Errors
///
/// Returns [`FilebaseError::InvalidArgument`] if `prefix` is empty.
///
/// # Example
///
/// ```
/// use filebase_core::keys::compose_key;
///
/// assert_eq!(compose_key("en", Some("default")).unwrap(), "en.default");
/// assert_eq!(compose_key("en.US", None).unwrap(), "en\\.US");
/// ```
pub fn compose_key(prefix: &str, suffix: Option<&str>) -> Result<String, FilebaseError> {
    if prefix.is_empty() {
        return Err(FilebaseError::InvalidArgument(
            "key prefix must be a non-empty string".to_string(),
        ));
    }

    let mut key = escape_segment(prefix);
    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        key.push(KEY_SEPARATOR);
        key.push_str(suffix);
    }
    Ok(key)
}

/// Byte offsets of every unescaped separator in `key`.
///
/// Escapes are consumed left to right, so a dot is structural only when an
/// even number of backslashes precedes it.
fn separator_positions(key: &str) -> impl Iterator<Item = usize> + '_ {
    let mut escaped = false;
    key.bytes().enumerate().filter_map(move |(i, b)| {
        if escaped {
            escaped = false;
            None
        } else if b == b'\\' {
            escaped = true;
            None
        } else if b == b'.' {
            Some(i)
        } else {
            None
        }
    })
}

/// Split `key` on the first unescaped dot.
///
/// Neither half is unescaped.
pub fn split_key_once(key: &str) -> (&str, Option<&str>) {
    match separator_positions(key).next() {
        Some(i) => (&key[..i], Some(&key[i + 1..])),
        None => (key, None),
    }
}

/// Split `key` on every unescaped dot and unescape each segment.
pub fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut start = 0;
    for i in separator_positions(key) {
        segments.push(unescape_key(&key[start..i]));
        start = i + 1;
    }
    segments.push(unescape_key(&key[start..]));
    segments
}

/// Expand a leading `~` in `expr` against `home`.
///
/// Only a bare `~` or `~` followed by a path separator is expanded; `~user`
/// forms are left untouched.
///
/// # Errors
///
/// Returns [`FilebaseError::InvalidArgument`] if `expr` is empty, or needs a
/// home directory and `home` is `None`.
pub fn expand_home(expr: &str, home: Option<&Path>) -> Result<PathBuf, FilebaseError> {
    if expr.is_empty() {
        return Err(FilebaseError::InvalidArgument(
            "directory expression must not be empty".to_string(),
        ));
    }

    let rest = match expr.strip_prefix('~') {
        Some("") => Some(""),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => Some(&rest[1..]),
        _ => None,
    };

    match rest {
        None => Ok(PathBuf::from(expr)),
        Some(rest) => {
            let home = home.ok_or_else(|| {
                FilebaseError::InvalidArgument(format!(
                    "cannot expand `{}`: home directory is unknown",
                    expr
                ))
            })?;
            if rest.is_empty() {
                Ok(home.to_path_buf())
            } else {
                Ok(home.join(rest))
            }
        }
    }
}

/// Resolve a directory expression to an absolute path.
///
/// Expands `~` to the user's home directory and makes relative paths
/// absolute against the process working directory. The result is lexical:
/// symlinks are not followed and existence is not checked.
pub fn resolve_dir(expr: &str) -> Result<PathBuf, FilebaseError> {
    let expanded = expand_home(expr, dirs::home_dir().as_deref())?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(std::path::absolute(&expanded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compose_key_escapes_prefix_dots() {
        assert_eq!(compose_key("en", None).unwrap(), "en");
        assert_eq!(compose_key("a.b.c", None).unwrap(), "a\\.b\\.c");
        assert_eq!(
            compose_key("/srv/app.v2", Some("title")).unwrap(),
            "/srv/app\\.v2.title"
        );
    }

    #[test]
    fn test_compose_key_empty_suffix_is_ignored() {
        assert_eq!(compose_key("en", Some("")).unwrap(), "en");
    }

    #[test]
    fn test_compose_key_rejects_empty_prefix() {
        let err = compose_key("", Some("default")).unwrap_err();
        assert!(matches!(err, FilebaseError::InvalidArgument(_)));
    }

    #[test]
    fn test_trailing_backslash_keeps_separator_structural() {
        let key = compose_key("C:\\", Some("title")).unwrap();
        assert_eq!(key, "C:\\\\.title");
        assert_eq!(split_key_once(&key), ("C:\\\\", Some("title")));
        assert_eq!(split_key(&key), vec!["C:\\", "title"]);

        let key = compose_key("x\\", Some("y")).unwrap();
        assert_eq!(split_key(&key).len(), 2);
    }

    #[test]
    fn test_escape_and_unescape_backslashes() {
        assert_eq!(escape_segment("a\\.b"), "a\\\\\\.b");
        assert_eq!(unescape_key("a\\\\\\.b"), "a\\.b");
        assert_eq!(unescape_key("a\\xb"), "a\\xb");
        assert_eq!(unescape_key("trailing\\"), "trailing\\");
    }

    /// Key-ish text with separators and escapes over-represented.
    const PREFIX_PATTERN: &str = "[a-zA-Z0-9./:\\\\_-]{1,16}|.{1,16}";

    proptest! {
        #[test]
        fn prop_prefix_round_trips_as_one_segment(prefix in PREFIX_PATTERN) {
            let key = compose_key(&prefix, None).unwrap();
            prop_assert_eq!(unescape_key(&key), prefix.clone());
            prop_assert_eq!(split_key(&key), vec![prefix]);
        }

        #[test]
        fn prop_split_once_yields_prefix_and_suffix(
            prefix in PREFIX_PATTERN,
            suffix in ".{1,16}",
        ) {
            let key = compose_key(&prefix, Some(&suffix)).unwrap();
            let (head, tail) = split_key_once(&key);
            prop_assert_eq!(head, escape_segment(&prefix));
            prop_assert_eq!(tail, Some(suffix.as_str()));
        }
    }

    #[test]
    fn test_split_key_segments() {
        assert_eq!(split_key("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(split_key("a\\.b.c"), vec!["a.b", "c"]);
        assert_eq!(split_key("plain"), vec!["plain"]);
        assert_eq!(split_key_once("plain"), ("plain", None));
    }

    #[test]
    fn test_expand_home() {
        let home = Path::new("/home/u");
        assert_eq!(expand_home("~", Some(home)).unwrap(), PathBuf::from("/home/u"));
        assert_eq!(
            expand_home("~/filebase", Some(home)).unwrap(),
            PathBuf::from("/home/u/filebase")
        );
        assert_eq!(
            expand_home("/var/data", Some(home)).unwrap(),
            PathBuf::from("/var/data")
        );
        assert_eq!(expand_home("~other", Some(home)).unwrap(), PathBuf::from("~other"));
    }

    #[test]
    fn test_expand_home_without_home() {
        assert!(expand_home("~/x", None).is_err());
        assert_eq!(expand_home("rel/x", None).unwrap(), PathBuf::from("rel/x"));
        assert!(expand_home("", None).is_err());
    }

    #[test]
    fn test_resolve_dir_is_absolute() {
        let resolved = resolve_dir("some/relative/dir").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/relative/dir"));
        assert!(!resolved.exists());
    }
}
