// src/core/commons.rs

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::{fs, io, path::Path};

lazy_static! {
    static ref SIMPLE_NAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

lazy_static! {
    static ref ENV_NAME_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// The format of every timestamp written by the workbench.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Returns the current UTC time as a string.
pub fn timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Checks that a name contains only letters, digits, underscores and dashes.
pub fn is_simple_name(name: &str) -> bool {
    SIMPLE_NAME_RE.is_match(name)
}

/// Checks that a name can be used as a shell environment variable.
pub fn is_env_name(name: &str) -> bool {
    ENV_NAME_RE.is_match(name)
}

/// Wraps a value in single quotes for a POSIX shell.
/// Embedded single quotes are closed, escaped and reopened (`'\''`).
pub fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Creates a symlink to a directory.
#[cfg(unix)]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Creates a symlink to a directory.
#[cfg(windows)]
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Serializes `value` as JSON with a 4-space indent and writes it to `path`.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(io::Error::other)?;
    buffer.push(b'\n');
    fs::write(path, buffer)
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_names() {
        assert!(is_simple_name("baseline"));
        assert!(is_simple_name("run_2-b"));
        assert!(!is_simple_name("has space"));
        assert!(!is_simple_name("a/b"));
        assert!(!is_simple_name(""));
    }

    #[test]
    fn test_env_names() {
        assert!(is_env_name("THREADS"));
        assert!(is_env_name("_x1"));
        assert!(!is_env_name("1X"));
        assert!(!is_env_name("A-B"));
    }

    #[test]
    fn test_shell_single_quote() {
        assert_eq!(shell_single_quote("plain"), "'plain'");
        assert_eq!(shell_single_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp();
        assert!(ts.ends_with(" UTC"));
        assert_eq!(ts.len(), "2024-01-01 00:00:00 UTC".len());
    }

    #[test]
    fn test_write_json_pretty_uses_four_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json_pretty(&path, &serde_json::json!({"a": 1})).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n    \"a\": 1\n}\n");
    }
}
