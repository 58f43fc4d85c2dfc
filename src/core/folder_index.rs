// src/core/folder_index.rs

//! Reads and writes the single index record kept inside every indexed folder.
//!
//! There is no caching layer: every read hits the disk, and every mutation
//! re-serializes the whole record.

use crate::constants::{INDEX_FILENAME, WB_DIR};
use crate::core::commons::{timestamp, write_json_pretty};
use crate::models::{IndexRecord, NodeKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use uuid::Uuid;
use walkdir::WalkDir;

/// Represents errors that can occur while reading or writing a folder index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The index record could not be parsed or produced.
    #[error("Malformed index record '{path}': {source}")]
    Json {
        /// The offending file.
        path: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Only directories can carry an index.
    #[error("Cannot index files, only folders ('{0}').")]
    NotADirectory(String),
    /// The folder already has an index record and overwriting was not requested.
    #[error("Folder is already indexed: '{0}'.")]
    AlreadyIndexed(String),
    /// The folder has no index record.
    #[error("The indicated folder is not yet indexed ('{0}').")]
    NotIndexed(String),
    /// The folder sits inside a dataset, or a dataset would be created above indexed folders.
    #[error("Invalid nesting: '{path}' would be nested inside the dataset '{dataset}'.")]
    InvalidNesting {
        /// The folder being indexed.
        path: String,
        /// The dataset it would nest in, or below.
        dataset: String,
    },
    /// The attribute is fixed at indexing time.
    #[error("The attribute '{0}' cannot be modified after indexing.")]
    ImmutableAttribute(String),
    /// The attribute exists but the value has the wrong shape.
    #[error("The attribute '{key}' must be {expected}.")]
    InvalidAttributeValue {
        /// The attribute.
        key: String,
        /// A description of the accepted shape.
        expected: &'static str,
    },
}

/// Result alias for folder index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// The attributes fixed at indexing time.
const IMMUTABLE_ATTRIBUTES: &[&str] = &["id", "uuid", "type", "created_at", "indexed_at"];

/// Returns the path of the index record for a folder.
pub fn index_path(folder: &Path) -> PathBuf {
    folder.join(WB_DIR).join(INDEX_FILENAME)
}

/// Checks whether a folder carries an index record.
pub fn is_indexed(folder: &Path) -> bool {
    folder.is_dir() && index_path(folder).is_file()
}

/// Builds a fresh record for a folder. Nothing is written.
///
/// The default name is the folder's basename and the description is empty.
pub fn new_record(folder: &Path, kind: NodeKind) -> IndexRecord {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| folder.display().to_string());
    IndexRecord {
        id: Uuid::new_v4().to_string(),
        kind,
        name,
        description: String::new(),
        tags: BTreeMap::new(),
        created_at: timestamp(),
        tool: None,
        tool_repo: None,
        launcher: None,
        launcher_repo: None,
        setup_at: None,
        extra: BTreeMap::new(),
    }
}

/// Reads the index record of a folder.
///
/// Returns `Ok(None)` when the path is not a directory or has no record.
pub fn read(folder: &Path) -> IndexResult<Option<IndexRecord>> {
    if !folder.is_dir() {
        return Ok(None);
    }
    let path = index_path(folder);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let record = serde_json::from_str(&content).map_err(|source| IndexError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(record))
}

/// Reads the index record of a folder, failing if there is none.
pub fn read_required(folder: &Path) -> IndexResult<IndexRecord> {
    read(folder)?.ok_or_else(|| IndexError::NotIndexed(folder.display().to_string()))
}

/// Writes the whole index record of a folder.
///
/// # Errors
/// Returns `IndexError::AlreadyIndexed` if a record exists and `overwrite` is false.
pub fn write(folder: &Path, record: &IndexRecord, overwrite: bool) -> IndexResult<()> {
    if !folder.is_dir() {
        return Err(IndexError::NotADirectory(folder.display().to_string()));
    }
    let path = index_path(folder);
    if path.exists() && !overwrite {
        return Err(IndexError::AlreadyIndexed(folder.display().to_string()));
    }
    let wb_dir = folder.join(WB_DIR);
    if !wb_dir.exists() {
        fs::create_dir_all(&wb_dir)?;
    }
    write_json_pretty(&path, record)?;
    log::debug!("Wrote index for '{}' ({})", folder.display(), record.id);
    Ok(())
}

/// Reads a record, applies `mutate`, and persists the whole record again.
fn update<F>(folder: &Path, mutate: F) -> IndexResult<IndexRecord>
where
    F: FnOnce(&mut IndexRecord) -> IndexResult<()>,
{
    let mut record = read_required(folder)?;
    mutate(&mut record)?;
    write(folder, &record, true)?;
    Ok(record)
}

fn expect_string(key: &str, value: Value) -> IndexResult<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(IndexError::InvalidAttributeValue {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

fn expect_optional_string(key: &str, value: Value) -> IndexResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => expect_string(key, other).map(Some),
    }
}

/// Sets one attribute of a folder's record.
///
/// Known attributes are type-checked. Unknown keys are stored verbatim, and
/// a `null` value removes them.
pub fn set_attribute(folder: &Path, key: &str, value: Value) -> IndexResult<IndexRecord> {
    if IMMUTABLE_ATTRIBUTES.contains(&key) {
        return Err(IndexError::ImmutableAttribute(key.to_string()));
    }
    update(folder, |record| {
        match key {
            "name" => record.name = expect_string(key, value)?,
            "description" => record.description = expect_string(key, value)?,
            "tool" => record.tool = expect_optional_string(key, value)?,
            "tool_repo" => record.tool_repo = expect_optional_string(key, value)?,
            "launcher" => record.launcher = expect_optional_string(key, value)?,
            "launcher_repo" => record.launcher_repo = expect_optional_string(key, value)?,
            "setup_at" => record.setup_at = expect_optional_string(key, value)?,
            "tags" => {
                let tags: BTreeMap<String, String> = serde_json::from_value(value).map_err(|_| {
                    IndexError::InvalidAttributeValue {
                        key: key.to_string(),
                        expected: "an object of string values",
                    }
                })?;
                record.tags = tags;
            }
            _ if value.is_null() => {
                record.extra.remove(key);
            }
            _ => {
                record.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    })
}

/// Adds or modifies a tag on a folder.
pub fn set_tag(folder: &Path, key: &str, value: &str) -> IndexResult<IndexRecord> {
    update(folder, |record| {
        record.tags.insert(key.to_string(), value.to_string());
        Ok(())
    })
}

/// Deletes a tag from a folder, if it is set.
///
/// The record is only rewritten when a tag was actually removed.
pub fn delete_tag(folder: &Path, key: &str) -> IndexResult<IndexRecord> {
    let mut record = read_required(folder)?;
    if record.tags.remove(key).is_some() {
        write(folder, &record, true)?;
    } else {
        log::info!("Tag '{}' is not set on '{}'", key, folder.display());
    }
    Ok(record)
}

/// Checks that `folder` may be indexed as `kind` without breaking the nesting rule.
///
/// No ancestor directory may be a dataset, and a new dataset may not have
/// indexed folders directly inside it.
pub fn check_nesting(folder: &Path, kind: NodeKind) -> IndexResult<()> {
    for ancestor in folder.ancestors().skip(1) {
        if let Some(record) = read(ancestor)? {
            if record.kind == NodeKind::Dataset {
                return Err(IndexError::InvalidNesting {
                    path: folder.display().to_string(),
                    dataset: ancestor.display().to_string(),
                });
            }
        }
    }

    if kind == NodeKind::Dataset {
        let descendants = WalkDir::new(folder)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != WB_DIR);
        for entry in descendants {
            let entry = entry.map_err(|e| IndexError::Io(e.into()))?;
            if entry.file_type().is_dir() && is_indexed(entry.path()) {
                return Err(IndexError::InvalidNesting {
                    path: entry.path().display().to_string(),
                    dataset: folder.display().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn folder(root: &TempDir, name: &str) -> PathBuf {
        let path = root.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_read_absent_record() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "plain");
        assert!(read(&dir).unwrap().is_none());
        assert!(!is_indexed(&dir));
        assert!(matches!(read_required(&dir), Err(IndexError::NotIndexed(_))));
    }

    #[test]
    fn test_write_refuses_existing_record() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "expA");
        let record = new_record(&dir, NodeKind::Collection);
        write(&dir, &record, false).unwrap();
        let second = new_record(&dir, NodeKind::Collection);
        assert!(matches!(
            write(&dir, &second, false),
            Err(IndexError::AlreadyIndexed(_))
        ));
        // The original record is untouched.
        assert_eq!(read(&dir).unwrap().unwrap().id, record.id);
    }

    #[test]
    fn test_overwrite_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "expA");
        let mut record = new_record(&dir, NodeKind::Dataset);
        record.description = "first pass".to_string();
        record.tags.insert("batch".to_string(), "2024".to_string());
        record.extra.insert("owner".to_string(), json!({"team": "bio"}));
        write(&dir, &record, true).unwrap();
        assert_eq!(read(&dir).unwrap().unwrap(), record);
    }

    #[test]
    fn test_new_record_defaults() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "run1");
        let record = new_record(&dir, NodeKind::Collection);
        assert_eq!(record.name, "run1");
        assert_eq!(record.description, "");
        assert!(record.tags.is_empty());
        assert!(Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn test_write_rejects_files() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();
        let record = new_record(&file, NodeKind::Collection);
        assert!(matches!(
            write(&file, &record, false),
            Err(IndexError::NotADirectory(_))
        ));
        assert!(read(&file).unwrap().is_none());
    }

    #[test]
    fn test_set_attribute_and_tags() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "expA");
        write(&dir, &new_record(&dir, NodeKind::Collection), false).unwrap();

        set_attribute(&dir, "name", json!("Experiment A")).unwrap();
        set_attribute(&dir, "priority", json!(3)).unwrap();
        set_tag(&dir, "batch", "2024").unwrap();
        let record = read_required(&dir).unwrap();
        assert_eq!(record.name, "Experiment A");
        assert_eq!(record.extra.get("priority"), Some(&json!(3)));
        assert_eq!(record.tags.get("batch").map(String::as_str), Some("2024"));

        let record = delete_tag(&dir, "batch").unwrap();
        assert!(record.tags.is_empty());
        // Deleting a missing tag is not an error.
        delete_tag(&dir, "batch").unwrap();

        set_attribute(&dir, "priority", Value::Null).unwrap();
        assert!(read_required(&dir).unwrap().extra.is_empty());
    }

    #[test]
    fn test_set_attribute_guards() {
        let root = tempfile::tempdir().unwrap();
        let dir = folder(&root, "expA");
        write(&dir, &new_record(&dir, NodeKind::Collection), false).unwrap();
        assert!(matches!(
            set_attribute(&dir, "id", json!("other")),
            Err(IndexError::ImmutableAttribute(_))
        ));
        assert!(matches!(
            set_attribute(&dir, "name", json!(5)),
            Err(IndexError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn test_check_nesting() {
        let root = tempfile::tempdir().unwrap();
        let collection = folder(&root, "coll");
        let dataset = folder(&root, "coll/ds");
        let inner = folder(&root, "coll/ds/deeper/inner");
        write(&collection, &new_record(&collection, NodeKind::Collection), false).unwrap();
        write(&dataset, &new_record(&dataset, NodeKind::Dataset), false).unwrap();

        assert!(matches!(
            check_nesting(&inner, NodeKind::Collection),
            Err(IndexError::InvalidNesting { .. })
        ));

        let sibling = folder(&root, "coll/other");
        check_nesting(&sibling, NodeKind::Collection).unwrap();

        // `coll` already holds indexed folders, so it could not become a dataset.
        let fresh_root = folder(&root, "fresh");
        let indexed_child = folder(&root, "fresh/child");
        write(&indexed_child, &new_record(&indexed_child, NodeKind::Collection), false).unwrap();
        assert!(matches!(
            check_nesting(&fresh_root, NodeKind::Dataset),
            Err(IndexError::InvalidNesting { .. })
        ));
        check_nesting(&fresh_root, NodeKind::Collection).unwrap();
    }

    #[test]
    fn test_dataset_over_deeply_indexed_folder_is_refused() {
        let root = tempfile::tempdir().unwrap();
        let top = folder(&root, "fresh");
        let deep = folder(&root, "fresh/plain/child");
        write(&deep, &new_record(&deep, NodeKind::Collection), false).unwrap();

        let err = check_nesting(&top, NodeKind::Dataset).unwrap_err();
        assert!(
            matches!(&err, IndexError::InvalidNesting { path, .. } if path.ends_with("child")),
            "{err}"
        );
        // The records of the dataset itself are not descendants.
        let lone = folder(&root, "lone");
        write(&lone, &new_record(&lone, NodeKind::Collection), true).unwrap();
        check_nesting(&lone, NodeKind::Dataset).unwrap();
    }
}
