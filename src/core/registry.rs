// src/core/registry.rs

//! The flat registry directory (`<home>/data/`) holding one reference per indexed folder.
//!
//! A reference is either a file named after the folder id whose content is the
//! absolute folder path, or a symlink named after the folder basename. Both
//! kinds are accepted on enumeration, whatever style new references use.

use crate::core::commons;
use crate::core::folder_index;
use crate::core::paths::{self, PathError};
use crate::models::{IndexRecord, RegistryStyle};
use std::collections::BTreeSet;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised by the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// A referenced path could not be resolved.
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Another folder is already registered under the same id.
    #[error("The id '{id}' is already registered for '{existing}'.")]
    IdInUse {
        /// The id.
        id: String,
        /// The folder holding it.
        existing: String,
    },
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Returns the first name in `dir` that is not taken: `base`, then `base_1`, `base_2`, ...
///
/// Dangling symlinks count as taken.
pub fn unique_link_name(dir: &Path, base: &str) -> String {
    let taken = |name: &str| fs::symlink_metadata(dir.join(name)).is_ok();
    if !taken(base) {
        return base.to_string();
    }
    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{}_{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// The bytes stored in a path file for `folder`.
#[cfg(unix)]
fn encode_path(folder: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    folder.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn encode_path(folder: &Path) -> Vec<u8> {
    folder.to_string_lossy().into_owned().into_bytes()
}

/// Reads back a path file, ignoring a trailing newline.
fn read_path_file(entry: &Path) -> std::io::Result<PathBuf> {
    let mut bytes = fs::read(entry)?;
    while bytes.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
        bytes.pop();
    }
    Ok(decode_path(bytes))
}

#[cfg(unix)]
fn decode_path(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn decode_path(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// What a registry entry turned out to reference.
enum EntryState {
    /// A validly-indexed folder.
    Live(PathBuf),
    /// A target that is gone or no longer indexed.
    Stale,
    /// An indexed folder whose record fails to parse. Never pruned.
    Unreadable,
    /// Something that is neither a path file nor a symlink.
    Foreign,
}

/// A handle on the registry directory of one profile.
#[derive(Debug, Clone)]
pub struct Registry {
    root: PathBuf,
    style: RegistryStyle,
    prune_stale: bool,
}

impl Registry {
    /// Opens a registry rooted at `root` (the profile's `data/`).
    pub fn new(root: PathBuf, style: RegistryStyle, prune_stale: bool) -> Self {
        Self {
            root,
            style,
            prune_stale,
        }
    }

    /// The `data/` folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves one registry entry to the folder it references.
    fn resolve_entry(&self, entry: &Path) -> RegistryResult<EntryState> {
        let meta = fs::symlink_metadata(entry)?;
        let (target, expected_id) = if meta.file_type().is_symlink() {
            (entry.to_path_buf(), None)
        } else if meta.is_file() {
            let id = entry
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            (read_path_file(entry)?, id)
        } else {
            return Ok(EntryState::Foreign);
        };

        let folder = match paths::sanitize(&target) {
            Ok(folder) => folder,
            Err(_) => return Ok(EntryState::Stale),
        };
        let record = match folder_index::read(&folder) {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(EntryState::Stale),
            Err(e) => {
                log::warn!("Skipping '{}': {}", folder.display(), e);
                return Ok(EntryState::Unreadable);
            }
        };
        // A path file whose name no longer matches the folder id is stale.
        match expected_id {
            Some(expected) if expected != record.id => Ok(EntryState::Stale),
            _ => Ok(EntryState::Live(folder)),
        }
    }

    /// Lists every folder referenced by the registry, resolved and deduplicated.
    ///
    /// References that no longer resolve are skipped, and removed when pruning is enabled.
    pub fn all_references(&self) -> RegistryResult<Vec<PathBuf>> {
        let mut folders = BTreeSet::new();
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = fs::read_dir(&self.root)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for entry in entries {
            // Path files are named after ids, so a hidden file is never one of ours.
            // Hidden symlinks are references to hidden folders.
            let hidden = entry
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if hidden && !fs::symlink_metadata(&entry)?.file_type().is_symlink() {
                continue;
            }
            match self.resolve_entry(&entry)? {
                EntryState::Live(folder) => {
                    folders.insert(folder);
                }
                EntryState::Stale if self.prune_stale => {
                    log::info!("Pruning stale reference '{}'", entry.display());
                    fs::remove_file(&entry)?;
                }
                EntryState::Stale => {
                    log::debug!("Skipping stale reference '{}'", entry.display());
                }
                EntryState::Unreadable | EntryState::Foreign => {}
            }
        }
        log::debug!("Registry lists {} folder(s)", folders.len());
        Ok(folders.into_iter().collect())
    }

    /// Checks whether a folder is referenced by the registry, comparing resolved paths.
    pub fn is_registered(&self, folder: &Path) -> RegistryResult<bool> {
        let folder = paths::sanitize(folder)?;
        Ok(self.all_references()?.contains(&folder))
    }

    /// Adds a reference to `folder`.
    ///
    /// Returns the created reference, or `None` when nothing was written because
    /// the folder is the registry root or is already registered.
    pub fn register(&self, folder: &Path, record: &IndexRecord) -> RegistryResult<Option<PathBuf>> {
        let folder = paths::sanitize(folder)?;
        fs::create_dir_all(&self.root)?;
        if folder == paths::sanitize(&self.root)? {
            log::warn!("Refusing to register the registry root '{}'", folder.display());
            return Ok(None);
        }
        if self.all_references()?.contains(&folder) {
            log::debug!("'{}' is already registered", folder.display());
            return Ok(None);
        }

        let reference = match self.style {
            RegistryStyle::PathFile => {
                let reference = self.root.join(&record.id);
                if fs::symlink_metadata(&reference).is_ok() {
                    let existing = read_path_file(&reference)
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| reference.display().to_string());
                    return Err(RegistryError::IdInUse {
                        id: record.id.clone(),
                        existing,
                    });
                }
                fs::write(&reference, encode_path(&folder))?;
                reference
            }
            RegistryStyle::Symlink => {
                let base = folder
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| record.id.clone());
                let reference = self.root.join(unique_link_name(&self.root, &base));
                commons::symlink_dir(&folder, &reference)?;
                reference
            }
        };
        log::info!(
            "Registered '{}' as '{}'",
            folder.display(),
            reference.display()
        );
        Ok(Some(reference))
    }
}
