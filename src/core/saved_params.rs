// src/core/saved_params.rs

//! Named parameter sets kept under `<home>/params/<kind>/<asset>/<name>.json`,
//! independent of any dataset.

use crate::core::assets::short_name;
use crate::core::commons::{is_simple_name, write_json_pretty};
use crate::models::{AssetKind, ParamMap};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised by the saved parameter store.
#[derive(Error, Debug)]
pub enum SavedParamsError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// A saved set is not valid JSON.
    #[error("Malformed saved parameters '{path}': {source}")]
    Json {
        /// The offending file.
        path: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The set name has characters outside `[A-Za-z0-9_-]`.
    #[error("'{0}' is not a valid name; use only letters, digits, '_' and '-'.")]
    InvalidName(String),
    /// No set with that name exists.
    #[error("No saved parameters named '{name}' for {kind} '{asset}'.")]
    NotFound {
        /// The asset kind.
        kind: AssetKind,
        /// The asset.
        asset: String,
        /// The set name.
        name: String,
    },
    /// A set with that name exists and overwriting was not requested.
    #[error("Saved parameters '{name}' already exist for {kind} '{asset}'.")]
    Collision {
        /// The asset kind.
        kind: AssetKind,
        /// The asset.
        asset: String,
        /// The set name.
        name: String,
    },
}

/// Result alias for saved parameter operations.
pub type SavedParamsResult<T> = Result<T, SavedParamsError>;

/// Parameter sets saved under `<home>/params/<kind>/<asset>/`.
#[derive(Debug, Clone)]
pub struct SavedParams {
    root: PathBuf,
}

impl SavedParams {
    /// Opens the store rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The folder holding the sets of one asset. A `repo/` prefix on `asset` is ignored.
    fn dir(&self, kind: AssetKind, asset: &str) -> SavedParamsResult<PathBuf> {
        let asset = short_name(asset);
        if !is_simple_name(asset) {
            return Err(SavedParamsError::InvalidName(asset.to_string()));
        }
        Ok(self.root.join(kind.as_str()).join(asset))
    }

    fn file(&self, kind: AssetKind, asset: &str, name: &str) -> SavedParamsResult<PathBuf> {
        if !is_simple_name(name) {
            return Err(SavedParamsError::InvalidName(name.to_string()));
        }
        Ok(self.dir(kind, asset)?.join(format!("{}.json", name)))
    }

    fn not_found(kind: AssetKind, asset: &str, name: &str) -> SavedParamsError {
        SavedParamsError::NotFound {
            kind,
            asset: short_name(asset).to_string(),
            name: name.to_string(),
        }
    }

    /// Writes a named set.
    pub fn save(
        &self,
        kind: AssetKind,
        asset: &str,
        name: &str,
        params: &ParamMap,
        overwrite: bool,
    ) -> SavedParamsResult<PathBuf> {
        let path = self.file(kind, asset, name)?;
        if path.exists() && !overwrite {
            return Err(SavedParamsError::Collision {
                kind,
                asset: short_name(asset).to_string(),
                name: name.to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_json_pretty(&path, params)?;
        log::info!("Saved parameters '{}' for {} '{}'", name, kind, short_name(asset));
        Ok(path)
    }

    /// Reads a named set.
    pub fn load(&self, kind: AssetKind, asset: &str, name: &str) -> SavedParamsResult<ParamMap> {
        let path = self.file(kind, asset, name)?;
        if !path.is_file() {
            return Err(Self::not_found(kind, asset, name));
        }
        read_set(&path)
    }

    /// The sorted names of the sets saved for an asset.
    pub fn list(&self, kind: AssetKind, asset: &str) -> SavedParamsResult<Vec<String>> {
        let dir = self.dir(kind, asset)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Removes a named set.
    pub fn delete(&self, kind: AssetKind, asset: &str, name: &str) -> SavedParamsResult<()> {
        let path = self.file(kind, asset, name)?;
        if !path.is_file() {
            return Err(Self::not_found(kind, asset, name));
        }
        fs::remove_file(&path)?;
        log::info!("Deleted parameters '{}' for {} '{}'", name, kind, short_name(asset));
        Ok(())
    }
}

fn read_set(path: &Path) -> SavedParamsResult<ParamMap> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| SavedParamsError::Json {
        path: path.display().to_string(),
        source,
    })
}
