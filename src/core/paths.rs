// src/core/paths.rs

use crate::constants::{DEFAULT_BASE_FOLDER, DEFAULT_PROFILE};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while resolving locations.
#[derive(Error, Debug)]
pub enum PathError {
    /// `dirs` found no home directory.
    #[error("Could not find the user's home directory.")]
    HomeDirNotFound,
    /// `~` or `$VAR` expansion failed.
    #[error("Failed to expand path template '{template}': {reason}")]
    Expansion {
        /// The input path.
        template: String,
        /// Why expansion failed.
        reason: String,
    },
    /// The path could not be canonicalized.
    #[error("Location does not exist: '{path}'")]
    DoesNotExist {
        /// The path as given.
        path: String,
        /// The canonicalization error.
        #[source]
        source: std::io::Error,
    },
    /// The profile name has characters outside `[A-Za-z0-9_-]`.
    #[error("Profile name '{0}' may only contain letters, digits, '_' and '-'.")]
    InvalidProfile(String),
}

/// Expands `~` and environment variables in a user-supplied path.
///
/// `shellexpand::full` handles both the home directory and `$VAR` references.
pub fn expand_user_path(template: &str) -> Result<PathBuf, PathError> {
    if template.starts_with('~') && dirs::home_dir().is_none() {
        return Err(PathError::HomeDirNotFound);
    }
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Returns the home folder of a profile: `<base_folder>/<profile>`.
///
/// The base folder defaults to `~/._workbench` and the profile to `default`.
pub fn resolve_profile_home(
    base_folder: Option<&str>,
    profile: Option<&str>,
) -> Result<PathBuf, PathError> {
    let base = expand_user_path(base_folder.unwrap_or(DEFAULT_BASE_FOLDER))?;
    let profile = profile.unwrap_or(DEFAULT_PROFILE);
    if !crate::core::commons::is_simple_name(profile) {
        return Err(PathError::InvalidProfile(profile.to_string()));
    }
    Ok(base.join(profile))
}

/// Returns a path to a location which exists, is absolute, has every symlink
/// resolved and carries no terminal slash.
pub fn sanitize(path: &Path) -> Result<PathBuf, PathError> {
    dunce::canonicalize(path).map_err(|source| PathError::DoesNotExist {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sanitize_resolves_relative_components() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir(&nested).unwrap();
        let messy = dir.path().join("a").join("..").join("a").join("");
        let clean = sanitize(&messy).unwrap();
        assert_eq!(clean, sanitize(&nested).unwrap());
        assert!(clean.is_absolute());
        assert!(!clean.to_string_lossy().ends_with('/'));
    }

    #[test]
    fn test_sanitize_missing_location() {
        let dir = tempfile::tempdir().unwrap();
        let result = sanitize(&dir.path().join("missing"));
        assert!(matches!(result, Err(PathError::DoesNotExist { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_sanitize_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert_eq!(sanitize(&link).unwrap(), sanitize(&target).unwrap());
    }

    #[test]
    fn test_resolve_profile_home() {
        let home = resolve_profile_home(Some("/tmp/wb-base"), Some("lab")).unwrap();
        assert_eq!(home, PathBuf::from("/tmp/wb-base/lab"));
        assert!(matches!(
            resolve_profile_home(Some("/tmp/wb-base"), Some("../escape")),
            Err(PathError::InvalidProfile(_))
        ));
    }
}
