// src/core/assets.rs

//! # Asset Catalog
//!
//! Tools and launchers are provided by repositories kept under
//! `<home>/repositories/`. Each asset lives at
//! `<repo>/._wb/<kind>/<key>/` and is complete when it carries both a
//! `config.json` and a `run.sh`.
//!
//! The catalog is a plain value returned by [`Catalog::scan`]. Callers that
//! want to reuse it hold on to it; nothing is cached behind their back.

use crate::constants::{ASSET_CONFIG_FILENAME, ASSET_SCRIPT_FILENAME, DISALLOWED_ARG_NAMES, WB_DIR};
use crate::core::commons::{self, is_env_name, is_simple_name};
use crate::core::paths::{self, PathError};
use crate::models::{AssetConfig, AssetKind};
use serde::Serialize;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Errors raised while scanning, resolving or copying assets.
#[derive(Error, Debug)]
pub enum AssetError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The repositories folder could not be resolved.
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// A `config.json` is not valid JSON.
    #[error("Malformed asset configuration '{path}': {source}")]
    Json {
        /// The offending file.
        path: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The configuration is well-formed but unusable.
    #[error("Invalid asset configuration '{path}': {reason}")]
    InvalidConfig {
        /// The offending file.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
    /// No repository provides the asset.
    #[error("No {kind} named '{name}' was found.")]
    AssetNotFound {
        /// The kind looked up.
        kind: AssetKind,
        /// The name looked up.
        name: String,
    },
    /// A short name is provided by more than one repository.
    #[error("The {kind} name '{name}' is ambiguous; it is provided by: {repositories}. Use 'repo/{name}'.")]
    AmbiguousAsset {
        /// The kind looked up.
        kind: AssetKind,
        /// The name looked up.
        name: String,
        /// Comma-separated names of the providing repositories.
        repositories: String,
    },
    /// No repository has that name.
    #[error("Repository '{0}' not found.")]
    RepositoryNotFound(String),
    /// The repository name is taken.
    #[error("A repository named '{0}' already exists.")]
    RepositoryExists(String),
    /// The name has characters outside `[A-Za-z0-9_-]`.
    #[error("Repository name '{0}' may only contain letters, digits, '_' and '-'.")]
    InvalidRepositoryName(String),
    /// The folder has no `._wb` subfolder.
    #[error("'{0}' is not a repository (no '._wb' folder inside).")]
    NotARepository(String),
    /// Only linked repositories can be unlinked.
    #[error("Repository '{0}' was not linked locally and cannot be unlinked.")]
    NotALink(String),
    /// A destination file exists.
    #[error("Cannot copy to '{0}': the file exists and overwrite was not requested.")]
    Collision(String),
}

/// Result alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

fn invalid(path: &Path, reason: impl Into<String>) -> AssetError {
    AssetError::InvalidConfig {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Reads and validates an asset `config.json`.
pub fn load_config(path: &Path) -> AssetResult<AssetConfig> {
    let content = fs::read_to_string(path)?;
    let raw: Value = serde_json::from_str(&content).map_err(|source| AssetError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let Some(object) = raw.as_object() else {
        return Err(invalid(path, "the configuration must be a JSON object"));
    };
    let checks: [(&str, fn(&Value) -> bool, &str); 3] = [
        ("name", Value::is_string, "a string"),
        ("description", Value::is_string, "a string"),
        ("args", Value::is_object, "an object"),
    ];
    for (key, is_valid, expected) in checks {
        if !object.get(key).is_some_and(is_valid) {
            return Err(invalid(path, format!("'{}' must be {}", key, expected)));
        }
    }

    let config: AssetConfig = serde_json::from_value(raw).map_err(|e| invalid(path, e.to_string()))?;
    for (name, schema) in &config.args {
        if DISALLOWED_ARG_NAMES.contains(&name.as_str()) {
            return Err(invalid(path, format!("the argument name '{}' is reserved", name)));
        }
        if let Some(env) = &schema.wb_env {
            if !is_env_name(env) {
                return Err(invalid(
                    path,
                    format!("'{}' is not a valid environment variable name (argument '{}')", env, name),
                ));
            }
        }
    }
    Ok(config)
}

/// A repository directory under `<home>/repositories/`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Repository {
    /// The folder name, used as the `repo/` prefix.
    pub name: String,
    /// The resolved location of the repository.
    pub path: PathBuf,
    /// Whether the entry is a symlink to a local folder.
    pub linked: bool,
}

/// A complete tool or launcher.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    /// Name of the owning repository.
    pub repository: String,
    /// The resolved location of the owning repository.
    pub repository_path: PathBuf,
    /// Tool or launcher.
    pub kind: AssetKind,
    /// The asset folder name.
    pub key: String,
    /// The asset folder.
    pub path: PathBuf,
    /// The parsed `config.json`.
    pub config: AssetConfig,
}

impl Asset {
    /// The compound `repo/key` reference.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.repository, self.key)
    }

    /// The regular files of the asset folder, sorted.
    pub fn files(&self) -> AssetResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Copies every file of the asset into `dest`.
    ///
    /// Collisions are checked before anything is copied.
    pub fn copy_to(&self, dest: &Path, overwrite: bool) -> AssetResult<Vec<PathBuf>> {
        let files = self.files()?;
        let mut plan = Vec::with_capacity(files.len());
        for source in files {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let target = dest.join(file_name);
            if target.exists() && !overwrite {
                return Err(AssetError::Collision(target.display().to_string()));
            }
            plan.push((source, target));
        }

        fs::create_dir_all(dest)?;
        let mut copied = Vec::with_capacity(plan.len());
        for (source, target) in plan {
            log::debug!("Copying '{}' to '{}'", source.display(), target.display());
            fs::copy(&source, &target)?;
            copied.push(target);
        }
        Ok(copied)
    }
}

fn sorted_dirs(dir: &Path) -> AssetResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if path.is_dir() && !hidden {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists the repositories under `repositories_dir`, including incomplete ones.
pub fn list_repositories(repositories_dir: &Path) -> AssetResult<Vec<Repository>> {
    if !repositories_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut repositories = Vec::new();
    for dir in sorted_dirs(repositories_dir)? {
        let linked = fs::symlink_metadata(&dir)?.file_type().is_symlink();
        repositories.push(Repository {
            name: file_name_string(&dir),
            path: paths::sanitize(&dir)?,
            linked,
        });
    }
    Ok(repositories)
}

/// Links a local folder as a repository named `name`.
pub fn link_repository(repositories_dir: &Path, target: &Path, name: &str) -> AssetResult<Repository> {
    if !is_simple_name(name) {
        return Err(AssetError::InvalidRepositoryName(name.to_string()));
    }
    let target = paths::sanitize(target)?;
    if !target.join(WB_DIR).is_dir() {
        return Err(AssetError::NotARepository(target.display().to_string()));
    }
    let link = repositories_dir.join(name);
    if fs::symlink_metadata(&link).is_ok() {
        return Err(AssetError::RepositoryExists(name.to_string()));
    }
    fs::create_dir_all(repositories_dir)?;
    commons::symlink_dir(&target, &link)?;
    log::info!("Linked repository '{}' -> '{}'", name, target.display());
    Ok(Repository {
        name: name.to_string(),
        path: target,
        linked: true,
    })
}

/// Removes a locally linked repository. The linked folder itself is untouched.
pub fn unlink_repository(repositories_dir: &Path, name: &str) -> AssetResult<()> {
    let link = repositories_dir.join(name);
    let meta = fs::symlink_metadata(&link)
        .map_err(|_| AssetError::RepositoryNotFound(name.to_string()))?;
    if !meta.file_type().is_symlink() {
        return Err(AssetError::NotALink(name.to_string()));
    }
    fs::remove_file(&link)?;
    log::info!("Unlinked repository '{}'", name);
    Ok(())
}

/// Every complete asset of every complete repository.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    repositories: Vec<Repository>,
    assets: Vec<Asset>,
}

impl Catalog {
    /// Scans `repositories_dir`.
    ///
    /// # Errors
    /// An asset whose files are all present but whose configuration is
    /// invalid is an error. Incomplete assets and repositories are skipped.
    pub fn scan(repositories_dir: &Path) -> AssetResult<Self> {
        let mut catalog = Self::default();
        for repository in list_repositories(repositories_dir)? {
            let wb_dir = repository.path.join(WB_DIR);
            if !wb_dir.is_dir() {
                log::debug!("Skipping incomplete repository '{}'", repository.name);
                continue;
            }
            for kind in AssetKind::ALL {
                let kind_dir = wb_dir.join(kind.as_str());
                if !kind_dir.is_dir() {
                    continue;
                }
                for asset_dir in sorted_dirs(&kind_dir)? {
                    let config_path = asset_dir.join(ASSET_CONFIG_FILENAME);
                    if !config_path.is_file() || !asset_dir.join(ASSET_SCRIPT_FILENAME).is_file() {
                        log::debug!("Omitting incomplete {} '{}'", kind, asset_dir.display());
                        continue;
                    }
                    let config = load_config(&config_path)?;
                    catalog.assets.push(Asset {
                        repository: repository.name.clone(),
                        repository_path: repository.path.clone(),
                        kind,
                        key: file_name_string(&asset_dir),
                        path: asset_dir,
                        config,
                    });
                }
            }
            catalog.repositories.push(repository);
        }
        log::info!(
            "Asset scan: {} repositories, {} assets",
            catalog.repositories.len(),
            catalog.assets.len()
        );
        Ok(catalog)
    }

    /// Every repository found, sorted by name.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// The assets of one kind.
    pub fn assets(&self, kind: AssetKind) -> impl Iterator<Item = &Asset> {
        self.assets.iter().filter(move |a| a.kind == kind)
    }

    /// The sorted `repo/key` references of every asset of `kind`.
    pub fn list(&self, kind: AssetKind) -> Vec<String> {
        let mut refs: Vec<String> = self.assets(kind).map(Asset::reference).collect();
        refs.sort();
        refs
    }

    /// Finds an asset by short name (`aligner`) or compound key (`repo/aligner`).
    pub fn resolve(&self, kind: AssetKind, name: &str) -> AssetResult<&Asset> {
        let matches: Vec<&Asset> = match name.split_once('/') {
            Some((repo, key)) => self
                .assets(kind)
                .filter(|a| a.repository == repo && a.key == key)
                .collect(),
            None => self.assets(kind).filter(|a| a.key == name).collect(),
        };
        match matches.as_slice() {
            [] => Err(AssetError::AssetNotFound {
                kind,
                name: name.to_string(),
            }),
            [asset] => Ok(asset),
            many => Err(AssetError::AmbiguousAsset {
                kind,
                name: name.to_string(),
                repositories: many
                    .iter()
                    .map(|a| a.repository.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Strips an optional `repo/` prefix from an asset name.
pub fn short_name(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, key)| key)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Writes a complete asset into `<repos>/<repo>/._wb/<kind>/<key>/`.
    pub(crate) fn write_asset(repos: &Path, repo: &str, kind: AssetKind, key: &str, config: Value) {
        let dir = repos.join(repo).join(WB_DIR).join(kind.as_str()).join(key);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ASSET_CONFIG_FILENAME), config.to_string()).unwrap();
        fs::write(dir.join(ASSET_SCRIPT_FILENAME), "#!/bin/bash\necho run\n").unwrap();
    }

    pub(crate) fn aligner_config() -> Value {
        json!({
            "name": "Aligner",
            "description": "Aligns reads",
            "args": {
                "threads": {"help": "Number of threads", "default": 1, "wb_env": "THREADS"},
                "inputs": {"nargs": "+", "required": true, "wb_env": "INPUTS"}
            }
        })
    }

    #[test]
    fn test_scan_lists_complete_assets() {
        let repos = tempfile::tempdir().unwrap();
        write_asset(repos.path(), "lab", AssetKind::Tool, "aligner", aligner_config());
        write_asset(repos.path(), "lab", AssetKind::Launcher, "local", json!({
            "name": "Local", "description": "Runs locally", "args": {}
        }));
        // Missing run.sh: omitted.
        let partial = repos.path().join("lab/._wb/tool/partial");
        fs::create_dir_all(&partial).unwrap();
        fs::write(partial.join(ASSET_CONFIG_FILENAME), "{}").unwrap();
        // Missing ._wb: skipped.
        fs::create_dir_all(repos.path().join("bare/tool")).unwrap();

        let catalog = Catalog::scan(repos.path()).unwrap();
        assert_eq!(catalog.list(AssetKind::Tool), vec!["lab/aligner".to_string()]);
        assert_eq!(catalog.list(AssetKind::Launcher), vec!["lab/local".to_string()]);
        assert_eq!(catalog.repositories().len(), 1);
        let aligner = catalog.resolve(AssetKind::Tool, "aligner").unwrap();
        assert_eq!(aligner.config.args.len(), 2);
    }

    #[test]
    fn test_resolve_ambiguous_and_compound() {
        let repos = tempfile::tempdir().unwrap();
        write_asset(repos.path(), "lab", AssetKind::Tool, "aligner", aligner_config());
        write_asset(repos.path(), "other", AssetKind::Tool, "aligner", aligner_config());
        let catalog = Catalog::scan(repos.path()).unwrap();

        assert!(matches!(
            catalog.resolve(AssetKind::Tool, "aligner"),
            Err(AssetError::AmbiguousAsset { .. })
        ));
        assert_eq!(
            catalog.resolve(AssetKind::Tool, "other/aligner").unwrap().repository,
            "other"
        );
        assert!(matches!(
            catalog.resolve(AssetKind::Tool, "missing"),
            Err(AssetError::AssetNotFound { .. })
        ));
        assert!(matches!(
            catalog.resolve(AssetKind::Launcher, "aligner"),
            Err(AssetError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_configs_are_fatal() {
        let cases = [
            json!({"name": "x", "description": "y"}),
            json!({"name": 3, "description": "y", "args": {}}),
            json!({"name": "x", "description": "y", "args": {"profile": {}}}),
            json!({"name": "x", "description": "y", "args": {"a": {"wb_env": "1BAD"}}}),
            json!({"name": "x", "description": "y", "args": {"a": {"nargs": 0}}}),
        ];
        for config in cases {
            let repos = tempfile::tempdir().unwrap();
            write_asset(repos.path(), "lab", AssetKind::Tool, "broken", config);
            assert!(matches!(
                Catalog::scan(repos.path()),
                Err(AssetError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn test_copy_to_checks_collisions_first() {
        let repos = tempfile::tempdir().unwrap();
        write_asset(repos.path(), "lab", AssetKind::Tool, "aligner", aligner_config());
        let catalog = Catalog::scan(repos.path()).unwrap();
        let asset = catalog.resolve(AssetKind::Tool, "aligner").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("tool");
        let copied = asset.copy_to(&target, false).unwrap();
        assert_eq!(copied.len(), 2);
        assert!(target.join(ASSET_SCRIPT_FILENAME).is_file());

        assert!(matches!(
            asset.copy_to(&target, false),
            Err(AssetError::Collision(_))
        ));
        asset.copy_to(&target, true).unwrap();
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("lab/aligner"), "aligner");
        assert_eq!(short_name("aligner"), "aligner");
    }

    #[cfg(unix)]
    #[test]
    fn test_link_and_unlink_repository() {
        let home = tempfile::tempdir().unwrap();
        let repos = home.path().join("repositories");
        let source = tempfile::tempdir().unwrap();
        write_asset(source.path(), "mine", AssetKind::Tool, "counter", aligner_config());
        let target = source.path().join("mine");

        assert!(matches!(
            link_repository(&repos, &target, "bad name"),
            Err(AssetError::InvalidRepositoryName(_))
        ));
        assert!(matches!(
            link_repository(&repos, source.path(), "mine"),
            Err(AssetError::NotARepository(_))
        ));

        let linked = link_repository(&repos, &target, "mine").unwrap();
        assert!(linked.linked);
        assert!(matches!(
            link_repository(&repos, &target, "mine"),
            Err(AssetError::RepositoryExists(_))
        ));
        let catalog = Catalog::scan(&repos).unwrap();
        assert_eq!(catalog.list(AssetKind::Tool), vec!["mine/counter".to_string()]);

        unlink_repository(&repos, "mine").unwrap();
        assert!(list_repositories(&repos).unwrap().is_empty());
        assert!(target.is_dir());
        assert!(matches!(
            unlink_repository(&repos, "mine"),
            Err(AssetError::RepositoryNotFound(_))
        ));
    }
}
