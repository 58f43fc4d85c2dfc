// src/core/workbench.rs

//! The entry point of every operation: one profile home with its registry,
//! saved parameter sets and asset repositories.
//!
//! A `Workbench` is opened per invocation. It holds paths and configuration
//! only; trees and catalogs are rebuilt by the calls that need them.

use crate::constants::{ASSET_CONFIG_FILENAME, DATA_DIR, PARAMS_DIR, REPOSITORIES_DIR, WB_DIR};
use crate::core::assets::{self, AssetError, Catalog};
use crate::core::commons::timestamp;
use crate::core::config::{self, ConfigError};
use crate::core::filter::{Filter, NodeSet, QueryError};
use crate::core::folder_index::{self, IndexError};
use crate::core::parameters::{self, ParamError};
use crate::core::paths::{self, PathError};
use crate::core::registry::{Registry, RegistryError};
use crate::core::saved_params::{SavedParams, SavedParamsError};
use crate::core::tree_builder::{self, NodeMap, TreeError};
use crate::models::{AssetKind, IndexRecord, Node, NodeKind, ParamMap, ProfileConfig};
use serde_json::Value;
use std::collections::BTreeSet;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors surfaced by workbench operations.
#[derive(Error, Debug)]
pub enum WorkbenchError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// Location resolution failed.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The profile config could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A folder index operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The tree could not be built.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A filter could not be built.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// An asset operation failed.
    #[error(transparent)]
    Asset(#[from] AssetError),
    /// Parameters could not be validated or written.
    #[error(transparent)]
    Param(#[from] ParamError),
    /// A saved set operation failed.
    #[error(transparent)]
    SavedParams(#[from] SavedParamsError),
    /// The repair walk failed.
    #[error("Failed to walk the folder tree: {0}")]
    Walk(#[from] walkdir::Error),
    /// No reachable node has this id.
    #[error("No indexed folder with id '{0}' is reachable from the registry.")]
    NodeNotFound(String),
    /// Neither or both of `--path` and `--id` were given.
    #[error("Address a folder either by path or by id, not both and not neither.")]
    NodeRefRequired,
    /// The folder is indexed as a collection.
    #[error("'{0}' is not indexed as a dataset.")]
    NotADataset(String),
    /// The dataset has no asset of that kind.
    #[error("No {kind} has been set up for '{path}'.")]
    NoAssetSetUp {
        /// The asset kind.
        kind: AssetKind,
        /// The dataset.
        path: String,
    },
    /// The dataset has no `params.json` for that kind.
    #[error("No parameters have been written for the {kind} of '{path}'.")]
    NoParams {
        /// The asset kind.
        kind: AssetKind,
        /// The dataset.
        path: String,
    },
}

/// Result alias for workbench operations.
pub type WorkbenchResult<T> = Result<T, WorkbenchError>;

/// How a command addresses an indexed folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// By folder path.
    Path(PathBuf),
    /// By record id.
    Id(String),
}

impl NodeRef {
    /// Accepts exactly one of `path` and `id`.
    pub fn from_options(path: Option<PathBuf>, id: Option<String>) -> WorkbenchResult<Self> {
        match (path, id) {
            (Some(path), None) => Ok(Self::Path(path)),
            (None, Some(id)) => Ok(Self::Id(id)),
            _ => Err(WorkbenchError::NodeRefRequired),
        }
    }
}

/// An opened profile: its home folder, config, registry and saved parameter store.
#[derive(Debug, Clone)]
pub struct Workbench {
    home: PathBuf,
    config: ProfileConfig,
    registry: Registry,
    saved: SavedParams,
}

impl Workbench {
    /// Opens `<base_folder>/<profile>`, creating its layout on first use.
    pub fn open(base_folder: Option<&str>, profile: Option<&str>) -> WorkbenchResult<Self> {
        let home = paths::resolve_profile_home(base_folder, profile)?;
        Self::open_at(home)
    }

    /// Opens a profile home given directly.
    pub fn open_at(home: PathBuf) -> WorkbenchResult<Self> {
        for dir in [DATA_DIR, PARAMS_DIR, REPOSITORIES_DIR] {
            fs::create_dir_all(home.join(dir))?;
        }
        let config = config::load_profile_config(&home)?;
        let registry = Registry::new(
            home.join(DATA_DIR),
            config.registry_style,
            config.prune_stale_references,
        );
        let saved = SavedParams::new(home.join(PARAMS_DIR));
        log::debug!("Opened workbench at '{}'", home.display());
        Ok(Self {
            home,
            config,
            registry,
            saved,
        })
    }

    /// The profile folder.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The loaded `config.toml`.
    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// The profile registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The saved parameter store.
    pub fn saved_params(&self) -> &SavedParams {
        &self.saved
    }

    /// Where asset repositories live.
    pub fn repositories_dir(&self) -> PathBuf {
        self.home.join(REPOSITORIES_DIR)
    }

    // --- INDEXING ---

    /// Indexes `path` as a new node and registers it.
    ///
    /// # Errors
    /// `AlreadyIndexed` if the folder already has a record (it is never
    /// overwritten), and `InvalidNesting` if it would end up inside a dataset.
    pub fn index_folder(&self, path: &Path, kind: NodeKind) -> WorkbenchResult<Node> {
        let folder = paths::sanitize(path)?;
        if !folder.is_dir() {
            return Err(IndexError::NotADirectory(folder.display().to_string()).into());
        }
        if folder_index::is_indexed(&folder) {
            return Err(IndexError::AlreadyIndexed(folder.display().to_string()).into());
        }
        folder_index::check_nesting(&folder, kind)?;

        let record = folder_index::new_record(&folder, kind);
        folder_index::write(&folder, &record, false)?;
        self.registry.register(&folder, &record)?;
        log::info!("Indexed '{}' as {} ({})", folder.display(), kind, record.id);
        Ok(Node::new(record, folder))
    }

    /// Builds the full tree.
    pub fn tree(&self) -> WorkbenchResult<NodeMap> {
        Ok(tree_builder::build(&self.registry)?)
    }

    /// Builds the tree and applies `filters` to it.
    pub fn query(&self, filters: Vec<Filter>) -> WorkbenchResult<NodeSet> {
        let mut set = NodeSet::new(self.tree()?);
        for filter in filters {
            set.push(filter);
        }
        Ok(set)
    }

    /// Looks a node up. A path is read directly from disk; an id needs a tree build.
    pub fn find(&self, node: &NodeRef) -> WorkbenchResult<Node> {
        match node {
            NodeRef::Path(path) => {
                let folder = paths::sanitize(path)?;
                let record = folder_index::read_required(&folder)?;
                Ok(Node::new(record, folder))
            }
            NodeRef::Id(id) => self
                .tree()?
                .remove(id)
                .ok_or_else(|| WorkbenchError::NodeNotFound(id.clone())),
        }
    }

    /// The folder of an indexed node.
    fn folder(&self, node: &NodeRef) -> WorkbenchResult<PathBuf> {
        match node {
            NodeRef::Path(path) => {
                let folder = paths::sanitize(path)?;
                if !folder_index::is_indexed(&folder) {
                    return Err(IndexError::NotIndexed(folder.display().to_string()).into());
                }
                Ok(folder)
            }
            NodeRef::Id(_) => Ok(self.find(node)?.path),
        }
    }

    // --- ATTRIBUTES ---

    /// Sets the `name` attribute.
    pub fn set_name(&self, node: &NodeRef, name: &str) -> WorkbenchResult<IndexRecord> {
        self.set_attribute(node, "name", Value::String(name.to_string()))
    }

    /// Sets the `description` attribute.
    pub fn set_description(&self, node: &NodeRef, description: &str) -> WorkbenchResult<IndexRecord> {
        self.set_attribute(node, "description", Value::String(description.to_string()))
    }

    /// Sets any mutable attribute.
    pub fn set_attribute(&self, node: &NodeRef, key: &str, value: Value) -> WorkbenchResult<IndexRecord> {
        let folder = self.folder(node)?;
        Ok(folder_index::set_attribute(&folder, key, value)?)
    }

    /// Sets one tag.
    pub fn set_tag(&self, node: &NodeRef, key: &str, value: &str) -> WorkbenchResult<IndexRecord> {
        let folder = self.folder(node)?;
        Ok(folder_index::set_tag(&folder, key, value)?)
    }

    /// Removes one tag.
    pub fn delete_tag(&self, node: &NodeRef, key: &str) -> WorkbenchResult<IndexRecord> {
        let folder = self.folder(node)?;
        Ok(folder_index::delete_tag(&folder, key)?)
    }

    // --- ASSETS ---

    /// Scans the asset repositories of this profile.
    pub fn catalog(&self) -> WorkbenchResult<Catalog> {
        Ok(Catalog::scan(&self.repositories_dir())?)
    }

    /// Copies a tool (and optionally a launcher) into a dataset and records the binding.
    pub fn setup(
        &self,
        node: &NodeRef,
        tool: &str,
        launcher: Option<&str>,
        overwrite: bool,
    ) -> WorkbenchResult<IndexRecord> {
        let folder = self.folder(node)?;
        let mut record = folder_index::read_required(&folder)?;
        if record.kind != NodeKind::Dataset {
            return Err(WorkbenchError::NotADataset(folder.display().to_string()));
        }

        let catalog = self.catalog()?;
        let mut chosen = vec![catalog.resolve(AssetKind::Tool, tool)?];
        if let Some(launcher) = launcher {
            chosen.push(catalog.resolve(AssetKind::Launcher, launcher)?);
        }

        for asset in chosen {
            let dest = folder.join(WB_DIR).join(asset.kind.as_str());
            asset.copy_to(&dest, overwrite)?;
            record.set_attachment(
                asset.kind,
                asset.reference(),
                asset.repository_path.display().to_string(),
            );
            log::info!("Set up {} '{}' in '{}'", asset.kind, asset.reference(), folder.display());
        }
        record.setup_at = Some(timestamp());
        folder_index::write(&folder, &record, true)?;
        Ok(record)
    }

    // --- PARAMETERS ---

    fn asset_dir(folder: &Path, kind: AssetKind) -> PathBuf {
        folder.join(WB_DIR).join(kind.as_str())
    }

    /// The `repo/key` reference of the `kind` asset set up in `folder`.
    fn attachment(folder: &Path, record: &IndexRecord, kind: AssetKind) -> WorkbenchResult<String> {
        record
            .attachment(kind)
            .map(str::to_string)
            .ok_or_else(|| WorkbenchError::NoAssetSetUp {
                kind,
                path: folder.display().to_string(),
            })
    }

    /// Validates `values` against the dataset's copy of the asset schema and
    /// writes `params.json` and `env`.
    ///
    /// With `from`, the named saved set is loaded first and `values` override it.
    pub fn set_params(
        &self,
        node: &NodeRef,
        kind: AssetKind,
        values: ParamMap,
        from: Option<&str>,
        overwrite: bool,
    ) -> WorkbenchResult<ParamMap> {
        let folder = self.folder(node)?;
        let record = folder_index::read_required(&folder)?;
        let asset = Self::attachment(&folder, &record, kind)?;
        let dir = Self::asset_dir(&folder, kind);
        let schema = assets::load_config(&dir.join(ASSET_CONFIG_FILENAME))?;

        let mut merged = match from {
            Some(name) => self.saved.load(kind, &asset, name)?,
            None => ParamMap::new(),
        };
        merged.extend(values);

        let params = parameters::validate(&schema.args, &merged).into_result()?;
        let extra: Vec<(String, String)> = record
            .attachment_repo(kind)
            .map(|repo| (format!("{}_REPO", kind.env_prefix()), repo.to_string()))
            .into_iter()
            .collect();
        parameters::serialize(&dir, &schema.args, &params, &extra, overwrite)?;
        Ok(params)
    }

    /// Reads the parameters written into a dataset for `kind`.
    pub fn dataset_params(&self, node: &NodeRef, kind: AssetKind) -> WorkbenchResult<ParamMap> {
        let folder = self.folder(node)?;
        parameters::read_params(&Self::asset_dir(&folder, kind))?.ok_or_else(|| {
            WorkbenchError::NoParams {
                kind,
                path: folder.display().to_string(),
            }
        })
    }

    /// Saves a dataset's current parameters as a named set for its asset.
    pub fn save_params_from_dataset(
        &self,
        node: &NodeRef,
        kind: AssetKind,
        name: &str,
        overwrite: bool,
    ) -> WorkbenchResult<PathBuf> {
        let folder = self.folder(node)?;
        let record = folder_index::read_required(&folder)?;
        let asset = Self::attachment(&folder, &record, kind)?;
        let params = self.dataset_params(node, kind)?;
        Ok(self.saved.save(kind, &asset, name, &params, overwrite)?)
    }

    // --- REPAIR ---

    /// Registers every indexed folder under `root` that the registry does not reach.
    ///
    /// Returns the folders that were registered.
    pub fn repair(&self, root: &Path) -> WorkbenchResult<Vec<PathBuf>> {
        let root = paths::sanitize(root)?;
        let mut known: BTreeSet<PathBuf> = self.registry.all_references()?.into_iter().collect();
        let mut registered = Vec::new();

        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != WB_DIR);
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_dir() || !folder_index::is_indexed(entry.path()) {
                continue;
            }
            let folder = paths::sanitize(entry.path())?;
            if known.contains(&folder) {
                continue;
            }
            let record = match folder_index::read(&folder) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping '{}': {}", folder.display(), e);
                    continue;
                }
            };
            match self.registry.register(&folder, &record) {
                Ok(Some(_)) => {
                    registered.push(folder.clone());
                    known.insert(folder);
                }
                Ok(None) => {}
                Err(RegistryError::IdInUse { id, existing }) => {
                    log::warn!(
                        "Not registering '{}': id '{}' already belongs to '{}'",
                        folder.display(),
                        id,
                        existing
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("Repair registered {} folder(s)", registered.len());
        Ok(registered)
    }
}
