// src/core/tree_builder.rs

//! Rebuilds the node tree from the registry on every call.
//!
//! Every registered folder seeds the walk. A node's children are the indexed
//! folders immediately inside its directory on disk, so physically nested
//! folders are found even when they are not registered themselves.

use crate::constants::WB_DIR;
use crate::core::folder_index::{self, IndexError};
use crate::core::paths::{self, PathError};
use crate::core::registry::{Registry, RegistryError};
use crate::models::{Node, NodeKind};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::{fs, path::PathBuf};
use thiserror::Error;

/// The built tree, keyed by node id.
pub type NodeMap = BTreeMap<String, Node>;

/// Errors raised while building the tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// A path could not be resolved.
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// An index record could not be read.
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
    /// The registry could not be enumerated.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    /// A folder was reached a second time while nesting. Needs manual resolution.
    #[error(
        "Cycle detected: '{path}' is reachable from itself or from two parents. Resolve the symlinks by hand."
    )]
    CycleDetected {
        /// The folder reached twice.
        path: String,
    },
    /// Two different folders carry the same id.
    #[error("Duplicate id '{id}' found at '{first}' and '{second}'.")]
    DuplicateId {
        /// The shared id.
        id: String,
        /// The folder seen first.
        first: String,
        /// The folder seen second.
        second: String,
    },
    /// An indexed folder sits inside a dataset.
    #[error("Invalid nesting: '{path}' is indexed inside the dataset '{dataset}'.")]
    InvalidNesting {
        /// The nested folder.
        path: String,
        /// The dataset above it.
        dataset: String,
    },
}

/// Result alias for tree building.
pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Default)]
struct Builder {
    nodes: NodeMap,
    by_path: HashMap<PathBuf, String>,
    nest_parent: HashMap<String, String>,
    expanded: HashSet<String>,
    queue: VecDeque<String>,
}

impl Builder {
    /// Reads the node at `folder`, or returns the id already loaded for it.
    fn load(&mut self, folder: PathBuf) -> TreeResult<Option<String>> {
        if let Some(id) = self.by_path.get(&folder) {
            return Ok(Some(id.clone()));
        }
        let Some(record) = folder_index::read(&folder)? else {
            return Ok(None);
        };
        if let Some(existing) = self.nodes.get(&record.id) {
            return Err(TreeError::DuplicateId {
                id: record.id,
                first: existing.path.display().to_string(),
                second: folder.display().to_string(),
            });
        }
        let id = record.id.clone();
        self.by_path.insert(folder.clone(), id.clone());
        self.nodes.insert(id.clone(), Node::new(record, folder));
        Ok(Some(id))
    }

    fn display_path(&self, id: &str) -> String {
        self.nodes
            .get(id)
            .map(|n| n.path.display().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Records `child` as nested inside `parent`.
    fn link(&mut self, parent: &str, child: &str) -> TreeResult<()> {
        let mut cursor = Some(parent.to_string());
        while let Some(current) = cursor {
            if current == child {
                return Err(TreeError::CycleDetected {
                    path: self.display_path(child),
                });
            }
            cursor = self.nest_parent.get(&current).cloned();
        }
        if self.nest_parent.contains_key(child) {
            return Err(TreeError::CycleDetected {
                path: self.display_path(child),
            });
        }

        self.nest_parent.insert(child.to_string(), parent.to_string());
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child.to_string());
        }
        if !self.expanded.contains(child) {
            self.queue.push_back(child.to_string());
        }
        Ok(())
    }

    /// Lists the indexed folders immediately inside a node's directory.
    fn expand(&mut self, id: &str) -> TreeResult<()> {
        let Some(node) = self.nodes.get(id) else {
            return Ok(());
        };
        let path = node.path.clone();
        let kind = node.record.kind;

        let mut entries = fs::read_dir(&path)?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for entry in entries {
            if entry.file_name().is_some_and(|n| n == WB_DIR) || !entry.is_dir() {
                continue;
            }
            let child_dir = paths::sanitize(&entry)?;
            if !folder_index::is_indexed(&child_dir) {
                continue;
            }
            if kind == NodeKind::Dataset {
                return Err(TreeError::InvalidNesting {
                    path: child_dir.display().to_string(),
                    dataset: path.display().to_string(),
                });
            }
            if let Some(child) = self.load(child_dir)? {
                self.link(id, &child)?;
            }
        }
        Ok(())
    }

    /// Fails when any loaded folder lies below a dataset, however deep.
    fn check_dataset_nesting(&self) -> TreeResult<()> {
        for node in self.nodes.values() {
            for ancestor in node.path.ancestors().skip(1) {
                let Some(owner) = self.by_path.get(ancestor).and_then(|id| self.nodes.get(id))
                else {
                    continue;
                };
                if owner.record.kind == NodeKind::Dataset {
                    return Err(TreeError::InvalidNesting {
                        path: node.path.display().to_string(),
                        dataset: owner.path.display().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn run(mut self, seeds: Vec<PathBuf>) -> TreeResult<NodeMap> {
        for seed in seeds {
            if let Some(id) = self.load(seed)? {
                self.queue.push_back(id);
            }
        }
        while let Some(id) = self.queue.pop_front() {
            if !self.expanded.insert(id.clone()) {
                continue;
            }
            self.expand(&id)?;
        }

        self.check_dataset_nesting()?;

        // Parents are derived from the children lists.
        let edges: Vec<(String, String)> = self
            .nodes
            .values()
            .flat_map(|n| n.children.iter().map(|c| (c.clone(), n.id().to_string())))
            .collect();
        for (child, parent) in edges {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = Some(parent);
            }
        }
        Ok(self.nodes)
    }
}

/// Builds the full node tree reachable from the registry.
///
/// # Errors
/// Fails on cycles, duplicate ids, and indexed folders inside a dataset.
/// A partial tree is never returned.
pub fn build(registry: &Registry) -> TreeResult<NodeMap> {
    let seeds = registry.all_references()?;
    let seed_count = seeds.len();
    let nodes = Builder::default().run(seeds)?;
    log::debug!(
        "Tree built: {} node(s) from {} registered reference(s)",
        nodes.len(),
        seed_count
    );
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::folder_index::{new_record, write};
    use crate::models::{IndexRecord, RegistryStyle};
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _home: TempDir,
        root: TempDir,
        registry: Registry,
    }

    impl Fixture {
        fn new() -> Self {
            let home = tempfile::tempdir().unwrap();
            let registry =
                Registry::new(home.path().join("data"), RegistryStyle::PathFile, true);
            Self {
                _home: home,
                root: tempfile::tempdir().unwrap(),
                registry,
            }
        }

        /// Indexes a folder without any nesting check.
        fn index(&self, name: &str, kind: NodeKind, register: bool) -> IndexRecord {
            let path = self.root.path().join(name);
            fs::create_dir_all(&path).unwrap();
            let record = new_record(&path, kind);
            write(&path, &record, false).unwrap();
            if register {
                self.registry.register(&path, &record).unwrap();
            }
            record
        }

        fn path(&self, name: &str) -> PathBuf {
            paths::sanitize(&self.root.path().join(name)).unwrap()
        }
    }

    #[test]
    fn test_links_physically_nested_folders() {
        let fx = Fixture::new();
        let exp = fx.index("expA", NodeKind::Collection, true);
        // Not registered: found through its parent.
        let run1 = fx.index("expA/run1", NodeKind::Dataset, false);
        let run2 = fx.index("expA/run2", NodeKind::Dataset, true);
        fs::create_dir_all(fx.root.path().join("expA/scratch")).unwrap();

        let nodes = build(&fx.registry).unwrap();
        assert_eq!(nodes.len(), 3);
        let parent = nodes.get(&exp.id).unwrap();
        assert_eq!(parent.parent, None);
        assert_eq!(parent.children, vec![run1.id.clone(), run2.id.clone()]);
        assert_eq!(nodes.get(&run1.id).unwrap().parent.as_deref(), Some(exp.id.as_str()));
        assert_eq!(nodes.get(&run1.id).unwrap().path, fx.path("expA/run1"));
    }

    #[test]
    fn test_nested_children_skip_intermediate_plain_folders() {
        let fx = Fixture::new();
        let exp = fx.index("expA", NodeKind::Collection, true);
        let deep = fx.index("expA/plain/deep", NodeKind::Collection, true);
        let nodes = build(&fx.registry).unwrap();
        // Only immediate children are nested.
        assert!(nodes.get(&exp.id).unwrap().children.is_empty());
        assert!(nodes.get(&deep.id).unwrap().parent.is_none());
    }

    #[test]
    fn test_dataset_with_indexed_child_is_rejected() {
        let fx = Fixture::new();
        fx.index("ds", NodeKind::Dataset, true);
        fx.index("ds/inner", NodeKind::Collection, false);
        assert!(matches!(
            build(&fx.registry),
            Err(TreeError::InvalidNesting { .. })
        ));
    }

    #[test]
    fn test_dataset_with_deeply_indexed_folder_is_rejected() {
        let fx = Fixture::new();
        fx.index("fresh/plain/child", NodeKind::Collection, true);
        fx.index("fresh", NodeKind::Dataset, true);
        assert!(matches!(
            build(&fx.registry),
            Err(TreeError::InvalidNesting { path, .. }) if path.ends_with("child")
        ));
    }

    #[test]
    fn test_duplicate_ids_are_fatal() {
        let fx = Fixture::new();
        let record = fx.index("coll", NodeKind::Collection, true);
        let copy = fx.root.path().join("coll/copy");
        fs::create_dir_all(&copy).unwrap();
        write(&copy, &record, false).unwrap();
        assert!(matches!(
            build(&fx.registry),
            Err(TreeError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_empty_registry() {
        let fx = Fixture::new();
        assert!(build(&fx.registry).unwrap().is_empty());
    }

    #[cfg(unix)]
    fn symlink(target: &Path, link: &Path) {
        std::os::unix::fs::symlink(target, link).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_mutual_nesting_is_a_cycle() {
        let fx = Fixture::new();
        fx.index("a", NodeKind::Collection, true);
        fx.index("b", NodeKind::Collection, true);
        symlink(&fx.path("b"), &fx.root.path().join("a/to_b"));
        symlink(&fx.path("a"), &fx.root.path().join("b/to_a"));
        assert!(matches!(
            build(&fx.registry),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_self_link_is_a_cycle() {
        let fx = Fixture::new();
        fx.index("a", NodeKind::Collection, true);
        symlink(&fx.path("a"), &fx.root.path().join("a/me"));
        assert!(matches!(
            build(&fx.registry),
            Err(TreeError::CycleDetected { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_child_is_nested_once() {
        let fx = Fixture::new();
        let coll = fx.index("coll", NodeKind::Collection, true);
        let elsewhere = fx.index("elsewhere", NodeKind::Dataset, true);
        symlink(&fx.path("elsewhere"), &fx.root.path().join("coll/linked"));
        let nodes = build(&fx.registry).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes.get(&elsewhere.id).unwrap().parent.as_deref(),
            Some(coll.id.as_str())
        );
    }
}
