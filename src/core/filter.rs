// src/core/filter.rs

//! Conjunctive filters over a built tree.

use crate::core::tree_builder::NodeMap;
use crate::models::Node;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Errors raised while building a query.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// The field is unknown or the value is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result alias for query building.
pub type QueryResult<T> = Result<T, QueryError>;

/// A single field/value predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Case-sensitive substring of the name.
    Name(String),
    /// Case-sensitive substring of the description.
    Description(String),
    /// Exact tag match.
    Tag {
        /// The tag key.
        key: String,
        /// The tag value.
        value: String,
    },
}

impl Filter {
    /// Parses a `field` / `value` pair.
    ///
    /// Tag values must be written `key=value` with a non-empty value. The key may be empty.
    pub fn parse(field: &str, value: &str) -> QueryResult<Self> {
        match field {
            "name" => Ok(Self::Name(value.to_string())),
            "description" => Ok(Self::Description(value.to_string())),
            "tag" => {
                let malformed = || {
                    QueryError::InvalidQuery(format!(
                        "to filter by tag, provide the query as 'key=value' (got '{}')",
                        value
                    ))
                };
                let (key, tag_value) = value.split_once('=').ok_or_else(malformed)?;
                if tag_value.is_empty() {
                    return Err(malformed());
                }
                Ok(Self::Tag {
                    key: key.to_string(),
                    value: tag_value.to_string(),
                })
            }
            other => Err(QueryError::InvalidQuery(format!(
                "cannot filter on '{}' (expected name, description or tag)",
                other
            ))),
        }
    }

    /// Whether `node` satisfies this filter.
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Name(needle) => node.record.name.contains(needle.as_str()),
            Self::Description(needle) => node.record.description.contains(needle.as_str()),
            Self::Tag { key, value } => node.record.tags.get(key) == Some(value),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(v) => write!(f, "name={}", v),
            Self::Description(v) => write!(f, "description={}", v),
            Self::Tag { key, value } => write!(f, "tag={}={}", key, value),
        }
    }
}

/// A built tree together with the filters applied to it.
#[derive(Debug, Clone)]
pub struct NodeSet {
    nodes: NodeMap,
    filters: Vec<Filter>,
    passes: BTreeMap<String, bool>,
}

impl NodeSet {
    /// Starts with every node passing.
    pub fn new(nodes: NodeMap) -> Self {
        let passes = nodes.keys().map(|id| (id.clone(), true)).collect();
        Self {
            nodes,
            filters: Vec::new(),
            passes,
        }
    }

    /// Every node of the tree, passing or not.
    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    /// The filters applied so far, in order.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Evaluates one filter over every node still passing.
    fn apply(&mut self, filter: &Filter) {
        for (id, passes) in self.passes.iter_mut() {
            if !*passes {
                continue;
            }
            *passes = self.nodes.get(id).is_some_and(|n| filter.matches(n));
        }
    }

    /// Adds a filter; it is ANDed with those already present.
    pub fn push(&mut self, filter: Filter) {
        log::debug!("Applying filter {}", filter);
        self.apply(&filter);
        self.filters.push(filter);
    }

    /// Parses and adds a filter.
    pub fn add_filter(&mut self, field: &str, value: &str) -> QueryResult<()> {
        let filter = Filter::parse(field, value)?;
        self.push(filter);
        Ok(())
    }

    /// Removes a filter and re-evaluates the remaining ones from scratch.
    /// Returns whether the filter was present.
    pub fn remove_filter(&mut self, field: &str, value: &str) -> QueryResult<bool> {
        let target = Filter::parse(field, value)?;
        let before = self.filters.len();
        self.filters.retain(|f| *f != target);
        let removed = self.filters.len() != before;

        for passes in self.passes.values_mut() {
            *passes = true;
        }
        let remaining = self.filters.clone();
        for filter in &remaining {
            self.apply(filter);
        }
        Ok(removed)
    }

    /// The ids in the result, optionally closed over ancestors.
    pub fn filtered_ids(&self, include_ancestors: bool) -> BTreeSet<String> {
        let passing = self
            .passes
            .iter()
            .filter(|(_, passes)| **passes)
            .map(|(id, _)| id.clone());
        if !include_ancestors {
            return passing.collect();
        }

        let mut keep = BTreeSet::new();
        for id in passing {
            let mut cursor = Some(id);
            while let Some(current) = cursor {
                if !keep.insert(current.clone()) {
                    // The rest of this chain is already kept.
                    break;
                }
                cursor = self.nodes.get(&current).and_then(|n| n.parent.clone());
            }
        }
        keep
    }

    /// Returns the filtered nodes, with children lists pruned to the result.
    pub fn filtered(&self, include_ancestors: bool) -> NodeMap {
        let keep = self.filtered_ids(include_ancestors);
        self.nodes
            .iter()
            .filter(|(id, _)| keep.contains(*id))
            .map(|(id, node)| {
                let mut node = node.clone();
                node.children.retain(|c| keep.contains(c));
                (id.clone(), node)
            })
            .collect()
    }

    /// Number of nodes [`NodeSet::filtered`] would return.
    pub fn filtered_len(&self, include_ancestors: bool) -> usize {
        self.filtered_ids(include_ancestors).len()
    }

    /// Lists the ids from the root down to `id`, both included.
    pub fn path_to_root(&self, id: &str) -> Vec<String> {
        path_to_root(&self.nodes, id)
    }

    /// One sorted line per filtered node: the name hierarchy from the root, `sep`, then the path.
    pub fn filtered_paths(&self, sep: &str) -> Vec<String> {
        let filtered = self.filtered(true);
        let mut lines: Vec<String> = filtered
            .iter()
            .map(|(id, node)| {
                let names = path_to_root(&filtered, id)
                    .iter()
                    .filter_map(|i| filtered.get(i).map(|n| n.record.name.clone()))
                    .collect::<Vec<_>>()
                    .join("/");
                let path = node.path.display().to_string();
                if names == path {
                    names
                } else {
                    format!("{}{}{}", names, sep, path)
                }
            })
            .collect();
        lines.sort();
        lines
    }
}

/// Lists the ids of `nodes` from the root down to `id`. Ids missing from `nodes` end the chain.
pub fn path_to_root(nodes: &NodeMap, id: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut cursor = Some(id.to_string());
    while let Some(current) = cursor {
        let Some(node) = nodes.get(&current) else {
            break;
        };
        if chain.contains(&current) {
            break;
        }
        cursor = node.parent.clone();
        chain.push(current);
    }
    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexRecord, NodeKind};
    use std::path::PathBuf;

    fn node(id: &str, name: &str, parent: Option<&str>, children: &[&str]) -> Node {
        let record = IndexRecord {
            id: id.to_string(),
            kind: NodeKind::Collection,
            name: name.to_string(),
            description: format!("about {}", name),
            tags: BTreeMap::new(),
            created_at: "2024-01-01 00:00:00 UTC".to_string(),
            tool: None,
            tool_repo: None,
            launcher: None,
            launcher_repo: None,
            setup_at: None,
            extra: BTreeMap::new(),
        };
        let mut node = Node::new(record, PathBuf::from(format!("/data/{}", name)));
        node.parent = parent.map(str::to_string);
        node.children = children.iter().map(|c| c.to_string()).collect();
        node
    }

    /// root -> (expA -> run1, expB)
    fn sample() -> NodeSet {
        let mut nodes = NodeMap::new();
        nodes.insert("r".into(), node("r", "root", None, &["a", "b"]));
        nodes.insert("a".into(), node("a", "expA", Some("r"), &["a1"]));
        nodes.insert("a1".into(), node("a1", "run1", Some("a"), &[]));
        nodes.insert("b".into(), node("b", "expB", Some("r"), &[]));
        if let Some(n) = nodes.get_mut("a") {
            n.record.tags.insert("batch".into(), "2024".into());
        }
        NodeSet::new(nodes)
    }

    #[test]
    fn test_tag_filter_format() {
        assert!(Filter::parse("tag", "key=value").is_ok());
        assert!(matches!(
            Filter::parse("tag", "novalue"),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            Filter::parse("tag", "key="),
            Err(QueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            Filter::parse("owner", "x"),
            Err(QueryError::InvalidQuery(_))
        ));
        assert_eq!(
            Filter::parse("tag", "=value").unwrap(),
            Filter::Tag {
                key: String::new(),
                value: "value".into()
            }
        );
        // Only the first '=' separates key and value.
        assert_eq!(
            Filter::parse("tag", "expr=a=b").unwrap(),
            Filter::Tag {
                key: "expr".into(),
                value: "a=b".into()
            }
        );
    }

    #[test]
    fn test_tag_filter_includes_ancestors_not_siblings() {
        let mut set = sample();
        set.add_filter("tag", "batch=2024").unwrap();
        let ids: Vec<String> = set.filtered(true).into_keys().collect();
        assert_eq!(ids, vec!["a".to_string(), "r".to_string()]);
        assert_eq!(set.filtered_len(false), 1);
    }

    #[test]
    fn test_children_are_pruned_to_the_result() {
        let mut set = sample();
        set.add_filter("name", "run").unwrap();
        let filtered = set.filtered(true);
        for node in filtered.values() {
            for child in &node.children {
                assert!(filtered.contains_key(child));
            }
        }
        assert_eq!(filtered.get("r").unwrap().children, vec!["a".to_string()]);
    }

    #[test]
    fn test_filters_are_anded_and_removable() {
        let mut set = sample();
        set.add_filter("name", "exp").unwrap();
        set.add_filter("description", "B").unwrap();
        assert_eq!(
            set.filtered_ids(false).into_iter().collect::<Vec<_>>(),
            vec!["b".to_string()]
        );
        assert!(set.remove_filter("description", "B").unwrap());
        assert_eq!(set.filtered_len(false), 2);
        assert!(!set.remove_filter("name", "missing").unwrap());
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let set = sample();
        assert_eq!(set.filtered_len(true), 4);
        assert_eq!(set.filtered(true).get("r").unwrap().children.len(), 2);
    }

    #[test]
    fn test_filtered_paths_and_path_to_root() {
        let mut set = sample();
        assert_eq!(
            set.path_to_root("a1"),
            vec!["r".to_string(), "a".to_string(), "a1".to_string()]
        );
        set.add_filter("name", "run1").unwrap();
        assert_eq!(
            set.filtered_paths(" : "),
            vec![
                "root : /data/root".to_string(),
                "root/expA : /data/expA".to_string(),
                "root/expA/run1 : /data/run1".to_string(),
            ]
        );
    }
}
