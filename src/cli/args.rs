// src/cli/args.rs

use crate::core::filter::{Filter, QueryResult};
use crate::core::workbench::{NodeRef, WorkbenchResult};
use crate::models::{AssetKind, NodeKind, ParamMap};
use clap::{Args, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Every `wb` command.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index a folder as a dataset or collection and register it.
    Index(IndexArgs),
    /// Print the nodes of the tree matching the filters.
    List(QueryArgs),
    /// Draw the tree of the nodes matching the filters.
    Tree(QueryArgs),
    /// Print the `name/name : path` line of each node matching the filters.
    Find(QueryArgs),
    /// Set the name of a node.
    SetName(SetTextArgs),
    /// Set the description of a node.
    SetDescription(SetTextArgs),
    /// Set a tag on a node.
    SetTag(SetTagArgs),
    /// Remove a tag from a node.
    DeleteTag(DeleteTagArgs),
    /// List the tools or launchers available in the repositories.
    Assets(AssetsArgs),
    /// Copy a tool (and optionally a launcher) into a dataset.
    Setup(SetupArgs),
    /// Validate parameters and write them into a dataset.
    SetParams(SetParamsArgs),
    /// Save the parameters of a dataset as a named set.
    SaveParams(SaveParamsArgs),
    /// List the saved parameter sets of an asset.
    ListParams(AssetParamsArgs),
    /// Print a saved parameter set.
    ReadParams(NamedParamsArgs),
    /// Delete a saved parameter set.
    DeleteParams(DeleteParamsArgs),
    /// Manage asset repositories.
    #[command(subcommand)]
    Repo(RepoCommand),
    /// Register every indexed folder below a path that the registry does not reach.
    Repair(RepairArgs),
}

/// Subcommands of `wb repo`.
#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// List the asset repositories.
    List,
    /// Link a local folder as an asset repository.
    Link(RepoLinkArgs),
    /// Remove a linked asset repository.
    Unlink(RepoUnlinkArgs),
}

/// Addresses one indexed folder.
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct NodeSelector {
    /// Path of the indexed folder.
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Id of the node.
    #[arg(long)]
    pub id: Option<String>,
}

impl NodeSelector {
    /// Turns the selector into a [`NodeRef`].
    pub fn node_ref(&self) -> WorkbenchResult<NodeRef> {
        NodeRef::from_options(self.path.clone(), self.id.clone())
    }
}

/// Arguments of `wb index`.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// The folder to index.
    pub path: PathBuf,

    /// The kind of node to create.
    #[arg(long, short, default_value = "dataset")]
    pub kind: NodeKind,
}

/// Filters shared by `list`, `tree` and `find`.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Keep nodes whose name contains this text.
    #[arg(long)]
    pub name: Option<String>,

    /// Keep nodes whose description contains this text.
    #[arg(long)]
    pub description: Option<String>,

    /// Keep nodes carrying this tag (`key=value`). May be repeated.
    #[arg(long, value_name = "KEY=VALUE")]
    pub tag: Vec<String>,

    /// Leave out the ancestors of the matches (`list` only; `tree` and `find` always draw them).
    #[arg(long, short)]
    pub only_matches: bool,
}

impl QueryArgs {
    /// Builds the filters given on the command line.
    pub fn filters(&self) -> QueryResult<Vec<Filter>> {
        let mut filters = Vec::new();
        if let Some(name) = &self.name {
            filters.push(Filter::parse("name", name)?);
        }
        if let Some(description) = &self.description {
            filters.push(Filter::parse("description", description)?);
        }
        for tag in &self.tag {
            filters.push(Filter::parse("tag", tag)?);
        }
        Ok(filters)
    }
}

/// Arguments of `wb set-name` and `wb set-description`.
#[derive(Args, Debug)]
pub struct SetTextArgs {
    /// The folder to edit.
    #[command(flatten)]
    pub node: NodeSelector,

    /// The new value.
    pub value: String,
}

/// Arguments of `wb set-tag`.
#[derive(Args, Debug)]
pub struct SetTagArgs {
    /// The folder to edit.
    #[command(flatten)]
    pub node: NodeSelector,

    /// The tag key.
    pub key: String,
    /// The tag value.
    pub value: String,
}

/// Arguments of `wb delete-tag`.
#[derive(Args, Debug)]
pub struct DeleteTagArgs {
    /// The folder to edit.
    #[command(flatten)]
    pub node: NodeSelector,

    /// The tag key to remove.
    pub key: String,
}

/// Arguments of `wb assets`.
#[derive(Args, Debug)]
pub struct AssetsArgs {
    /// `tool` or `launcher`.
    #[arg(default_value = "tool")]
    pub kind: AssetKind,

    /// Print the full asset records instead of their names.
    #[arg(long, short)]
    pub long: bool,
}

/// Arguments of `wb setup`.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// The dataset to set up.
    #[command(flatten)]
    pub node: NodeSelector,

    /// The tool to copy, as `name` or `repo/name`.
    #[arg(long)]
    pub tool: String,

    /// A launcher to copy alongside the tool.
    #[arg(long)]
    pub launcher: Option<String>,

    /// Replace files already present in the dataset.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments of `wb set-params`.
#[derive(Args, Debug)]
pub struct SetParamsArgs {
    /// The dataset to write into.
    #[command(flatten)]
    pub node: NodeSelector,

    /// Which asset the parameters are for.
    #[arg(long, default_value = "tool")]
    pub kind: AssetKind,

    /// A parameter value. Parsed as JSON when possible; repeating a name builds a list.
    #[arg(long = "param", short = 'p', value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Start from this saved parameter set.
    #[arg(long)]
    pub from: Option<String>,

    /// Replace parameters already written in the dataset.
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments of `wb save-params`.
#[derive(Args, Debug)]
pub struct SaveParamsArgs {
    /// The dataset to read the parameters from.
    #[command(flatten)]
    pub node: NodeSelector,

    /// Which asset the parameters belong to.
    #[arg(long, default_value = "tool")]
    pub kind: AssetKind,

    /// The name of the saved set.
    #[arg(long)]
    pub name: String,

    /// Replace a saved set with the same name.
    #[arg(long)]
    pub overwrite: bool,
}

/// Names an asset whose saved sets are listed.
#[derive(Args, Debug)]
pub struct AssetParamsArgs {
    /// `tool` or `launcher`.
    #[arg(long, default_value = "tool")]
    pub kind: AssetKind,

    /// The asset, as `name` or `repo/name`.
    pub asset: String,
}

/// Names one saved parameter set.
#[derive(Args, Debug)]
pub struct NamedParamsArgs {
    /// The asset the set belongs to.
    #[command(flatten)]
    pub asset: AssetParamsArgs,

    /// The name of the saved set.
    pub name: String,
}

/// Arguments of `wb delete-params`.
#[derive(Args, Debug)]
pub struct DeleteParamsArgs {
    /// The set to delete.
    #[command(flatten)]
    pub target: NamedParamsArgs,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    pub yes: bool,
}

/// Arguments of `wb repo link`.
#[derive(Args, Debug)]
pub struct RepoLinkArgs {
    /// The local folder containing a `._wb/` asset tree.
    pub path: PathBuf,

    /// Name for the repository. Defaults to the folder name.
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments of `wb repo unlink`.
#[derive(Args, Debug)]
pub struct RepoUnlinkArgs {
    /// The repository to remove.
    pub name: String,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    pub yes: bool,
}

/// Arguments of `wb repair`.
#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Where to start scanning. Defaults to the current directory.
    pub path: Option<PathBuf>,
}

/// Splits `NAME=VALUE` at the first `=`.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

/// Turns `--param` pairs into a parameter map.
///
/// Values that parse as JSON keep their type, anything else is a string.
/// A name given more than once collects its values into a list.
pub fn collect_params(pairs: &[(String, String)]) -> ParamMap {
    let mut grouped: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for (key, raw) in pairs {
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
        grouped.entry(key.as_str()).or_default().push(value);
    }
    grouped
        .into_iter()
        .filter_map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.pop()?
            } else {
                Value::Array(values)
            };
            Some((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[&str]) -> Vec<(String, String)> {
        raw.iter().map(|r| parse_key_value(r).unwrap()).collect()
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("threads=4").unwrap(),
            ("threads".to_string(), "4".to_string())
        );
        assert_eq!(
            parse_key_value("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("=4").is_err());
        assert!(parse_key_value("threads").is_err());
    }

    #[test]
    fn test_collect_params_types_and_lists() {
        let params = collect_params(&pairs(&[
            "threads=4",
            "label=run one",
            "quiet=true",
            "inputs=a.fq",
            "inputs=b.fq",
            "inputs=c.fq",
        ]));
        assert_eq!(params.get("threads"), Some(&json!(4)));
        assert_eq!(params.get("label"), Some(&json!("run one")));
        assert_eq!(params.get("quiet"), Some(&json!(true)));
        assert_eq!(params.get("inputs"), Some(&json!(["a.fq", "b.fq", "c.fq"])));
    }

    #[test]
    fn test_collect_params_json_list_is_kept() {
        let params = collect_params(&pairs(&["pair=[1, 2]"]));
        assert_eq!(params.get("pair"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_query_filters() {
        let args = QueryArgs {
            name: Some("run".into()),
            tag: vec!["stage=raw".into(), "lab=x".into()],
            ..Default::default()
        };
        assert_eq!(args.filters().unwrap().len(), 3);

        let bad = QueryArgs {
            tag: vec!["stage".into()],
            ..Default::default()
        };
        assert!(bad.filters().is_err());
    }
}
