// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A flat map of parameter name to value (scalar or list), as stored in `params.json`.
pub type ParamMap = BTreeMap<String, Value>;

// --- FOLDER INDEX MODELS ---

/// The two kinds of indexed folder.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A leaf-oriented folder meant to hold run configuration. Nothing indexed may nest inside it.
    Dataset,
    /// A grouping folder. Collections nest freely.
    #[default]
    Collection,
}

impl NodeKind {
    /// The lowercase name used in records and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(Self::Dataset),
            "collection" => Ok(Self::Collection),
            other => Err(format!(
                "unknown folder kind '{}' (expected 'dataset' or 'collection')",
                other
            )),
        }
    }
}

/// The record persisted in `<folder>/._wb/index.json`.
///
/// The filesystem location is deliberately absent: it is recomputed on every scan.
/// Keys the workbench does not know about are kept in `extra` so that arbitrary
/// attributes survive a read-modify-write cycle.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// Unique id, a v4 UUID unless imported.
    #[serde(alias = "uuid")]
    pub id: String,
    /// Dataset or collection.
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    /// Display name.
    pub name: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Exact-match `key = value` tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Indexing time, as `%Y-%m-%d %H:%M:%S UTC`.
    #[serde(alias = "indexed_at")]
    pub created_at: String,
    /// Tool key set up in this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Repository the tool came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_repo: Option<String>,
    /// Launcher key set up in this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<String>,
    /// Repository the launcher came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher_repo: Option<String>,
    /// When `setup` last ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_at: Option<String>,
    /// Any other keys, kept as they were read.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IndexRecord {
    /// Returns the asset reference (`repo/key`) bound to this folder for `kind`, if any.
    pub fn attachment(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Tool => self.tool.as_deref(),
            AssetKind::Launcher => self.launcher.as_deref(),
        }
    }

    /// Returns the absolute path of the repository the `kind` asset was copied from, if any.
    pub fn attachment_repo(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Tool => self.tool_repo.as_deref(),
            AssetKind::Launcher => self.launcher_repo.as_deref(),
        }
    }

    /// Binds an asset to this folder.
    pub fn set_attachment(&mut self, kind: AssetKind, reference: String, repo: String) {
        match kind {
            AssetKind::Tool => {
                self.tool = Some(reference);
                self.tool_repo = Some(repo);
            }
            AssetKind::Launcher => {
                self.launcher = Some(reference);
                self.launcher_repo = Some(repo);
            }
        }
    }

    /// Removes the binding for `kind`. Returns `true` if one existed.
    pub fn clear_attachment(&mut self, kind: AssetKind) -> bool {
        let slots = match kind {
            AssetKind::Tool => (&mut self.tool, &mut self.tool_repo),
            AssetKind::Launcher => (&mut self.launcher, &mut self.launcher_repo),
        };
        let existed = slots.0.is_some();
        *slots.0 = None;
        *slots.1 = None;
        existed
    }
}

/// An indexed folder as seen by one tree build: the persisted record plus
/// the derived location and relationships.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Node {
    /// The persisted record.
    #[serde(flatten)]
    pub record: IndexRecord,
    /// Where the folder was found.
    pub path: PathBuf,
    /// Id of the nesting parent.
    pub parent: Option<String>,
    /// Ids of the nested folders, in discovery order.
    pub children: Vec<String>,
}

impl Node {
    /// A node with no relations yet.
    pub fn new(record: IndexRecord, path: PathBuf) -> Self {
        Self {
            record,
            path,
            parent: None,
            children: Vec::new(),
        }
    }

    /// The record id.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The record name.
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

// --- ASSET MODELS ---

/// The kinds of asset a repository may provide.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Something that runs on a dataset.
    Tool,
    /// Something that runs a tool.
    Launcher,
}

impl AssetKind {
    /// Every kind, in listing order.
    pub const ALL: [Self; 2] = [Self::Tool, Self::Launcher];

    /// The directory name used for this kind, both in repositories and in datasets.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Launcher => "launcher",
        }
    }

    /// The prefix for environment variables derived from this kind (e.g. `TOOL_REPO`).
    pub fn env_prefix(self) -> &'static str {
        match self {
            Self::Tool => "TOOL",
            Self::Launcher => "LAUNCHER",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool" | "tools" => Ok(Self::Tool),
            "launcher" | "launchers" => Ok(Self::Launcher),
            other => Err(format!(
                "unknown asset kind '{}' (expected 'tool' or 'launcher')",
                other
            )),
        }
    }
}

/// Cardinality of an asset argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nargs {
    /// `?`: zero or one value.
    #[default]
    Optional,
    /// `*`: any number of values.
    ZeroOrMore,
    /// `+`: at least one value.
    OneOrMore,
    /// A fixed positive count.
    Exact(u32),
}

impl Nargs {
    /// Whether values for this argument are handled as lists.
    pub fn is_list(self) -> bool {
        !matches!(self, Self::Optional | Self::Exact(1))
    }
}

/// The raw JSON shape of `nargs`: either a symbol or a count.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
enum RawNargs {
    Count(u64),
    Symbol(String),
}

impl TryFrom<RawNargs> for Nargs {
    type Error = String;

    fn try_from(raw: RawNargs) -> Result<Self, Self::Error> {
        let count = match raw {
            RawNargs::Symbol(s) => match s.as_str() {
                "?" => return Ok(Self::Optional),
                "*" => return Ok(Self::ZeroOrMore),
                "+" => return Ok(Self::OneOrMore),
                digits => digits
                    .parse::<u64>()
                    .map_err(|_| format!("invalid nargs '{}'", digits))?,
            },
            RawNargs::Count(n) => n,
        };
        match u32::try_from(count) {
            Ok(n) if n > 0 => Ok(Self::Exact(n)),
            _ => Err(format!("nargs must be a positive count, not {}", count)),
        }
    }
}

impl From<Nargs> for RawNargs {
    fn from(nargs: Nargs) -> Self {
        match nargs {
            Nargs::Optional => Self::Symbol("?".to_string()),
            Nargs::ZeroOrMore => Self::Symbol("*".to_string()),
            Nargs::OneOrMore => Self::Symbol("+".to_string()),
            Nargs::Exact(n) => Self::Count(u64::from(n)),
        }
    }
}

impl Serialize for Nargs {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawNargs::from(*self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Nargs {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawNargs::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Declarative description of one asset argument.
///
/// `wb_type`, `wb_choices` and `help` are only read by interactive front-ends;
/// validation ignores them but they are carried through untouched.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ArgSchema {
    /// A value must be given or defaulted.
    #[serde(default)]
    pub required: bool,
    /// Used when no value is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// How many values are accepted.
    #[serde(default)]
    pub nargs: Nargs,
    /// Name of the exported variable. Defaults to the argument name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wb_env: Option<String>,
    /// Separator for list values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wb_sep: Option<String>,
    /// Type hint for front-ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wb_type: Option<String>,
    /// Allowed values, for front-ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wb_choices: Option<Vec<Value>>,
    /// Help text, for front-ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ArgSchema {
    /// The separator used to flatten list values for environment export.
    pub fn separator(&self) -> &str {
        self.wb_sep.as_deref().unwrap_or(" ")
    }
}

/// The deserialized `config.json` of a tool or launcher.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AssetConfig {
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Declared arguments by name.
    pub args: BTreeMap<String, ArgSchema>,
}

// --- PROFILE CONFIGURATION MODELS ---

/// How registry references are written into `data/`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryStyle {
    /// `data/<id>`, a file whose content is the absolute folder path.
    #[default]
    PathFile,
    /// `data/<basename>[_n]`, a symlink to the folder.
    Symlink,
}

/// Output format for structured CLI results.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrintFormat {
    /// Pretty JSON, four-space indent.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

impl FromStr for PrintFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!(
                "unknown print format '{}' (expected 'json' or 'yaml')",
                other
            )),
        }
    }
}

/// Represents the deserialized `<home>/config.toml` of a profile.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProfileConfig {
    /// How registry references are written.
    pub registry_style: RegistryStyle,
    /// Default output format.
    pub print_format: PrintFormat,
    /// Whether enumeration deletes dangling references.
    pub prune_stale_references: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            registry_style: RegistryStyle::PathFile,
            print_format: PrintFormat::Json,
            prune_stale_references: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nargs_parses_symbols_and_counts() {
        let parsed: Vec<Nargs> =
            serde_json::from_value(json!(["?", "*", "+", 2, "3"])).unwrap();
        assert_eq!(
            parsed,
            vec![
                Nargs::Optional,
                Nargs::ZeroOrMore,
                Nargs::OneOrMore,
                Nargs::Exact(2),
                Nargs::Exact(3)
            ]
        );
        assert!(serde_json::from_value::<Nargs>(json!(0)).is_err());
        assert!(serde_json::from_value::<Nargs>(json!("many")).is_err());
    }

    #[test]
    fn test_nargs_list_cardinality() {
        assert!(!Nargs::Optional.is_list());
        assert!(!Nargs::Exact(1).is_list());
        assert!(Nargs::Exact(2).is_list());
        assert!(Nargs::ZeroOrMore.is_list());
        assert!(Nargs::OneOrMore.is_list());
    }

    #[test]
    fn test_index_record_reads_legacy_keys() {
        let record: IndexRecord = serde_json::from_value(json!({
            "uuid": "abc",
            "indexed_at": "2024-01-01 00:00:00 UTC",
            "name": "expA",
            "description": "",
            "custom": 3
        }))
        .unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.kind, NodeKind::Collection);
        assert_eq!(record.created_at, "2024-01-01 00:00:00 UTC");
        assert_eq!(record.extra.get("custom"), Some(&json!(3)));
    }

    #[test]
    fn test_clear_attachment() {
        let mut record: IndexRecord = serde_json::from_value(json!({
            "id": "abc", "name": "a", "created_at": "t", "tool": "repo/aligner", "tool_repo": "/r"
        }))
        .unwrap();
        assert_eq!(record.attachment(AssetKind::Tool), Some("repo/aligner"));
        assert!(record.clear_attachment(AssetKind::Tool));
        assert!(record.tool_repo.is_none());
        assert!(!record.clear_attachment(AssetKind::Launcher));
    }
}
