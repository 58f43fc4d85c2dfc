// src/core/parameters.rs

//! Validates parameter values against an asset's argument schema and writes
//! them into a dataset as `params.json` plus a sourceable `env` script.

use crate::constants::{ENV_FILENAME, PARAMS_FILENAME};
use crate::core::commons::{self, shell_single_quote};
use crate::models::{ArgSchema, Nargs, ParamMap};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// The fixed first lines of every generated environment script.
pub const ENV_PREAMBLE: &str = "#!/bin/bash\n\nset -e\n\n####";

/// One reason a parameter set failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ParamIssue {
    /// A required argument has no value and no default.
    MissingRequired {
        /// The argument.
        name: String,
    },
    /// The value count does not fit `nargs`.
    ArityMismatch {
        /// The argument.
        name: String,
        /// The `nargs` form.
        expected: String,
        /// How many values were given.
        found: usize,
    },
    /// A list-valued argument has a scalar default.
    DefaultNotList {
        /// The argument.
        name: String,
    },
    /// A value was given for an argument the asset does not declare.
    UnknownParameter {
        /// The parameter.
        name: String,
    },
}

impl fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired { name } => write!(f, "missing required parameter '{}'", name),
            Self::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "parameter '{}' must contain {} element(s), found {}",
                name, expected, found
            ),
            Self::DefaultNotList { name } => write!(
                f,
                "parameter '{}' is a list, but its default value is not a list",
                name
            ),
            Self::UnknownParameter { name } => write!(f, "unknown parameter '{}'", name),
        }
    }
}

fn format_issues(issues: &[ParamIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  - {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors raised while validating or writing parameters.
#[derive(Error, Debug)]
pub enum ParamError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// A `params.json` is not valid JSON.
    #[error("Malformed parameter file '{path}': {source}")]
    Json {
        /// The offending file.
        path: String,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },
    /// Validation found problems.
    #[error("Invalid parameters:\n{}", format_issues(.0))]
    Invalid(Vec<ParamIssue>),
    /// Parameters already exist and overwriting was not requested.
    #[error("Cannot write '{0}': the file exists and overwrite was not requested.")]
    Collision(String),
}

/// Result alias for parameter operations.
pub type ParamResult<T> = Result<T, ParamError>;

/// The outcome of [`validate`]: the resolved values and every problem found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Values after defaults are applied.
    pub params: ParamMap,
    /// Every problem found.
    pub issues: Vec<ParamIssue>,
}

impl Validation {
    /// True when nothing was reported.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns the parameters, or every issue at once.
    pub fn into_result(self) -> ParamResult<ParamMap> {
        if self.issues.is_empty() {
            Ok(self.params)
        } else {
            Err(ParamError::Invalid(self.issues))
        }
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Checks `values` against `args`.
///
/// A supplied value wins over the default. Values of list-cardinality
/// arguments given as a scalar become one-element lists. Problems are
/// collected rather than reported one at a time.
pub fn validate(args: &BTreeMap<String, ArgSchema>, values: &ParamMap) -> Validation {
    let mut validation = Validation::default();

    for (name, schema) in args {
        let default = present(schema.default.as_ref());
        let is_list = schema.nargs.is_list();
        if is_list && default.is_some_and(|d| !d.is_array()) {
            validation.issues.push(ParamIssue::DefaultNotList { name: name.clone() });
            continue;
        }

        let value = present(values.get(name)).or(default).cloned();
        let value = match value {
            Some(v) if is_list && !v.is_array() => Some(Value::Array(vec![v])),
            other => other,
        };

        let Some(value) = value else {
            if schema.required || matches!(schema.nargs, Nargs::Exact(_)) {
                validation.issues.push(ParamIssue::MissingRequired { name: name.clone() });
            }
            continue;
        };

        let found = value.as_array().map_or(1, Vec::len);
        let arity = match schema.nargs {
            Nargs::Exact(n) if usize::try_from(n).ok() != Some(found) => Some(n.to_string()),
            Nargs::OneOrMore if found == 0 => Some("at least 1".to_string()),
            _ => None,
        };
        if let Some(expected) = arity {
            validation.issues.push(ParamIssue::ArityMismatch {
                name: name.clone(),
                expected,
                found,
            });
            continue;
        }
        validation.params.insert(name.clone(), value);
    }

    for name in values.keys() {
        if !args.contains_key(name) {
            validation.issues.push(ParamIssue::UnknownParameter { name: name.clone() });
        }
    }
    validation
}

/// Renders a scalar for the shell: strings verbatim, everything else as JSON.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flattens a value for export, joining list elements with `sep`.
pub fn flatten(value: &Value, sep: &str) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(sep),
        other => scalar_to_string(other),
    }
}

/// Builds the environment script for `params`.
///
/// Every argument with a `wb_env` mapping and a value gets one `export` line,
/// in schema order, followed by the `extra` exports. There is no trailing newline.
pub fn env_script(
    args: &BTreeMap<String, ArgSchema>,
    params: &ParamMap,
    extra: &[(String, String)],
) -> String {
    let mut script = ENV_PREAMBLE.to_string();
    for (name, schema) in args {
        let (Some(env_name), Some(value)) = (schema.wb_env.as_deref(), params.get(name)) else {
            continue;
        };
        let flat = flatten(value, schema.separator());
        script.push_str(&format!("\nexport {}={}", env_name, shell_single_quote(&flat)));
    }
    for (env_name, value) in extra {
        script.push_str(&format!("\nexport {}={}", env_name, shell_single_quote(value)));
    }
    script
}

/// Writes `params.json` and `env` into `dir`.
///
/// Both targets are checked for collisions before either is written.
pub fn serialize(
    dir: &Path,
    args: &BTreeMap<String, ArgSchema>,
    params: &ParamMap,
    extra: &[(String, String)],
    overwrite: bool,
) -> ParamResult<(PathBuf, PathBuf)> {
    let params_path = dir.join(PARAMS_FILENAME);
    let env_path = dir.join(ENV_FILENAME);
    if !overwrite {
        for target in [&params_path, &env_path] {
            if target.exists() {
                return Err(ParamError::Collision(target.display().to_string()));
            }
        }
    }
    fs::create_dir_all(dir)?;
    commons::write_json_pretty(&params_path, params)?;
    fs::write(&env_path, env_script(args, params, extra))?;
    log::info!("Wrote '{}' and '{}'", params_path.display(), env_path.display());
    Ok((params_path, env_path))
}

/// Reads a `params.json` from `dir`, if there is one.
pub fn read_params(dir: &Path) -> ParamResult<Option<ParamMap>> {
    let path = dir.join(PARAMS_FILENAME);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ParamError::Json {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> BTreeMap<String, ArgSchema> {
        serde_json::from_value(value).unwrap()
    }

    fn values(value: Value) -> ParamMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_fixed_arity() {
        let args = schema(json!({"pair": {"nargs": 2}}));
        let one = validate(&args, &values(json!({"pair": ["a"]})));
        assert_eq!(
            one.issues,
            vec![ParamIssue::ArityMismatch {
                name: "pair".into(),
                expected: "2".into(),
                found: 1
            }]
        );
        let two = validate(&args, &values(json!({"pair": ["a", "b"]})));
        assert!(two.is_valid());
        // A missing fixed-count argument is reported as missing.
        let none = validate(&args, &ParamMap::new());
        assert_eq!(
            none.issues,
            vec![ParamIssue::MissingRequired { name: "pair".into() }]
        );
    }

    #[test]
    fn test_star_accepts_any_length() {
        let args = schema(json!({"files": {"nargs": "*"}}));
        for supplied in [json!([]), json!(["a"]), json!(["a", "b", "c"])] {
            let v = validate(&args, &values(json!({ "files": supplied })));
            assert!(v.is_valid(), "{:?}", v.issues);
        }
        assert!(validate(&args, &ParamMap::new()).is_valid());
    }

    #[test]
    fn test_scalar_is_wrapped_for_lists() {
        let args = schema(json!({"files": {"nargs": "+"}, "single": {"nargs": 1}}));
        let v = validate(&args, &values(json!({"files": "a.txt", "single": "x"})));
        assert!(v.is_valid());
        assert_eq!(v.params.get("files"), Some(&json!(["a.txt"])));
        assert_eq!(v.params.get("single"), Some(&json!("x")));

        let empty = validate(&args, &values(json!({"files": [], "single": "x"})));
        assert!(matches!(
            empty.issues.as_slice(),
            [ParamIssue::ArityMismatch { .. }]
        ));
    }

    #[test]
    fn test_required_defaults_and_unknown() {
        let args = schema(json!({
            "threads": {"default": 4},
            "input": {"required": true},
            "modes": {"nargs": "*", "default": "fast"}
        }));
        let v = validate(&args, &values(json!({"extra": 1, "input": null})));
        assert_eq!(
            v.issues,
            vec![
                ParamIssue::MissingRequired { name: "input".into() },
                ParamIssue::DefaultNotList { name: "modes".into() },
                ParamIssue::UnknownParameter { name: "extra".into() },
            ]
        );
        assert_eq!(v.params.get("threads"), Some(&json!(4)));
        assert!(matches!(v.into_result(), Err(ParamError::Invalid(issues)) if issues.len() == 3));
    }

    #[test]
    fn test_env_script_format() {
        let args = schema(json!({
            "threads": {"wb_env": "THREADS"},
            "files": {"nargs": "*", "wb_env": "FILES", "wb_sep": ","},
            "quiet": {},
            "label": {"wb_env": "LABEL"}
        }));
        let params = values(json!({
            "threads": 4,
            "files": ["a", "b"],
            "quiet": true,
            "label": "it's"
        }));
        let script = env_script(&args, &params, &[("TOOL_REPO".into(), "/r".into())]);
        assert_eq!(
            script,
            "#!/bin/bash\n\nset -e\n\n####\nexport FILES='a,b'\nexport LABEL='it'\\''s'\nexport THREADS='4'\nexport TOOL_REPO='/r'"
        );
        assert_eq!(env_script(&BTreeMap::new(), &ParamMap::new(), &[]), ENV_PREAMBLE);
    }

    #[test]
    fn test_serialize_refuses_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let args = schema(json!({"threads": {"wb_env": "THREADS"}}));
        let params = values(json!({"threads": 4}));
        serialize(dir.path(), &args, &params, &[], false).unwrap();
        assert_eq!(read_params(dir.path()).unwrap(), Some(params.clone()));
        assert!(matches!(
            serialize(dir.path(), &args, &params, &[], false),
            Err(ParamError::Collision(_))
        ));
        serialize(dir.path(), &args, &values(json!({"threads": 8})), &[], true).unwrap();
        assert_eq!(
            read_params(dir.path()).unwrap().unwrap().get("threads"),
            Some(&json!(8))
        );
    }
}
