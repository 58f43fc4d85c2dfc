// src/constants.rs

/// The name of the hidden directory holding workbench files inside an indexed folder.
pub const WB_DIR: &str = "._wb";

/// The name of the index record for a folder (inside `._wb/`).
pub const INDEX_FILENAME: &str = "index.json";

/// The name of the registry directory inside a profile home.
pub const DATA_DIR: &str = "data";

/// The name of the directory holding saved parameter sets inside a profile home.
pub const PARAMS_DIR: &str = "params";

/// The name of the directory holding asset repositories inside a profile home.
pub const REPOSITORIES_DIR: &str = "repositories";

/// The configuration file of an asset (tool or launcher).
pub const ASSET_CONFIG_FILENAME: &str = "config.json";

/// The executable script of an asset.
pub const ASSET_SCRIPT_FILENAME: &str = "run.sh";

/// The validated parameters written into a dataset (inside `._wb/<kind>/`).
pub const PARAMS_FILENAME: &str = "params.json";

/// The shell-sourceable environment script written next to the parameters.
pub const ENV_FILENAME: &str = "env";

/// The profile configuration file (inside the profile home).
pub const PROFILE_CONFIG_FILENAME: &str = "config.toml";

/// The default base folder, relative to the user's home directory.
pub const DEFAULT_BASE_FOLDER: &str = "~/._workbench";

/// The profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// Argument names an asset may not declare, since the CLI reserves them.
pub const DISALLOWED_ARG_NAMES: &[&str] = &["base_folder", "profile", "filesystem", "print_format"];
