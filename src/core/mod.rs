// src/core/mod.rs

/// Asset catalog and repository links.
pub mod assets;
/// Small helpers shared across modules.
pub mod commons;
/// Profile `config.toml`.
pub mod config;
/// Filtering and path queries over a built tree.
pub mod filter;
/// Per-folder index records.
pub mod folder_index;
/// Parameter validation and env script generation.
pub mod parameters;
/// Location resolution.
pub mod paths;
/// Registry of indexed folders.
pub mod registry;
/// Named parameter sets stored in the profile.
pub mod saved_params;
/// Tree construction from the registry.
pub mod tree_builder;
/// Text rendering of a tree.
pub mod tree_display;
/// The opened profile.
pub mod workbench;
