// src/cli/handlers/mod.rs

// One module per group of `wb` commands.

/// `assets` and `setup`.
pub mod assets;
/// Name, description and tag edits.
pub mod attributes;
/// Helpers shared by handlers.
pub mod commons;
/// `index`.
pub mod index;
/// Parameter commands.
pub mod params;
/// `repair`.
pub mod repair;
/// `repo list`, `repo link` and `repo unlink`.
pub mod repo;
/// `list`, `tree` and `find`.
pub mod tree;
