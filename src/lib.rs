//! Indexes analysis folders as datasets and collections, builds them into a
//! queryable tree, and prepares datasets with tools, launchers and parameters.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

/// Command-line front-end.
pub mod cli;
/// Reserved names and defaults.
pub mod constants;
/// Domain logic.
pub mod core;
/// Serialized data models.
pub mod models;
