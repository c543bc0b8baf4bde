//! Helm values file editing
//!
//! - [`tree`] is the editing interface, with a plain-mapping implementation
//! - [`document`] edits block-style YAML line by line, keeping comments
//! - [`merge`] applies the override table and writes the file back
//! - [`backup`] keeps a timestamped copy of the file before it changes

pub mod backup;
pub mod document;
pub mod merge;
pub mod tree;

pub use document::ValuesDocument;
pub use merge::{apply_overrides, backup_values_file, load_tree, merge_values_file, override_value};
pub use tree::ValuesTree;
