//! Configuration inputs
//!
//! The image list (`ecr-images.conf`) and the table of values-file locations
//! each image is written to.

pub mod loader;
pub mod targets;

pub use loader::{load_image_config, parse_image_config};
pub use targets::{builtin_targets, load_targets, OverrideTarget, ValueShape};
