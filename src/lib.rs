//! chart-image-mirror: point Helm chart image references at a private registry mirror
//!
//! Reads a flat `name=registry/path:tag` image list, retargets hosted ECR
//! references at another account and region, and writes the results into the
//! chart's values file without disturbing the rest of the document.

pub mod config;
pub mod domain;
pub mod error;
pub mod registry;
pub mod values;

pub use error::MirrorError;
