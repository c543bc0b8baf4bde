//! Error types shared by the pipeline stages.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("ECR config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Values file not found: {}", .0.display())]
    ValuesNotFound(PathBuf),

    #[error("Could not auto-detect account ID. Please provide it as second argument.")]
    AccountLookupFailed { reason: String },

    #[error("Invalid YAML in values file: {0}")]
    InvalidValues(#[from] serde_yaml::Error),

    #[error("Cannot place image override under '{key}': value is not a mapping")]
    NotAMapping { key: String },

    #[error("Invalid override targets in {}: {reason}", path.display())]
    InvalidTargets { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
