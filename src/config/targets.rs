//! Override target table
//!
//! Each row says where one logical image lands in the values document and in
//! which shape. The built-in rows follow the values schema of the subcharts
//! bundled with the HyperPod chart; a YAML file can replace them.

use crate::error::MirrorError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_OVERRIDE_COMMENT: &str = "ECR override for air-gapped environment";

/// What the leaf of an override holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// Registry path without the tag.
    Repository,
    /// Full `registry/path:tag` reference.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideTarget {
    /// Logical image name in the image list.
    pub image: String,
    /// Top-level key in the values document.
    pub key: String,
    /// Child of `key` that is replaced wholesale.
    pub field: String,
    /// Path below `field` leading to the leaf.
    #[serde(default)]
    pub nested: Vec<String>,
    pub shape: ValueShape,
    pub label: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl OverrideTarget {
    fn builtin(
        image: &str,
        key: &str,
        field: &str,
        nested: &[&str],
        shape: ValueShape,
        label: &str,
    ) -> Self {
        Self {
            image: image.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            nested: nested.iter().map(|s| s.to_string()).collect(),
            shape,
            label: label.to_string(),
            comment: None,
        }
    }

    pub fn comment(&self) -> &str {
        self.comment.as_deref().unwrap_or(DEFAULT_OVERRIDE_COMMENT)
    }
}

pub fn builtin_targets() -> Vec<OverrideTarget> {
    vec![
        OverrideTarget::builtin(
            "nvidia-k8s-device-plugin",
            "nvidia-device-plugin",
            "image",
            &["repository"],
            ValueShape::Repository,
            "NVIDIA Device Plugin",
        ),
        OverrideTarget::builtin(
            "aws-efa-k8s-device-plugin",
            "aws-efa-k8s-device-plugin",
            "image",
            &["repository"],
            ValueShape::Repository,
            "AWS EFA Device Plugin",
        ),
        OverrideTarget::builtin(
            "mpi-operator",
            "mpi-operator",
            "mpiOperator",
            &["image", "repository"],
            ValueShape::Repository,
            "MPI Operator",
        ),
        OverrideTarget::builtin(
            "hyperpod-health-monitoring-agent",
            "health-monitoring-agent",
            "hmaimage",
            &[],
            ValueShape::Reference,
            "Health Monitoring Agent",
        ),
    ]
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetsFile {
    targets: Vec<OverrideTarget>,
}

/// Use the table in `path` when given, the built-in table otherwise.
pub fn load_targets(path: Option<&Path>) -> Result<Vec<OverrideTarget>, MirrorError> {
    let Some(path) = path else {
        return Ok(builtin_targets());
    };

    let invalid = |reason: String| MirrorError::InvalidTargets { path: path.to_path_buf(), reason };

    let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let parsed: TargetsFile = serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?;

    for target in &parsed.targets {
        if target.image.trim().is_empty() || target.key.trim().is_empty() {
            return Err(invalid("every target needs a non-empty image and key".to_string()));
        }
        if target.field.trim().is_empty() {
            return Err(invalid(format!("target '{}' has an empty field", target.image)));
        }
    }

    tracing::debug!("Loaded {} override targets from {}", parsed.targets.len(), path.display());
    Ok(parsed.targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn builtin_table_covers_four_components() {
        let targets = builtin_targets();
        let keys: Vec<&str> = targets.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            keys,
            ["nvidia-device-plugin", "aws-efa-k8s-device-plugin", "mpi-operator", "health-monitoring-agent"]
        );
        assert_eq!(targets[3].shape, ValueShape::Reference);
        assert_eq!(targets[2].nested, ["image", "repository"]);
    }

    #[test]
    fn default_comment_applies_without_override() {
        assert_eq!(builtin_targets()[0].comment(), DEFAULT_OVERRIDE_COMMENT);
    }

    #[test]
    fn no_path_means_builtin_table() {
        assert_eq!(load_targets(None).expect("targets"), builtin_targets());
    }

    #[test]
    fn loads_table_from_yaml() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("targets.yaml");
        fs::write(
            &path,
            "targets:\n\
             \x20 - image: neuron-device-plugin\n\
             \x20   key: neuron-device-plugin\n\
             \x20   field: image\n\
             \x20   nested: [repository]\n\
             \x20   shape: repository\n\
             \x20   label: Neuron Device Plugin\n\
             \x20   comment: mirrored\n",
        )
        .expect("write");

        let targets = load_targets(Some(&path)).expect("targets");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].image, "neuron-device-plugin");
        assert_eq!(targets[0].shape, ValueShape::Repository);
        assert_eq!(targets[0].comment(), "mirrored");
    }

    #[test]
    fn rejects_unknown_shape() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("targets.yaml");
        fs::write(
            &path,
            "targets:\n  - {image: a, key: a, field: image, shape: digest, label: A}\n",
        )
        .expect("write");

        let err = load_targets(Some(&path)).unwrap_err();
        assert!(matches!(err, MirrorError::InvalidTargets { .. }));
    }

    #[test]
    fn rejects_empty_field() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("targets.yaml");
        fs::write(
            &path,
            "targets:\n  - {image: a, key: a, field: '', shape: reference, label: A}\n",
        )
        .expect("write");

        assert!(load_targets(Some(&path)).is_err());
    }
}
