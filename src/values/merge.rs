//! Writing image overrides into the values document

use super::backup::backup_file;
use super::document::{parse_root, ValuesDocument};
use super::tree::ValuesTree;
use crate::config::{OverrideTarget, ValueShape};
use crate::domain::{AppliedOverride, ImageConfig, ImageConfigEntry};
use crate::error::MirrorError;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// The value written at `target.field` for `entry`.
pub fn override_value(entry: &ImageConfigEntry, target: &OverrideTarget) -> Value {
    let leaf = match target.shape {
        ValueShape::Repository => Value::String(entry.registry_path.clone()),
        ValueShape::Reference => Value::String(entry.full_reference()),
    };
    target.nested.iter().rev().fold(leaf, |inner, key| {
        let mut wrapper = Mapping::new();
        wrapper.insert(Value::String(key.clone()), inner);
        Value::Mapping(wrapper)
    })
}

/// Apply every target whose image is in `images`. Other keys are left alone.
pub fn apply_overrides(
    tree: &mut dyn ValuesTree,
    images: &ImageConfig,
    targets: &[OverrideTarget],
) -> Result<Vec<AppliedOverride>, MirrorError> {
    let mut applied = Vec::new();

    for target in targets {
        let Some(entry) = images.get(&target.image) else {
            tracing::debug!("No image configured for {}, leaving '{}' alone", target.image, target.key);
            continue;
        };

        tree.set_field(&target.key, &target.field, override_value(entry, target))?;
        if !tree.annotate(&target.key, &target.field, target.comment()) {
            tracing::debug!("Document cannot hold comments; {}.{} left bare", target.key, target.field);
        }

        let reference = entry.full_reference();
        tracing::info!("{} -> {}.{} = {}", target.image, target.key, target.field, reference);
        applied.push(AppliedOverride { label: target.label.clone(), reference });
    }

    Ok(applied)
}

/// Pick the editable form of `text`: line-preserving when the layout allows it.
pub fn load_tree(text: &str) -> Result<Box<dyn ValuesTree>, MirrorError> {
    let root = parse_root(text)?;
    match ValuesDocument::from_text(text, root.clone()) {
        Some(doc) => Ok(Box::new(doc)),
        None => {
            tracing::warn!("Values file is not block-style YAML; it will be reformatted and comments dropped");
            Ok(Box::new(root))
        }
    }
}

/// Check that `path` exists and take a timestamped copy of it.
pub fn backup_values_file(path: &Path) -> Result<PathBuf, MirrorError> {
    if !path.exists() {
        return Err(MirrorError::ValuesNotFound(path.to_path_buf()));
    }
    backup_file(path)
}

/// Apply the overrides to `path` and write it back in place.
pub fn merge_values_file(
    path: &Path,
    images: &ImageConfig,
    targets: &[OverrideTarget],
) -> Result<Vec<AppliedOverride>, MirrorError> {
    if !path.exists() {
        return Err(MirrorError::ValuesNotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    let mut tree = load_tree(&text)?;
    let applied = apply_overrides(tree.as_mut(), images, targets)?;
    fs::write(path, tree.render()?)?;
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{builtin_targets, parse_image_config};
    use crate::domain::RegistryTarget;
    use crate::registry::rewrite_images;
    use tempfile::TempDir;

    const VALUES: &str = "\
# HyperPod umbrella chart
namespace: kubeflow

nvidia-device-plugin:
  # GPU nodes only
  devicePlugin:
    enabled: true

health-monitoring-agent:
  hmaimage: public.ecr.aws/hyperpod/hma:1.0.0 # upstream

trainingOperators:
  enabled: true
";

    fn lookup<'a>(root: &'a Value, path: &[&str]) -> &'a Value {
        path.iter().fold(root, |node, key| &node[*key])
    }

    fn render_with(text: &str, conf: &str) -> (String, Vec<AppliedOverride>) {
        let mut images = parse_image_config(conf);
        rewrite_images(&mut images, &RegistryTarget::new("us-east-1", "222222222222"));
        let mut tree = load_tree(text).expect("tree");
        let applied = apply_overrides(tree.as_mut(), &images, &builtin_targets()).expect("apply");
        (tree.render().expect("render"), applied)
    }

    #[test]
    fn override_value_shapes() {
        let entry = ImageConfigEntry::new("repo/mpi", "v1");
        let targets = builtin_targets();

        let mpi = override_value(&entry, &targets[2]);
        assert_eq!(lookup(&mpi, &["image", "repository"]), &Value::String("repo/mpi".into()));

        let hma = override_value(&entry, &targets[3]);
        assert_eq!(hma, Value::String("repo/mpi:v1".into()));
    }

    #[test]
    fn mpi_operator_scenario() {
        let (rendered, applied) = render_with(
            VALUES,
            "mpi-operator=111111111111.dkr.ecr.us-west-2.amazonaws.com/mpi:v1\n",
        );
        let parsed: Value = serde_yaml::from_str(&rendered).expect("yaml");

        assert_eq!(
            lookup(&parsed, &["mpi-operator", "mpiOperator", "image", "repository"]),
            &Value::String("222222222222.dkr.ecr.us-east-1.amazonaws.com/mpi".into())
        );
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to_string(), "MPI Operator: 222222222222.dkr.ecr.us-east-1.amazonaws.com/mpi:v1");
    }

    #[test]
    fn missing_health_agent_entry_leaves_section_alone() {
        let (rendered, applied) = render_with(VALUES, "nvidia-k8s-device-plugin=nvcr.io/nvidia/k8s-device-plugin:v0.16.1\n");

        assert!(applied.iter().all(|a| a.label != "Health Monitoring Agent"));
        assert!(rendered.contains(
            "health-monitoring-agent:\n  hmaimage: public.ecr.aws/hyperpod/hma:1.0.0 # upstream\n"
        ));
    }

    #[test]
    fn existing_section_keeps_comments_and_gets_annotation() {
        let (rendered, _) =
            render_with(VALUES, "nvidia-k8s-device-plugin=nvcr.io/nvidia/k8s-device-plugin:v0.16.1\n");

        assert!(rendered.starts_with("# HyperPod umbrella chart\nnamespace: kubeflow\n\nnvidia-device-plugin:\n  # GPU nodes only\n"));
        assert!(rendered.contains(
            "    enabled: true\n  # ECR override for air-gapped environment\n  image:\n    repository: nvcr.io/nvidia/k8s-device-plugin\n"
        ));
        assert!(rendered.ends_with("trainingOperators:\n  enabled: true\n"));
    }

    #[test]
    fn keys_outside_the_table_are_never_created() {
        let (rendered, applied) = render_with(
            "namespace: kubeflow\n",
            "some-sidecar=111111111111.dkr.ecr.us-west-2.amazonaws.com/sidecar:v2\n",
        );
        assert!(applied.is_empty());
        assert_eq!(rendered, "namespace: kubeflow\n");
    }

    #[test]
    fn merge_is_idempotent() {
        let conf = "\
nvidia-k8s-device-plugin=nvcr.io/nvidia/k8s-device-plugin:v0.16.1
aws-efa-k8s-device-plugin=111111111111.dkr.ecr.us-west-2.amazonaws.com/efa:v0.5.6
mpi-operator=111111111111.dkr.ecr.us-west-2.amazonaws.com/mpi:v1
hyperpod-health-monitoring-agent=111111111111.dkr.ecr.us-west-2.amazonaws.com/hma:1.2
";
        let (first, applied) = render_with(VALUES, conf);
        let (second, _) = render_with(&first, conf);

        assert_eq!(applied.len(), 4);
        assert_eq!(first, second);
        assert_eq!(second.matches("# ECR override for air-gapped environment").count(), 4);
    }

    #[test]
    fn flow_style_document_falls_back_without_comments() {
        let (rendered, applied) = render_with(
            "{namespace: kubeflow}\n",
            "hyperpod-health-monitoring-agent=repo/hma:1.2\n",
        );
        let parsed: Value = serde_yaml::from_str(&rendered).expect("yaml");

        assert_eq!(applied.len(), 1);
        assert_eq!(
            lookup(&parsed, &["health-monitoring-agent", "hmaimage"]),
            &Value::String("repo/hma:1.2".into())
        );
        assert!(!rendered.contains('#'));
    }

    #[test]
    fn backup_then_merge_writes_in_place() {
        let tmp = TempDir::new().expect("tmp");
        let values = tmp.path().join("values.yaml");
        fs::write(&values, VALUES).expect("write");
        let images = parse_image_config("mpi-operator=repo/mpi:v1\n");

        let backup = backup_values_file(&values).expect("backup");
        let applied = merge_values_file(&values, &images, &builtin_targets()).expect("merge");

        assert_eq!(fs::read_to_string(&backup).expect("backup"), VALUES);
        assert!(fs::read_to_string(&values).expect("values").contains("mpiOperator:"));
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn empty_values_file_starts_from_empty_mapping() {
        let tmp = TempDir::new().expect("tmp");
        let values = tmp.path().join("values.yaml");
        fs::write(&values, "").expect("write");
        let images = parse_image_config("aws-efa-k8s-device-plugin=repo/efa:v1\n");

        merge_values_file(&values, &images, &builtin_targets()).expect("merge");

        let parsed: Value =
            serde_yaml::from_str(&fs::read_to_string(&values).expect("read")).expect("yaml");
        assert_eq!(
            lookup(&parsed, &["aws-efa-k8s-device-plugin", "image", "repository"]),
            &Value::String("repo/efa".into())
        );
    }

    #[test]
    fn aliased_values_file_is_written_as_valid_yaml() {
        let tmp = TempDir::new().expect("tmp");
        let values = tmp.path().join("values.yaml");
        fs::write(&values, "nvidia-device-plugin:\n  image: &img\n    repository: a\nother:\n  image: *img\n")
            .expect("write");
        let images = parse_image_config("nvidia-k8s-device-plugin=mirror/plugin:v1\n");

        merge_values_file(&values, &images, &builtin_targets()).expect("merge");

        let parsed: Value =
            serde_yaml::from_str(&fs::read_to_string(&values).expect("read")).expect("yaml");
        assert_eq!(
            lookup(&parsed, &["nvidia-device-plugin", "image", "repository"]),
            &Value::String("mirror/plugin".into())
        );
        assert_eq!(lookup(&parsed, &["other", "image", "repository"]), &Value::String("a".into()));
    }

    #[test]
    fn missing_values_file_is_an_error() {
        let tmp = TempDir::new().expect("tmp");
        let missing = tmp.path().join("values.yaml");

        let err = backup_values_file(&missing).unwrap_err();
        assert!(matches!(err, MirrorError::ValuesNotFound(_)));
        let err = merge_values_file(&missing, &ImageConfig::new(), &builtin_targets()).unwrap_err();
        assert!(matches!(err, MirrorError::ValuesNotFound(_)));
        assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);
    }
}
