//! Hosted registry URL rewriting

use crate::domain::{ImageConfig, RegistryTarget};
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// `<12-digit account>.dkr.ecr.<region>.amazonaws.com`
static ECR_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{12}\.dkr\.ecr\.[^.]+\.amazonaws\.com").expect("valid regex")
});

pub fn is_ecr_path(registry_path: &str) -> bool {
    ECR_HOST.is_match(registry_path)
}

/// Point every ECR host in `registry_path` at `target`. Anything else comes back unchanged.
pub fn rewrite_registry_path(registry_path: &str, target: &RegistryTarget) -> String {
    let host = target.registry_host();
    ECR_HOST.replace_all(registry_path, NoExpand(&host)).into_owned()
}

/// Rewrite all ECR-hosted entries in place and return how many changed.
pub fn rewrite_images(images: &mut ImageConfig, target: &RegistryTarget) -> usize {
    let mut rewritten = 0;
    for (name, entry) in images.iter_mut() {
        if !is_ecr_path(&entry.registry_path) {
            tracing::debug!("{} is not ECR hosted, leaving {}", name, entry.registry_path);
            continue;
        }
        let updated = rewrite_registry_path(&entry.registry_path, target);
        tracing::debug!("{}: {} -> {}", name, entry.registry_path, updated);
        entry.registry_path = updated;
        rewritten += 1;
    }
    rewritten
}
