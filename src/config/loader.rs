//! Image list loading
//!
//! The image list is a flat text file with one `logical_name=registry/path:tag`
//! entry per line. Blank lines and `#` comments are skipped, and so is anything
//! else that does not have that shape.

use crate::domain::{ImageConfig, ImageConfigEntry};
use crate::error::MirrorError;
use std::fs;
use std::path::Path;

pub fn load_image_config(path: &Path) -> Result<ImageConfig, MirrorError> {
    if !path.exists() {
        return Err(MirrorError::ConfigNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)?;
    let images = parse_image_config(&content);
    tracing::debug!("Loaded {} image entries from {}", images.len(), path.display());
    Ok(images)
}

/// Parse image list text. Later definitions of the same name win.
pub fn parse_image_config(content: &str) -> ImageConfig {
    let mut images = ImageConfig::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!("Skipping line {}: no '=' delimiter", idx + 1);
            continue;
        };

        // The tag is whatever follows the last ':', so registry ports stay in the path.
        let Some((registry_path, tag)) = value.trim().rsplit_once(':') else {
            tracing::debug!("Skipping line {}: no tag in '{}'", idx + 1, value.trim());
            continue;
        };

        images.insert(key.trim().to_string(), ImageConfigEntry::new(registry_path, tag));
    }

    images
}
