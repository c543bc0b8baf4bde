//! Core data types

use std::collections::BTreeMap;
use std::fmt;

/// Image list keyed by logical image name.
pub type ImageConfig = BTreeMap<String, ImageConfigEntry>;

/// One `name=registry/path:tag` line of the image list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfigEntry {
    pub registry_path: String,
    pub tag: String,
}

impl ImageConfigEntry {
    pub fn new(registry_path: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { registry_path: registry_path.into(), tag: tag.into() }
    }

    /// `registry_path:tag`
    pub fn full_reference(&self) -> String {
        format!("{}:{}", self.registry_path, self.tag)
    }
}

/// Account and region the mirrored images should be pulled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryTarget {
    pub region: String,
    pub account_id: String,
}

impl RegistryTarget {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self { region: region.into(), account_id: account_id.into() }
    }

    pub fn registry_host(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }
}

/// An override actually written into the values document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOverride {
    pub label: String,
    pub reference: String,
}

impl fmt::Display for AppliedOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.reference)
    }
}
