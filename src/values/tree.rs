//! The editing surface the merger works against.

use crate::error::MirrorError;
use serde_yaml::{Mapping, Value};

pub trait ValuesTree {
    /// Replace `key.field` with `value`, creating `key` as an empty mapping when absent.
    fn set_field(&mut self, key: &str, field: &str, value: Value) -> Result<(), MirrorError>;

    /// Put a comment directly above `key.field`.
    ///
    /// Returns `false` when the tree has nowhere to keep comments.
    fn annotate(&mut self, _key: &str, _field: &str, _comment: &str) -> bool {
        false
    }

    fn render(&self) -> Result<String, MirrorError>;
}

/// Plain mapping: edits are exact but comments and layout are lost on render.
impl ValuesTree for Mapping {
    fn set_field(&mut self, key: &str, field: &str, value: Value) -> Result<(), MirrorError> {
        let slot = self
            .entry(Value::String(key.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if slot.is_null() {
            *slot = Value::Mapping(Mapping::new());
        }

        let Value::Mapping(section) = slot else {
            return Err(MirrorError::NotAMapping { key: key.to_string() });
        };
        section.insert(Value::String(field.to_string()), value);
        Ok(())
    }

    fn render(&self) -> Result<String, MirrorError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
