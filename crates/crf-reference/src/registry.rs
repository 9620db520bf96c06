use std::collections::BTreeMap;

use crf_model::EntityName;

use crate::error::ReferenceError;

/// Maps logical entity names (`circumcision`) to the storage name the
/// reference source files observations under (`bcpp_subject.circumcision`).
///
/// Built once at start-up and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: BTreeMap<String, EntityName>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping.
    pub fn insert(&mut self, logical: &str, storage: EntityName) {
        self.entries
            .insert(logical.trim().to_ascii_lowercase(), storage);
    }

    /// Resolve a logical name, or accept a storage name that is already
    /// registered.
    pub fn resolve(&self, name: &str) -> Result<&EntityName, ReferenceError> {
        let key = name.trim().to_ascii_lowercase();
        if let Some(storage) = self.entries.get(&key) {
            return Ok(storage);
        }
        self.entries
            .values()
            .find(|storage| storage.as_str() == key)
            .ok_or_else(|| ReferenceError::unknown_entity(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Check that every name resolves; reports the first unknown one.
    pub fn require_all<'n, I>(&self, names: I) -> Result<(), ReferenceError>
    where
        I: IntoIterator<Item = &'n str>,
    {
        for name in names {
            self.resolve(name)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityName)> {
        self.entries
            .iter()
            .map(|(logical, storage)| (logical.as_str(), storage))
    }
}
