#![deny(unsafe_code)]

use std::collections::BTreeMap;

use tracing::debug;

use crf_reference::EntityRegistry;

use crate::error::RuleError;
use crate::rule::RuleGroup;

/// Rule groups registered at start-up, kept in registration order.
///
/// Read-only once handed to a [`RuleEngine`](crate::RuleEngine).
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    groups: Vec<RuleGroup>,
    index: BTreeMap<String, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group; names are unique.
    pub fn register(&mut self, group: RuleGroup) -> Result<(), RuleError> {
        let name = group.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RuleError::DuplicateRuleGroup { name });
        }
        debug!(
            group = %name,
            rules = group.rules().len(),
            is_abstract = group.is_abstract(),
            "registered rule group"
        );
        self.index.insert(name, self.groups.len());
        self.groups.push(group);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&RuleGroup, RuleError> {
        self.index
            .get(name)
            .map(|&position| &self.groups[position])
            .ok_or_else(|| RuleError::UnknownRuleGroup {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Concrete groups triggered by `source`, in registration order.
    pub fn groups_for_source<'r>(
        &'r self,
        source: &'r str,
        entities: &'r EntityRegistry,
    ) -> impl Iterator<Item = &'r RuleGroup> {
        self.groups
            .iter()
            .filter(move |group| !group.is_abstract() && group.is_triggered_by(source, entities))
    }

    /// All groups in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
