//! Source-to-target identifier mapping.

use std::collections::HashMap;

use crate::types::record_id::RecordId;

/// Run-scoped mapping from source identifiers to the identifiers the target store
/// assigned on creation.
///
/// A source identifier maps to at most one target identifier. A missing entry means the
/// record was never created (or its creation failed) and must be treated as unresolved.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMap {
    entries: HashMap<RecordId, RecordId>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `source` was created as `target`.
    ///
    /// Returns `false` and keeps the existing mapping if `source` is already mapped.
    pub fn record(&mut self, source: RecordId, target: RecordId) -> bool {
        if self.entries.contains_key(&source) {
            return false;
        }
        self.entries.insert(source, target);
        true
    }

    /// Target identifier for `source`, if it was created in this run.
    pub fn resolve(&self, source: &RecordId) -> Option<&RecordId> {
        self.entries.get(source)
    }

    pub fn contains(&self, source: &RecordId) -> bool {
        self.entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &RecordId)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_resolve() {
        let mut map = IdentifierMap::new();
        assert!(map.record(RecordId::Numeric(1), RecordId::Numeric(101)));

        assert_eq!(map.resolve(&RecordId::Numeric(1)), Some(&RecordId::Numeric(101)));
        assert_eq!(map.resolve(&RecordId::Numeric(2)), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_first_mapping_wins() {
        let mut map = IdentifierMap::new();
        map.record(RecordId::Numeric(1), RecordId::Numeric(101));

        assert!(!map.record(RecordId::Numeric(1), RecordId::Numeric(202)));
        assert_eq!(map.resolve(&RecordId::Numeric(1)), Some(&RecordId::Numeric(101)));
    }

    #[test]
    fn test_numeric_and_text_ids_are_distinct() {
        let mut map = IdentifierMap::new();
        map.record(RecordId::Numeric(1), RecordId::Numeric(10));

        assert!(!map.contains(&RecordId::from("1")));
    }
}
