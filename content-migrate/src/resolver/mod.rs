//! Identifier resolution.
//!
//! Holds the run-scoped identifier maps and translates relation values read from the
//! snapshot into target-side references.

use std::collections::HashMap;

use content_migrate_shared::{IdentifierMap, RecordId};
use serde_json::{Map, Value};

use crate::config::RelationField;

/// Mutable state of one import run.
///
/// One identifier map per collection plus one for media files. Created at the start of
/// a run, threaded through the uploader and importer, dropped at the end.
#[derive(Debug, Default)]
pub struct RunContext {
    records: HashMap<String, IdentifierMap>,
    files: IdentifierMap,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier map of `collection`, if any record of it was created.
    pub fn record_ids(&self, collection: &str) -> Option<&IdentifierMap> {
        self.records.get(collection)
    }

    pub fn record_ids_mut(&mut self, collection: &str) -> &mut IdentifierMap {
        self.records.entry(collection.to_string()).or_default()
    }

    pub fn files(&self) -> &IdentifierMap {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut IdentifierMap {
        &mut self.files
    }
}

/// Translate one relation value into its target-side form.
///
/// - a list maps element-wise; unresolved elements are dropped, and a list with no
///   resolved element yields `None`
/// - `null` yields `None`
/// - a scalar id or an object carrying `id_field` yields the target id, or `None` when
///   the referenced record has no mapping
pub fn resolve_relation(value: &Value, id_field: &str, ids: &IdentifierMap) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let resolved: Vec<Value> = items
                .iter()
                .filter_map(|item| resolve_single(item, id_field, ids))
                .collect();
            (!resolved.is_empty()).then_some(Value::Array(resolved))
        }
        single => resolve_single(single, id_field, ids),
    }
}

fn resolve_single(value: &Value, id_field: &str, ids: &IdentifierMap) -> Option<Value> {
    RecordId::from_reference(value, id_field)
        .and_then(|source| ids.resolve(&source))
        .map(RecordId::to_value)
}

/// Build the relation patch of one snapshot record.
///
/// Reads every declared relation field of `record`, resolves it through the map of the
/// relation's target collection and keeps the fields that resolved. An empty map means
/// nothing is left to restore.
pub fn build_relation_patch(
    record: &Value,
    relations: &[RelationField],
    id_field: &str,
    context: &RunContext,
) -> Map<String, Value> {
    let mut patch = Map::new();
    for relation in relations {
        let Some(value) = record.get(&relation.field) else {
            continue;
        };
        let Some(ids) = context.record_ids(&relation.target) else {
            continue;
        };
        if let Some(resolved) = resolve_relation(value, id_field, ids) {
            patch.insert(relation.field.clone(), resolved);
        }
    }
    patch
}
