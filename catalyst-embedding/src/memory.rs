//! In-memory embedding store for snapshots and tests

use std::collections::BTreeMap;

use catalyst_core::{EntityKind, EntityRef};
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    error::{EmbeddingError, Result},
    filter::MetadataFilter,
    similarity::ensure_finite,
    store::VectorStore,
    types::{EmbeddingRecord, StoreStats},
};

/// Embeddings held in memory, keyed by field then entity
#[derive(Default)]
pub struct InMemoryEmbeddingStore {
    fields: RwLock<BTreeMap<String, BTreeMap<EntityRef, EmbeddingRecord>>>,
}

impl InMemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a batch of records
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = EmbeddingRecord>,
    {
        let store = Self::new();
        for record in records {
            store.upsert(record)?;
        }
        Ok(store)
    }

    /// Save or fully replace an embedding, keeping the original `created_at`
    pub fn upsert(&self, mut record: EmbeddingRecord) -> Result<()> {
        ensure_finite(&record.vector)?;
        let mut fields = self.fields.write();
        let field = fields.entry(record.field.clone()).or_default();

        if let Some(existing) = field.values().next() {
            if existing.dimension() != record.dimension() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: existing.dimension(),
                    actual: record.dimension(),
                });
            }
        }

        if let Some(previous) = field.get(&record.entity) {
            record.created_at = previous.created_at;
        }
        field.insert(record.entity.clone(), record);
        Ok(())
    }

    pub fn delete(&self, kind: EntityKind, entity_id: &str, field: &str) -> bool {
        let key = EntityRef::new(kind, entity_id);
        let mut fields = self.fields.write();
        fields
            .get_mut(field)
            .is_some_and(|records| records.remove(&key).is_some())
    }

    /// Delete every embedding owned by an entity
    pub fn delete_entity(&self, kind: EntityKind, entity_id: &str) -> usize {
        let key = EntityRef::new(kind, entity_id);
        let mut fields = self.fields.write();
        let deleted = fields
            .values_mut()
            .filter_map(|records| records.remove(&key))
            .count();
        fields.retain(|_, records| !records.is_empty());

        debug!("Deleted {} embedding(s) for {}", deleted, key);
        deleted
    }

    pub fn stats(&self) -> StoreStats {
        let fields = self.fields.read();
        let by_field: BTreeMap<String, usize> = fields
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(field, records)| (field.clone(), records.len()))
            .collect();

        StoreStats {
            total: by_field.values().sum(),
            by_field,
        }
    }
}

impl VectorStore for InMemoryEmbeddingStore {
    fn get(&self, kind: EntityKind, entity_id: &str, field: &str) -> Result<Option<EmbeddingRecord>> {
        let key = EntityRef::new(kind, entity_id);
        Ok(self
            .fields
            .read()
            .get(field)
            .and_then(|records| records.get(&key))
            .cloned())
    }

    fn scan(&self, field: &str, filter: Option<&MetadataFilter>) -> Result<Vec<EmbeddingRecord>> {
        let fields = self.fields.read();
        let Some(records) = fields.get(field) else {
            return Ok(Vec::new());
        };

        Ok(records
            .values()
            .filter(|record| filter.is_none_or(|f| f.matches_record(record)))
            .cloned()
            .collect())
    }

    fn dimension(&self, field: &str) -> Result<Option<usize>> {
        Ok(self
            .fields
            .read()
            .get(field)
            .and_then(|records| records.values().next())
            .map(EmbeddingRecord::dimension))
    }
}
