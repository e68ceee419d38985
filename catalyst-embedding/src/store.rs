//! Embedding storage: the read-side trait and the SQLite-backed store

use std::path::Path;
use std::sync::Arc;

use catalyst_core::{EntityKind, EntityRef};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{EmbeddingError, Result},
    filter::MetadataFilter,
    similarity::{ensure_finite, rank_matches},
    types::{content_hash, EmbeddingMetadata, EmbeddingRecord, SimilarityMatch, StoreStats},
};

/// Read access to stored embeddings
///
/// Implementations must keep every vector within a field at the same
/// dimensionality.
pub trait VectorStore: Send + Sync {
    /// Point lookup; a missing embedding is `Ok(None)`
    fn get(&self, kind: EntityKind, entity_id: &str, field: &str) -> Result<Option<EmbeddingRecord>>;

    /// Every record in `field` passing `filter`, ordered by entity
    fn scan(&self, field: &str, filter: Option<&MetadataFilter>) -> Result<Vec<EmbeddingRecord>>;

    /// Established dimensionality of `field`, if it holds any vectors
    fn dimension(&self, field: &str) -> Result<Option<usize>>;

    /// Nearest neighbours of `query` within `field`
    ///
    /// The filter is applied before any similarity is computed. A query whose
    /// length differs from the field's dimensionality is rejected.
    fn similar_to(
        &self,
        query: &[f32],
        field: &str,
        limit: usize,
        threshold: f64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SimilarityMatch>> {
        let Some(expected) = self.dimension(field)? else {
            debug!("Field '{}' holds no embeddings", field);
            return Ok(Vec::new());
        };
        if expected != query.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: query.len(),
            });
        }
        ensure_finite(query)?;

        let candidates = self.scan(field, filter)?;
        rank_matches(query, candidates, limit, threshold)
    }
}

/// Raw row before the vector blob is decoded
struct StoredRow {
    entity_type: String,
    entity_id: String,
    field: String,
    embedding: Vec<u8>,
    dimension: i64,
    model: Option<String>,
    content_hash: Option<String>,
    metadata: EmbeddingMetadata,
    created_at: i64,
    updated_at: i64,
}

const SELECT_COLUMNS: &str = "entity_type, entity_id, field_name, embedding, dimension, model,
    content_hash, funding_year, fund_label, campaign_title, is_funded, amount_requested,
    currency, created_at, updated_at";

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_type: row.get(0)?,
            entity_id: row.get(1)?,
            field: row.get(2)?,
            embedding: row.get(3)?,
            dimension: row.get(4)?,
            model: row.get(5)?,
            content_hash: row.get(6)?,
            metadata: EmbeddingMetadata {
                funding_year: row.get(7)?,
                fund_label: row.get(8)?,
                campaign_title: row.get(9)?,
                is_funded: row.get(10)?,
                amount_requested: row.get(11)?,
                currency: row.get(12)?,
            },
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn kind(&self) -> Option<EntityKind> {
        self.entity_type.parse().ok()
    }

    /// Decode into a record, skipping rows that violate the store invariants
    fn into_record(self, kind: EntityKind) -> Result<Option<EmbeddingRecord>> {
        let (vector, _): (Vec<f32>, usize) =
            bincode::decode_from_slice(&self.embedding, bincode::config::standard())?;

        if vector.len() as i64 != self.dimension {
            warn!(
                "Skipping {}:{} field '{}': stored dimension {} but vector has {}",
                self.entity_type,
                self.entity_id,
                self.field,
                self.dimension,
                vector.len()
            );
            return Ok(None);
        }
        if let Err(e) = ensure_finite(&vector) {
            warn!(
                "Skipping {}:{} field '{}': {}",
                self.entity_type, self.entity_id, self.field, e
            );
            return Ok(None);
        }

        Ok(Some(EmbeddingRecord {
            entity: EntityRef::new(kind, self.entity_id),
            field: self.field,
            vector,
            metadata: self.metadata,
            model: self.model,
            content_hash: self.content_hash,
            created_at: from_timestamp(self.created_at),
            updated_at: from_timestamp(self.updated_at),
        }))
    }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

/// SQLite store for embeddings
pub struct EmbeddingStore {
    conn: Arc<Mutex<Connection>>,
}

impl EmbeddingStore {
    /// Open (or create) an embedding store
    ///
    /// # Arguments
    /// * `database_path` - Path to SQLite database file
    #[instrument(skip(database_path))]
    pub fn new<P: AsRef<Path> + std::fmt::Debug>(database_path: P) -> Result<Self> {
        info!("Opening embedding database: {:?}", database_path.as_ref());
        let conn = Connection::open(database_path.as_ref())
            .map_err(|e| EmbeddingError::Database(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            EmbeddingError::Database(format!("Failed to create in-memory DB: {}", e))
        })?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS model_embeddings (
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                field_name TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL,
                model TEXT,
                content_hash TEXT,
                funding_year INTEGER,
                fund_label TEXT,
                campaign_title TEXT,
                is_funded INTEGER NOT NULL DEFAULT 0,
                amount_requested REAL,
                currency TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (entity_type, entity_id, field_name)
            );

            CREATE INDEX IF NOT EXISTS idx_model_embeddings_field
            ON model_embeddings(field_name, entity_type, entity_id);

            CREATE INDEX IF NOT EXISTS idx_model_embeddings_fund
            ON model_embeddings(field_name, fund_label, funding_year);
            "#,
        )?;

        info!("Embedding database tables initialized");
        Ok(())
    }

    /// Save or fully replace an embedding
    ///
    /// Rejects a vector whose length differs from the dimensionality already
    /// established for its field, or that holds NaN or infinite values.
    #[instrument(skip(self, record), fields(entity = %record.entity, field = %record.field))]
    pub fn upsert(&self, record: &EmbeddingRecord) -> Result<()> {
        ensure_finite(&record.vector)?;
        let embedding_bytes = bincode::encode_to_vec(&record.vector, bincode::config::standard())?;
        let meta = &record.metadata;
        let conn = self.conn.lock();

        if let Some(expected) = field_dimension(&conn, &record.field)? {
            if expected != record.dimension() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: record.dimension(),
                });
            }
        }

        conn.execute(
            "INSERT INTO model_embeddings
             (entity_type, entity_id, field_name, embedding, dimension, model, content_hash,
              funding_year, fund_label, campaign_title, is_funded, amount_requested, currency,
              created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(entity_type, entity_id, field_name) DO UPDATE SET
                embedding = excluded.embedding,
                dimension = excluded.dimension,
                model = excluded.model,
                content_hash = excluded.content_hash,
                funding_year = excluded.funding_year,
                fund_label = excluded.fund_label,
                campaign_title = excluded.campaign_title,
                is_funded = excluded.is_funded,
                amount_requested = excluded.amount_requested,
                currency = excluded.currency,
                updated_at = excluded.updated_at",
            params![
                record.entity.kind.as_str(),
                &record.entity.id,
                &record.field,
                &embedding_bytes,
                record.dimension() as i64,
                &record.model,
                &record.content_hash,
                meta.funding_year,
                &meta.fund_label,
                &meta.campaign_title,
                meta.is_funded,
                meta.amount_requested,
                &meta.currency,
                record.created_at.timestamp(),
                record.updated_at.timestamp(),
            ],
        )?;

        debug!("Saved embedding");
        Ok(())
    }

    /// Delete one field's embedding of an entity
    pub fn delete(&self, kind: EntityKind, entity_id: &str, field: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM model_embeddings
             WHERE entity_type = ? AND entity_id = ? AND field_name = ?",
            params![kind.as_str(), entity_id, field],
        )?;

        debug!("Deleted {} embedding(s) for {}:{} '{}'", deleted, kind, entity_id, field);
        Ok(deleted > 0)
    }

    /// Delete every embedding owned by an entity
    pub fn delete_entity(&self, kind: EntityKind, entity_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM model_embeddings WHERE entity_type = ? AND entity_id = ?",
            params![kind.as_str(), entity_id],
        )?;

        debug!("Deleted {} embedding(s) for {}:{}", deleted, kind, entity_id);
        Ok(deleted)
    }

    /// Whether the stored embedding is missing or was built from other text
    pub fn needs_update(
        &self,
        kind: EntityKind,
        entity_id: &str,
        field: &str,
        source_text: &str,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let stored: Option<Option<String>> = conn
            .query_row(
                "SELECT content_hash FROM model_embeddings
                 WHERE entity_type = ? AND entity_id = ? AND field_name = ?",
                params![kind.as_str(), entity_id, field],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match stored {
            Some(Some(hash)) => hash != content_hash(source_text),
            _ => true,
        })
    }

    /// Record counts per field
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT field_name, COUNT(*) FROM model_embeddings
             GROUP BY field_name ORDER BY field_name",
        )?;

        let rows = stmt.query_map([], |row| {
            let field: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((field, count as usize))
        })?;

        let mut stats = StoreStats::default();
        for row in rows {
            let (field, count) = row?;
            stats.total += count;
            stats.by_field.insert(field, count);
        }

        Ok(stats)
    }
}

impl VectorStore for EmbeddingStore {
    #[instrument(skip(self))]
    fn get(&self, kind: EntityKind, entity_id: &str, field: &str) -> Result<Option<EmbeddingRecord>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM model_embeddings
             WHERE entity_type = ? AND entity_id = ? AND field_name = ?"
        );

        let row = conn
            .query_row(&sql, params![kind.as_str(), entity_id, field], StoredRow::from_row)
            .optional()?;

        match row {
            Some(row) => row.into_record(kind),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter))]
    fn scan(&self, field: &str, filter: Option<&MetadataFilter>) -> Result<Vec<EmbeddingRecord>> {
        let conn = self.conn.lock();
        let Some(expected) = field_dimension(&conn, field)? else {
            return Ok(Vec::new());
        };
        let sql = format!("SELECT {SELECT_COLUMNS} FROM model_embeddings WHERE field_name = ?");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![field], StoredRow::from_row)?;

        let mut records = Vec::new();
        let mut filtered_out = 0usize;
        for row in rows {
            let row = row?;
            let Some(kind) = row.kind() else {
                warn!("Skipping embedding with unknown entity type '{}'", row.entity_type);
                continue;
            };
            if row.dimension != expected as i64 {
                warn!(
                    "Skipping {}:{} field '{}': dimension {} but field has {}",
                    row.entity_type, row.entity_id, field, row.dimension, expected
                );
                continue;
            }
            if filter.is_some_and(|f| !f.matches(kind, &row.metadata)) {
                filtered_out += 1;
                continue;
            }
            let entity = format!("{}:{}", row.entity_type, row.entity_id);
            match row.into_record(kind) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("Skipping {} field '{}': {}", entity, field, e),
            }
        }

        records.sort_by(|a, b| a.entity.cmp(&b.entity));
        debug!(
            "Scanned field '{}': {} records kept, {} filtered out",
            field,
            records.len(),
            filtered_out
        );
        Ok(records)
    }

    fn dimension(&self, field: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock();
        field_dimension(&conn, field)
    }
}

/// Dimension of the oldest stored row in `field`
fn field_dimension(conn: &Connection, field: &str) -> Result<Option<usize>> {
    let dimension: Option<i64> = conn
        .query_row(
            "SELECT dimension FROM model_embeddings WHERE field_name = ?
             ORDER BY rowid LIMIT 1",
            params![field],
            |row| row.get(0),
        )
        .optional()?;

    Ok(dimension.map(|d| d as usize))
}
