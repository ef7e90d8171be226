//! The injected record store.
//!
//! Sweeps and the collection service receive an `Arc<dyn RecordStore>` at
//! construction time instead of looking models up globally.
//! [`PgRecordStore`] backs it with Postgres;
//! [`MemoryRecordStore`](crate::memory::MemoryRecordStore) keeps everything
//! in process.

use async_trait::async_trait;
use folio_core::change::CommitLogEntry;
use folio_core::record::StoredRecord;
use folio_core::schema::TimestampPolicy;
use folio_core::types::{EntityKind, RecordId};

use crate::error::StoreError;
use crate::repositories::{CommitLogRepo, RecordRepo};
use crate::DbPool;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids of every record of `kind`, tombstoned ones included.
    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<RecordId>, StoreError>;

    /// Load one record, tombstoned or not.
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<StoredRecord>, StoreError>;

    /// Insert a new record.
    async fn insert(&self, record: &StoredRecord) -> Result<(), StoreError>;

    /// Overwrite `record` if the stored version equals `expected_version`.
    /// Sets `last_updated` to now.
    async fn save(&self, record: &StoredRecord, expected_version: i32) -> Result<(), StoreError>;

    /// Remove one property atomically. Returns `true` if it was present.
    async fn remove_property(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
        policy: TimestampPolicy,
    ) -> Result<bool, StoreError>;

    async fn append_commit(&self, entry: &CommitLogEntry) -> Result<(), StoreError>;

    /// Commits for one record, oldest first.
    async fn list_commits(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Vec<CommitLogEntry>, StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// [`RecordStore`] over the Postgres repositories.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<RecordId>, StoreError> {
        Ok(RecordRepo::list_ids(&self.pool, kind).await?)
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        RecordRepo::find_by_id(&self.pool, kind, id)
            .await?
            .map(|row| row.into_stored(kind))
            .transpose()
    }

    async fn insert(&self, record: &StoredRecord) -> Result<(), StoreError> {
        if RecordRepo::insert(&self.pool, record).await? {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists {
                kind: record.kind,
                id: record.id.clone(),
            })
        }
    }

    async fn save(&self, record: &StoredRecord, expected_version: i32) -> Result<(), StoreError> {
        if RecordRepo::update_versioned(&self.pool, record, expected_version).await? {
            return Ok(());
        }
        match RecordRepo::current_version(&self.pool, record.kind, &record.id).await? {
            Some(found) => Err(StoreError::VersionConflict {
                kind: record.kind,
                id: record.id.clone(),
                expected: expected_version,
                found,
            }),
            None => Err(StoreError::NotFound {
                kind: record.kind,
                id: record.id.clone(),
            }),
        }
    }

    async fn remove_property(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
        policy: TimestampPolicy,
    ) -> Result<bool, StoreError> {
        let touch = policy == TimestampPolicy::Touch;
        Ok(RecordRepo::remove_property(&self.pool, kind, id, field, touch).await?)
    }

    async fn append_commit(&self, entry: &CommitLogEntry) -> Result<(), StoreError> {
        let row_id = CommitLogRepo::insert(&self.pool, entry).await?;
        tracing::debug!(
            row_id,
            kind = %entry.kind,
            record_id = %entry.record_id,
            version = entry.version,
            "Commit log entry written"
        );
        Ok(())
    }

    async fn list_commits(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Vec<CommitLogEntry>, StoreError> {
        CommitLogRepo::list_for_record(&self.pool, kind, id)
            .await?
            .into_iter()
            .map(CommitLogEntry::try_from)
            .collect()
    }
}
