//! In-process [`RecordStore`] used by tests.
//!
//! Behaves like the Postgres store: version-guarded saves, atomic property
//! removal, append-only commit log. Write failures can be injected per
//! record id to exercise the engine's retry path.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use folio_core::change::CommitLogEntry;
use folio_core::record::StoredRecord;
use folio_core::schema::TimestampPolicy;
use folio_core::types::{EntityKind, RecordId};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::RecordStore;

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<(EntityKind, RecordId), StoredRecord>>,
    commits: RwLock<Vec<CommitLogEntry>>,
    /// Record ids whose writes fail, with the number of failures left
    /// (`None` = fail forever).
    failing_writes: RwLock<HashMap<RecordId, Option<u32>>>,
    written: RwLock<HashSet<(EntityKind, RecordId)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `id` fail until cleared.
    pub async fn fail_writes_for(&self, id: impl Into<RecordId>) {
        self.failing_writes.write().await.insert(id.into(), None);
    }

    /// Make the next `times` writes to `id` fail, then succeed.
    pub async fn fail_next_writes_for(&self, id: impl Into<RecordId>, times: u32) {
        self.failing_writes
            .write()
            .await
            .insert(id.into(), Some(times));
    }

    /// Whether any write (save or property removal) reached `id`.
    pub async fn was_written(&self, kind: EntityKind, id: &str) -> bool {
        self.written
            .read()
            .await
            .contains(&(kind, id.to_string()))
    }

    /// Number of commit log entries across all records.
    pub async fn commit_count(&self) -> usize {
        self.commits.read().await.len()
    }

    async fn check_write(&self, id: &str) -> Result<(), StoreError> {
        let mut failing = self.failing_writes.write().await;
        match failing.get_mut(id) {
            None => Ok(()),
            Some(None) => Err(StoreError::Unavailable(format!("write to {id} rejected"))),
            Some(Some(0)) => {
                failing.remove(id);
                Ok(())
            }
            Some(Some(left)) => {
                *left -= 1;
                Err(StoreError::Unavailable(format!("write to {id} rejected")))
            }
        }
    }

    async fn mark_written(&self, kind: EntityKind, id: &str) {
        self.written.write().await.insert((kind, id.to_string()));
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<RecordId>, StoreError> {
        let records = self.records.read().await;
        let mut ids: Vec<RecordId> = records
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn insert(&self, record: &StoredRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let key = (record.kind, record.id.clone());
        if records.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: record.kind,
                id: record.id.clone(),
            });
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn save(&self, record: &StoredRecord, expected_version: i32) -> Result<(), StoreError> {
        self.check_write(&record.id).await?;
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&(record.kind, record.id.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind: record.kind,
                id: record.id.clone(),
            })?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                kind: record.kind,
                id: record.id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        let created_at = stored.created_at;
        *stored = record.clone();
        stored.created_at = created_at;
        stored.last_updated = chrono::Utc::now();
        drop(records);

        self.mark_written(record.kind, &record.id).await;
        Ok(())
    }

    async fn remove_property(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
        policy: TimestampPolicy,
    ) -> Result<bool, StoreError> {
        self.check_write(id).await?;
        let mut records = self.records.write().await;
        let Some(stored) = records.get_mut(&(kind, id.to_string())) else {
            return Ok(false);
        };
        if stored.properties.remove(field).is_none() {
            return Ok(false);
        }
        if policy == TimestampPolicy::Touch {
            stored.last_updated = chrono::Utc::now();
        }
        drop(records);

        self.mark_written(kind, id).await;
        Ok(true)
    }

    async fn append_commit(&self, entry: &CommitLogEntry) -> Result<(), StoreError> {
        self.commits.write().await.push(entry.clone());
        Ok(())
    }

    async fn list_commits(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Vec<CommitLogEntry>, StoreError> {
        let mut commits: Vec<CommitLogEntry> = self
            .commits
            .read()
            .await
            .iter()
            .filter(|c| c.kind == kind && c.record_id == id)
            .cloned()
            .collect();
        commits.sort_by_key(|c| c.version);
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use folio_core::record::Properties;
    use serde_json::json;

    use super::*;

    fn rights(id: &str, with_translators: bool) -> StoredRecord {
        let mut props = Properties::new();
        props.insert("owner_ids".into(), json!(["u1"]));
        if with_translators {
            props.insert("translator_ids".into(), json!(["u2"]));
        }
        StoredRecord::new(EntityKind::CollectionRights, id, 1, props)
    }

    #[tokio::test]
    async fn list_ids_is_scoped_by_kind_and_sorted() {
        let store = MemoryRecordStore::new();
        store.insert(&rights("b", true)).await.unwrap();
        store.insert(&rights("a", true)).await.unwrap();
        store
            .insert(&StoredRecord::new(EntityKind::Collection, "c", 4, Properties::new()))
            .await
            .unwrap();

        assert_eq!(
            store.list_ids(EntityKind::CollectionRights).await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(store.list_ids(EntityKind::Collection).await.unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryRecordStore::new();
        store.insert(&rights("a", true)).await.unwrap();
        assert_matches!(
            store.insert(&rights("a", false)).await,
            Err(StoreError::AlreadyExists { .. })
        );
    }

    #[tokio::test]
    async fn save_checks_version() {
        let store = MemoryRecordStore::new();
        let record = rights("a", true);
        store.insert(&record).await.unwrap();

        let mut next = record.clone();
        next.version = 1;
        store.save(&next, 0).await.unwrap();
        assert_matches!(
            store.save(&next, 0).await,
            Err(StoreError::VersionConflict { expected: 0, found: 1, .. })
        );
        assert!(store.was_written(EntityKind::CollectionRights, "a").await);
    }

    #[tokio::test]
    async fn remove_property_is_idempotent_and_preserves_timestamp() {
        let store = MemoryRecordStore::new();
        let record = rights("a", true);
        store.insert(&record).await.unwrap();

        let removed = store
            .remove_property(
                EntityKind::CollectionRights,
                "a",
                "translator_ids",
                TimestampPolicy::Preserve,
            )
            .await
            .unwrap();
        assert!(removed);
        let again = store
            .remove_property(
                EntityKind::CollectionRights,
                "a",
                "translator_ids",
                TimestampPolicy::Preserve,
            )
            .await
            .unwrap();
        assert!(!again);

        let stored = store.get(EntityKind::CollectionRights, "a").await.unwrap().unwrap();
        assert!(!stored.has_property("translator_ids"));
        assert_eq!(stored.last_updated, record.last_updated);
    }

    #[tokio::test]
    async fn injected_failures_run_out() {
        let store = MemoryRecordStore::new();
        store.insert(&rights("a", true)).await.unwrap();
        store.fail_next_writes_for("a", 1).await;

        assert_matches!(
            store
                .remove_property(
                    EntityKind::CollectionRights,
                    "a",
                    "translator_ids",
                    TimestampPolicy::Preserve
                )
                .await,
            Err(StoreError::Unavailable(_))
        );
        assert!(store
            .remove_property(
                EntityKind::CollectionRights,
                "a",
                "translator_ids",
                TimestampPolicy::Preserve
            )
            .await
            .unwrap());
    }
}
