//! Legacy field removal sweeps.
//!
//! Each instance applies one declared [`FieldRetirement`]. Records that
//! still carry the field have it removed; records that do not are reported
//! as already removed, which makes re-runs a no-op.

use std::sync::Arc;

use async_trait::async_trait;
use folio_core::change::{CollectionChange, MIGRATION_BOT_USERNAME};
use folio_core::record::StoredRecord;
use folio_core::schema::{FieldRetirement, COLLECTION_NODES, RIGHTS_TRANSLATOR_IDS};
use folio_core::types::EntityKind;
use folio_db::{CollectionService, RecordStore};
use serde_json::Value;

use crate::job::{Emission, JobError, ReducedOutput, SweepJob};

pub const REMOVE_RIGHTS_TRANSLATOR_IDS: &str = "remove_collection_rights_translator_ids";
pub const REMOVE_COLLECTION_NODES: &str = "remove_collection_model_nodes";

/// Shard count requested by both removal sweeps.
pub const REMOVAL_SHARD_COUNT: usize = 64;

/// How a successful removal is persisted.
pub enum RemovalCommit {
    /// Property removal only, no domain commit.
    StorageOnly,
    /// Removal folded into a domain update tagged with `remove_node`.
    CollectionUpdate(CollectionService),
}

pub struct FieldRemovalJob {
    name: &'static str,
    retirement: FieldRetirement,
    store: Arc<dyn RecordStore>,
    commit: RemovalCommit,
}

impl FieldRemovalJob {
    /// Strip `translator_ids` from rights records without touching
    /// `last_updated`.
    pub fn rights_translator_ids(store: Arc<dyn RecordStore>) -> Self {
        Self {
            name: REMOVE_RIGHTS_TRANSLATOR_IDS,
            retirement: RIGHTS_TRANSLATOR_IDS,
            store,
            commit: RemovalCommit::StorageOnly,
        }
    }

    /// Strip the legacy top-level `nodes` from collections through a domain
    /// commit.
    pub fn collection_nodes(store: Arc<dyn RecordStore>) -> Self {
        Self {
            name: REMOVE_COLLECTION_NODES,
            retirement: COLLECTION_NODES,
            commit: RemovalCommit::CollectionUpdate(CollectionService::new(store.clone())),
            store,
        }
    }

    pub fn removed_key(&self) -> String {
        format!("SUCCESS_REMOVED - {}", self.retirement.kind.model_name())
    }

    pub fn already_removed_key(&self) -> String {
        format!("SUCCESS_ALREADY_REMOVED - {}", self.retirement.kind.model_name())
    }

    /// Returns `false` if the field was already gone by the time of the
    /// write.
    async fn remove(&self, record: &StoredRecord) -> Result<bool, JobError> {
        let field = self.retirement.field;
        match &self.commit {
            // Tombstoned collections cannot take a domain commit.
            RemovalCommit::CollectionUpdate(service) if !record.deleted => {
                service
                    .update_collection_retiring(
                        MIGRATION_BOT_USERNAME,
                        &record.id,
                        vec![CollectionChange::RemoveNode],
                        "remove nodes from collection",
                        &[field],
                    )
                    .await?;
                Ok(true)
            }
            _ => Ok(self
                .store
                .remove_property(
                    record.kind,
                    &record.id,
                    field,
                    self.retirement.timestamp_policy,
                )
                .await?),
        }
    }
}

#[async_trait]
impl SweepJob for FieldRemovalJob {
    fn name(&self) -> &'static str {
        self.name
    }

    fn entity_kinds(&self) -> Vec<EntityKind> {
        vec![self.retirement.kind]
    }

    fn shard_count(&self) -> Option<usize> {
        Some(REMOVAL_SHARD_COUNT)
    }

    async fn map(&self, record: StoredRecord) -> Result<Vec<Emission>, JobError> {
        let key = if self.retirement.is_pending(&record) && self.remove(&record).await? {
            tracing::debug!(
                record_id = %record.id,
                field = self.retirement.field,
                "Legacy field removed"
            );
            self.removed_key()
        } else {
            self.already_removed_key()
        };
        Ok(vec![Emission::new(key, record.id)])
    }

    fn reduce(&self, key: &str, values: Vec<Value>) -> Vec<ReducedOutput> {
        vec![ReducedOutput::new(key, values.len())]
    }
}

#[cfg(test)]
mod tests {
    use folio_db::MemoryRecordStore;
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_name_the_model() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let rights = FieldRemovalJob::rights_translator_ids(store.clone());
        assert_eq!(rights.removed_key(), "SUCCESS_REMOVED - CollectionRightsModel");
        assert_eq!(
            rights.already_removed_key(),
            "SUCCESS_ALREADY_REMOVED - CollectionRightsModel"
        );

        let nodes = FieldRemovalJob::collection_nodes(store);
        assert_eq!(nodes.removed_key(), "SUCCESS_REMOVED - CollectionModel");
        assert_eq!(nodes.entity_kinds(), vec![EntityKind::Collection]);
        assert_eq!(nodes.shard_count(), Some(REMOVAL_SHARD_COUNT));
    }

    #[test]
    fn reduce_counts_ids() {
        let job = FieldRemovalJob::rights_translator_ids(Arc::new(MemoryRecordStore::new()));
        assert_eq!(
            job.reduce("SUCCESS_REMOVED - CollectionRightsModel", vec![json!("a"), json!("b")]),
            vec![ReducedOutput::new("SUCCESS_REMOVED - CollectionRightsModel", 2)]
        );
    }
}
