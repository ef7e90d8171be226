//! Collection domain service.
//!
//! Loads collections through the schema migration chain and applies
//! semantic change lists, persisting the result with a commit log entry.

use std::sync::Arc;

use folio_core::change::{apply_changes, CollectionChange, CommitLogEntry};
use folio_core::collection::Collection;
use folio_core::error::CoreError;
use folio_core::record::StoredRecord;
use folio_core::types::EntityKind;

use crate::error::StoreError;
use crate::store::RecordStore;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Domain operations on collections, backed by an injected store.
#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn RecordStore>,
}

impl CollectionService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Load a live collection, upgraded to the current schema version.
    pub async fn get_collection_by_id(&self, id: &str) -> Result<Collection, ServiceError> {
        let record = self.load_live(id).await?;
        Ok(Collection::from_stored(&record)?)
    }

    /// Apply `changes` to a collection and persist the result.
    ///
    /// The content is written at the current schema version and merged over
    /// the stored properties, so keys that are not domain fields survive.
    /// The write is guarded by the version read at load time.
    pub async fn update_collection(
        &self,
        actor_id: &str,
        id: &str,
        changes: Vec<CollectionChange>,
        commit_message: &str,
    ) -> Result<Collection, ServiceError> {
        self.commit(actor_id, id, changes, commit_message, &[]).await
    }

    /// Like [`update_collection`](Self::update_collection), but also drops
    /// `retired_fields` from the stored properties in the same write.
    pub async fn update_collection_retiring(
        &self,
        actor_id: &str,
        id: &str,
        changes: Vec<CollectionChange>,
        commit_message: &str,
        retired_fields: &[&str],
    ) -> Result<Collection, ServiceError> {
        self.commit(actor_id, id, changes, commit_message, retired_fields)
            .await
    }

    async fn commit(
        &self,
        actor_id: &str,
        id: &str,
        changes: Vec<CollectionChange>,
        commit_message: &str,
        retired_fields: &[&str],
    ) -> Result<Collection, ServiceError> {
        if changes.is_empty() {
            return Err(CoreError::Validation(format!(
                "Cannot commit an empty change list to collection {id}"
            ))
            .into());
        }

        let record = self.load_live(id).await?;
        let mut collection = Collection::from_stored(&record)?;
        apply_changes(&mut collection, &changes)?;
        collection.validate(false)?;

        let expected_version = record.version;
        collection.version = expected_version + 1;

        let mut updated = record;
        updated.properties.extend(collection.to_properties());
        for field in retired_fields {
            updated.properties.remove(*field);
        }
        updated.schema_version = collection.schema_version;
        updated.version = collection.version;
        self.store.save(&updated, expected_version).await?;

        self.store
            .append_commit(&CommitLogEntry {
                kind: EntityKind::Collection,
                record_id: id.to_string(),
                version: collection.version,
                actor_id: actor_id.to_string(),
                commit_message: commit_message.to_string(),
                commands: changes,
                created_at: chrono::Utc::now(),
            })
            .await?;

        tracing::info!(
            collection_id = %id,
            version = collection.version,
            actor = %actor_id,
            "Collection updated"
        );
        Ok(collection)
    }

    async fn load_live(&self, id: &str) -> Result<StoredRecord, ServiceError> {
        match self.store.get(EntityKind::Collection, id).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(CoreError::NotFound {
                entity: "Collection",
                id: id.to_string(),
            }
            .into()),
        }
    }
}
