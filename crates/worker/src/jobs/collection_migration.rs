//! Collection schema migration sweep.
//!
//! Loads every live collection through the domain service (which upgrades
//! the content in memory), validates it, and writes it back tagged with a
//! `migrate_schema_to_latest_version` command.

use async_trait::async_trait;
use folio_core::change::{CollectionChange, MIGRATION_BOT_USERNAME};
use folio_core::error::CoreError;
use folio_core::migration::CURRENT_COLLECTION_SCHEMA_VERSION;
use folio_core::record::StoredRecord;
use folio_core::types::EntityKind;
use folio_db::CollectionService;
use serde_json::Value;

use crate::job::{sum_counts, Emission, JobError, ReducedOutput, SweepJob};

pub const JOB_NAME: &str = "collection_migration";

/// Outcome key for tombstoned collections.
pub const DELETED_KEY: &str = "collection_deleted";
/// Outcome key for collections that failed non-strict validation.
pub const ERROR_KEY: &str = "validation_error";
/// Outcome key for collections written back at the current version.
pub const MIGRATED_KEY: &str = "collection_migrated";

pub struct CollectionMigrationJob {
    service: CollectionService,
}

impl CollectionMigrationJob {
    pub fn new(service: CollectionService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SweepJob for CollectionMigrationJob {
    fn name(&self) -> &'static str {
        JOB_NAME
    }

    fn entity_kinds(&self) -> Vec<EntityKind> {
        vec![EntityKind::Collection]
    }

    async fn map(&self, record: StoredRecord) -> Result<Vec<Emission>, JobError> {
        if record.deleted {
            return Ok(vec![Emission::new(DELETED_KEY, 1)]);
        }

        // The read brings the collection up to the newest schema version.
        let collection = self.service.get_collection_by_id(&record.id).await?;
        if let Err(e) = collection.validate(false) {
            let reason = match e {
                CoreError::Validation(msg) => msg,
                other => other.to_string(),
            };
            tracing::error!(collection_id = %record.id, error = %reason, "Collection failed validation");
            return Ok(vec![Emission::new(
                ERROR_KEY,
                format!("Collection {} failed validation: {reason}", record.id),
            )]);
        }

        // `<=` also rewrites collections already at the current version.
        if record.schema_version <= CURRENT_COLLECTION_SCHEMA_VERSION {
            let changes = vec![CollectionChange::MigrateSchemaToLatestVersion {
                from_version: record.schema_version,
                to_version: CURRENT_COLLECTION_SCHEMA_VERSION.to_string(),
            }];
            self.service
                .update_collection(
                    MIGRATION_BOT_USERNAME,
                    &record.id,
                    changes,
                    &format!(
                        "Update collection schema version to {CURRENT_COLLECTION_SCHEMA_VERSION}."
                    ),
                )
                .await?;
            return Ok(vec![Emission::new(MIGRATED_KEY, 1)]);
        }

        Ok(Vec::new())
    }

    fn reduce(&self, key: &str, values: Vec<Value>) -> Vec<ReducedOutput> {
        let summary = match key {
            DELETED_KEY => format!("Encountered {} deleted collections.", sum_counts(&values)),
            MIGRATED_KEY => format!("{} collections successfully migrated.", sum_counts(&values)),
            _ => return vec![ReducedOutput::new(key, Value::Array(values))],
        };
        vec![ReducedOutput::new(key, Value::Array(vec![summary.into()]))]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use folio_db::MemoryRecordStore;
    use serde_json::json;

    use super::*;

    fn job() -> CollectionMigrationJob {
        CollectionMigrationJob::new(CollectionService::new(Arc::new(MemoryRecordStore::new())))
    }

    #[test]
    fn reduce_summarises_counts() {
        let job = job();
        assert_eq!(
            job.reduce(DELETED_KEY, vec![json!(1), json!(1)]),
            vec![ReducedOutput::new(
                DELETED_KEY,
                json!(["Encountered 2 deleted collections."])
            )]
        );
        assert_eq!(
            job.reduce(MIGRATED_KEY, vec![json!(1)]),
            vec![ReducedOutput::new(
                MIGRATED_KEY,
                json!(["1 collections successfully migrated."])
            )]
        );
    }

    #[test]
    fn reduce_passes_errors_through() {
        let errors = vec![json!("Collection a failed validation: x"), json!("Collection b failed validation: y")];
        assert_eq!(
            job().reduce(ERROR_KEY, errors.clone()),
            vec![ReducedOutput::new(ERROR_KEY, Value::Array(errors))]
        );
    }

    #[tokio::test]
    async fn deleted_record_emits_without_loading() {
        let record = StoredRecord::new(
            EntityKind::Collection,
            "missing-from-store",
            1,
            Default::default(),
        )
        .tombstoned();
        let emissions = job().map(record).await.unwrap();
        assert_eq!(emissions, vec![Emission::new(DELETED_KEY, 1)]);
    }
}
