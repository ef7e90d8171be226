//! Job lookup by name.
//!
//! Jobs are built explicitly with the injected store; there is no dynamic
//! class registration.

use std::sync::Arc;

use folio_db::{CollectionService, RecordStore};

use crate::job::SweepJob;
use crate::jobs::collection_migration;
use crate::jobs::field_removal::{REMOVE_COLLECTION_NODES, REMOVE_RIGHTS_TRANSLATOR_IDS};
use crate::jobs::{CollectionMigrationJob, FieldRemovalJob};

/// All runnable job names.
pub const JOB_NAMES: &[&str] = &[
    collection_migration::JOB_NAME,
    REMOVE_RIGHTS_TRANSLATOR_IDS,
    REMOVE_COLLECTION_NODES,
];

#[derive(Debug, thiserror::Error)]
#[error("Unknown job: '{name}'. Valid jobs: {}", JOB_NAMES.join(", "))]
pub struct UnknownJob {
    pub name: String,
}

/// Build the job registered under `name`.
pub fn build_job(
    name: &str,
    store: Arc<dyn RecordStore>,
) -> Result<Arc<dyn SweepJob>, UnknownJob> {
    let job: Arc<dyn SweepJob> = match name {
        collection_migration::JOB_NAME => {
            Arc::new(CollectionMigrationJob::new(CollectionService::new(store)))
        }
        REMOVE_RIGHTS_TRANSLATOR_IDS => Arc::new(FieldRemovalJob::rights_translator_ids(store)),
        REMOVE_COLLECTION_NODES => Arc::new(FieldRemovalJob::collection_nodes(store)),
        other => {
            return Err(UnknownJob {
                name: other.to_string(),
            })
        }
    };
    Ok(job)
}

#[cfg(test)]
mod tests {
    use folio_db::MemoryRecordStore;

    use super::*;

    #[test]
    fn every_registered_name_builds() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        for name in JOB_NAMES {
            let job = build_job(name, store.clone()).unwrap();
            assert_eq!(job.name(), *name);
        }
    }

    #[test]
    fn unknown_name_lists_valid_jobs() {
        let err = build_job("reindex_everything", Arc::new(MemoryRecordStore::new()))
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("reindex_everything"));
        assert!(msg.contains("collection_migration"));
    }
}
