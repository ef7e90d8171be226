//! The map/reduce contract every sweep implements.

use async_trait::async_trait;
use folio_core::record::StoredRecord;
use folio_core::types::EntityKind;
use folio_db::{ServiceError, StoreError};
use serde::Serialize;
use serde_json::Value;

/// One `(outcome key, value)` pair produced by `map`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emission {
    pub key: String,
    pub value: Value,
}

impl Emission {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One line of a job's final output, produced by `reduce`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedOutput {
    pub key: String,
    pub value: Value,
}

impl ReducedOutput {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Infrastructure failures raised from `map`.
///
/// Domain validation failures are not errors; jobs report them as
/// emissions.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl JobError {
    /// Whether retrying the same record could succeed.
    ///
    /// Storage failures are worth another attempt; domain errors (validation,
    /// migration, not found) fail the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Service(ServiceError::Store(_)))
    }
}

/// A batch sweep over every record of some entity kinds.
///
/// `map` is called once per record, concurrently across shards, and must
/// not rely on state shared between calls. `reduce` is called once per
/// distinct key after every `map` call has finished.
#[async_trait]
pub trait SweepJob: Send + Sync {
    /// Registry name of the job.
    fn name(&self) -> &'static str;

    /// Entity kinds to iterate.
    fn entity_kinds(&self) -> Vec<EntityKind>;

    /// Preferred shard count. `None` leaves the choice to the engine.
    fn shard_count(&self) -> Option<usize> {
        None
    }

    async fn map(&self, record: StoredRecord) -> Result<Vec<Emission>, JobError>;

    fn reduce(&self, key: &str, values: Vec<Value>) -> Vec<ReducedOutput>;
}

/// Sum the integer values emitted under one key.
pub fn sum_counts(values: &[Value]) -> i64 {
    values.iter().filter_map(Value::as_i64).sum()
}
