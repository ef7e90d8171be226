//! Sharded sweep execution.
//!
//! The engine lists every record id for a job's entity kinds, splits the ids
//! into shards and runs the shards on tokio tasks bounded by a semaphore.
//! Map results flow through an mpsc channel to a single aggregator; once
//! every shard has finished, `reduce` runs once per key.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use folio_core::types::{EntityKind, RecordId};
use folio_db::{RecordStore, StoreError};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::job::{Emission, JobError, ReducedOutput, SweepJob};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shards allowed to run at the same time.
    pub max_workers: usize,
    /// Total attempts per record, first try included.
    pub max_attempts: u32,
    /// Shard count for jobs that express no preference.
    pub default_shard_count: usize,
    /// Forces the shard count regardless of the job's preference.
    pub shard_override: Option<usize>,
    pub channel_capacity: usize,
    /// Base delay between attempts; multiplied by the attempt number.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 8,
            max_attempts: 3,
            default_shard_count: 8,
            shard_override: None,
            channel_capacity: 1024,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and report
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to list {kind} records: {source}")]
    Listing {
        kind: EntityKind,
        #[source]
        source: StoreError,
    },

    #[error("Shard {shard} panicked: {message}")]
    ShardPanicked { shard: usize, message: String },
}

/// A record whose map failed permanently or kept failing after every
/// attempt.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub kind: EntityKind,
    pub record_id: RecordId,
    pub attempts: u32,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub job_id: Uuid,
    pub job_name: String,
    pub shard_count: usize,
    pub records_processed: usize,
    /// Records listed but gone by the time they were loaded.
    pub records_skipped: usize,
    pub outputs: Vec<ReducedOutput>,
    pub failures: Vec<RecordFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SweepReport {
    /// Value of the first output under `key`.
    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.iter().find(|o| o.key == key).map(|o| &o.value)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `key: value` lines for terminal output, failures last.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .outputs
            .iter()
            .map(|o| format!("{}: {}", o.key, o.value))
            .collect();
        lines.extend(self.failures.iter().map(|f| {
            format!(
                "FAILED - {} {} after {} attempts: {}",
                f.kind.model_name(),
                f.record_id,
                f.attempts,
                f.error
            )
        }));
        lines
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

enum ShardMessage {
    Processed(Vec<Emission>),
    Skipped,
    Failed(RecordFailure),
}

type Target = (EntityKind, RecordId);

pub struct SweepEngine {
    store: Arc<dyn RecordStore>,
    config: EngineConfig,
}

impl SweepEngine {
    pub fn new(store: Arc<dyn RecordStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run `job` over every record of its entity kinds.
    ///
    /// Per-record failures end up in [`SweepReport::failures`]; only a failed
    /// listing or a panicking shard aborts the sweep.
    pub async fn run(&self, job: Arc<dyn SweepJob>) -> Result<SweepReport, EngineError> {
        let job_id = Uuid::new_v4();
        let started_at = Utc::now();

        let mut targets: Vec<Target> = Vec::new();
        for kind in job.entity_kinds() {
            let ids = self
                .store
                .list_ids(kind)
                .await
                .map_err(|source| EngineError::Listing { kind, source })?;
            targets.extend(ids.into_iter().map(|id| (kind, id)));
        }

        let shard_count = self
            .config
            .shard_override
            .or(job.shard_count())
            .unwrap_or(self.config.default_shard_count)
            .max(1);

        tracing::info!(
            %job_id,
            job = job.name(),
            records = targets.len(),
            shard_count,
            "Sweep started"
        );

        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut handles = Vec::with_capacity(shard_count);

        for (index, shard) in partition(targets, shard_count).into_iter().enumerate() {
            if shard.is_empty() {
                continue;
            }
            let job = Arc::clone(&job);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let config = self.config.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                tracing::debug!(shard = index, records = shard.len(), "Shard started");
                for (kind, id) in shard {
                    let message = process_record(job.as_ref(), store.as_ref(), &config, kind, id).await;
                    if tx.send(message).await.is_err() {
                        break;
                    }
                }
            });
            handles.push((index, handle));
        }
        drop(tx);

        let mut grouped: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        let mut records_processed = 0;
        let mut records_skipped = 0;
        let mut failures = Vec::new();

        while let Some(message) = rx.recv().await {
            match message {
                ShardMessage::Processed(emissions) => {
                    records_processed += 1;
                    for emission in emissions {
                        grouped.entry(emission.key).or_default().push(emission.value);
                    }
                }
                ShardMessage::Skipped => records_skipped += 1,
                ShardMessage::Failed(failure) => failures.push(failure),
            }
        }

        for (shard, handle) in handles {
            handle.await.map_err(|e| EngineError::ShardPanicked {
                shard,
                message: e.to_string(),
            })?;
        }

        let outputs: Vec<ReducedOutput> = grouped
            .into_iter()
            .flat_map(|(key, values)| job.reduce(&key, values))
            .collect();

        let report = SweepReport {
            job_id,
            job_name: job.name().to_string(),
            shard_count,
            records_processed,
            records_skipped,
            outputs,
            failures,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            %job_id,
            job = job.name(),
            processed = report.records_processed,
            skipped = report.records_skipped,
            failed = report.failures.len(),
            "Sweep finished"
        );
        Ok(report)
    }
}

/// Fetch and map one record, retrying transient storage errors.
///
/// Domain errors are reported after the first attempt.
async fn process_record(
    job: &dyn SweepJob,
    store: &dyn RecordStore,
    config: &EngineConfig,
    kind: EntityKind,
    id: RecordId,
) -> ShardMessage {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = match store.get(kind, &id).await {
            Ok(Some(record)) => job.map(record).await,
            Ok(None) => {
                tracing::warn!(job = job.name(), %kind, record_id = %id, "Record vanished before map");
                return ShardMessage::Skipped;
            }
            Err(e) => Err(JobError::from(e)),
        };

        match result {
            Ok(emissions) => return ShardMessage::Processed(emissions),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    job = job.name(),
                    record_id = %id,
                    attempt,
                    error = %e,
                    "Map failed, retrying"
                );
                tokio::time::sleep(config.retry_backoff * attempt).await;
            }
            Err(e) => {
                tracing::error!(
                    job = job.name(),
                    record_id = %id,
                    attempts = attempt,
                    error = %e,
                    "Map failed, giving up"
                );
                return ShardMessage::Failed(RecordFailure {
                    kind,
                    record_id: id,
                    attempts: attempt,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Deal `items` round-robin into `shard_count` shards.
pub fn partition<T>(items: Vec<T>, shard_count: usize) -> Vec<Vec<T>> {
    let shard_count = shard_count.max(1);
    let mut shards: Vec<Vec<T>> = (0..shard_count).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        shards[i % shard_count].push(item);
    }
    shards
}
