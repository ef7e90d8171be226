//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod commit_log_repo;
pub mod record_repo;

pub use commit_log_repo::CommitLogRepo;
pub use record_repo::RecordRepo;
