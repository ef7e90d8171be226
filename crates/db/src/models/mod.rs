//! Row models.
//!
//! Each model maps one table row via `sqlx::FromRow` and converts into the
//! corresponding `folio_core` type.

pub mod commit_log;
pub mod record;
