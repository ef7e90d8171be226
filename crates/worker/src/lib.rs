//! `folio-worker` library crate.
//!
//! The [`SweepJob`](job::SweepJob) trait, the maintenance sweeps built on
//! it, and the sharded [`SweepEngine`](engine::SweepEngine) that drives
//! them. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod engine;
pub mod job;
pub mod jobs;
pub mod registry;
