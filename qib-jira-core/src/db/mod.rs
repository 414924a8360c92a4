//! Database layer for qib-jira
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Upsert-by-key persistence for issue records
//! - Run accounting in the `sync_runs` table

pub mod repo;
pub mod schema;

pub use repo::{Database, SyncRun, UpsertCounts, UpsertResult};
