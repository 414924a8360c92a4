//! # qib-jira-core
//!
//! Core library for qib-jira - a Jira Cloud to SQLite synchronization tool.
//!
//! This library provides:
//! - A domain type for Jira issues with lossless raw capture
//! - An authenticated, paginated Jira REST search client
//! - Database storage layer with SQLite
//! - Sync orchestration and run accounting
//! - Best-effort health-check notification
//! - Configuration and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use qib_jira_core::{SyncConfig, SyncRunner};
//!
//! let config = SyncConfig {
//!     email: "admin@example.com".into(),
//!     token: "api-token".into(),
//!     ..SyncConfig::default()
//! };
//! config.validate().expect("invalid configuration");
//!
//! let runner = SyncRunner::new(&config).expect("failed to set up runner");
//! let outcome = runner.run_once().expect("sync failed");
//! println!("fetched {} issue(s)", outcome.fetched);
//! ```

// Re-export commonly used items at the crate root
pub use config::SyncConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use jira::JiraClient;
pub use sync::{SyncOutcome, SyncRunner};
pub use types::Issue;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod jira;
pub mod logging;
pub mod sync;
pub mod types;
