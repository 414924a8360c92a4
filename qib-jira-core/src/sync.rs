//! Sync orchestration
//!
//! [`SyncRunner`] ties the pieces together: it owns the database handle, the
//! Jira client, the optional health notifier, and a current-thread tokio
//! runtime that bridges the async HTTP client into blocking callers. One
//! call to [`SyncRunner::run_once`] is one fetch-and-persist cycle.

use std::time::Instant;

use chrono::Utc;

use crate::config::SyncConfig;
use crate::db::{Database, SyncRun};
use crate::error::{Error, Result};
use crate::health::HealthNotifier;
use crate::jira::{build_jql, JiraClient};

/// Result of one fetch-and-persist cycle
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Issues returned by the search
    pub fetched: usize,
    /// New rows inserted
    pub inserted: usize,
    /// Existing rows rewritten
    pub updated: usize,
    /// Rows skipped as unchanged
    pub unchanged: usize,
    /// Search pages fetched
    pub pages: u32,
    /// Wall-clock duration of the cycle
    pub duration_ms: i64,
    /// Whether the health-check ping landed
    pub health_pinged: bool,
}

/// Blocking sync driver
pub struct SyncRunner {
    db: Database,
    client: JiraClient,
    notifier: Option<HealthNotifier>,
    project: String,
    days: u32,
    runtime: tokio::runtime::Runtime,
}

impl SyncRunner {
    /// Build a runner from configuration.
    ///
    /// Opens (creating if absent) and migrates the database; no network
    /// activity happens here.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to create runtime: {}", e)))?;

        let db = Database::open(&config.database)?;
        db.migrate()?;

        let client = JiraClient::new(config)?;
        let notifier = config
            .health_check
            .as_deref()
            .map(HealthNotifier::new)
            .transpose()?;

        Ok(Self {
            db,
            client,
            notifier,
            project: config.project.clone(),
            days: config.days,
            runtime,
        })
    }

    /// The underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run one fetch-and-persist cycle
    pub fn run_once(&self) -> Result<SyncOutcome> {
        self.run_once_with_progress(|_, _| {})
    }

    /// Run one cycle, reporting (fetched so far, server total) per page
    pub fn run_once_with_progress<F>(&self, progress: F) -> Result<SyncOutcome>
    where
        F: FnMut(usize, u64),
    {
        let started_at = Utc::now();
        let start = Instant::now();

        let jql = build_jql(&self.project, self.days, started_at.date_naive());
        tracing::info!(project = %self.project, days = self.days, jql = %jql, "Starting sync");

        let search = self
            .runtime
            .block_on(self.client.search_issues(&jql, progress))
            .map_err(|e| self.record_failure(started_at, &start, e))?;

        let counts = self
            .db
            .upsert_issues(&search.issues)
            .map_err(|e| self.record_failure(started_at, &start, e))?;

        let duration_ms = start.elapsed().as_millis() as i64;
        let run = SyncRun {
            started_at,
            duration_ms,
            status: "success".to_string(),
            error_message: None,
            issues_fetched: search.issues.len() as i64,
            inserted: counts.inserted as i64,
            updated: counts.updated as i64,
            unchanged: counts.unchanged as i64,
            pages: search.pages as i64,
        };
        if let Err(e) = self.db.record_sync_run(&run) {
            // The data itself is committed; accounting is not worth failing over
            tracing::warn!(error = %e, "Failed to record sync run");
        }

        tracing::info!(
            fetched = search.issues.len(),
            inserted = counts.inserted,
            updated = counts.updated,
            unchanged = counts.unchanged,
            duration_ms,
            "Sync complete"
        );

        // Ping only after a fully successful cycle
        let health_pinged = match &self.notifier {
            Some(notifier) => self.runtime.block_on(notifier.ping()),
            None => false,
        };

        Ok(SyncOutcome {
            fetched: search.issues.len(),
            inserted: counts.inserted,
            updated: counts.updated,
            unchanged: counts.unchanged,
            pages: search.pages,
            duration_ms,
            health_pinged,
        })
    }

    /// Record a failed cycle and hand the error back to the caller
    fn record_failure(&self, started_at: chrono::DateTime<Utc>, start: &Instant, error: Error) -> Error {
        let run = SyncRun {
            started_at,
            duration_ms: start.elapsed().as_millis() as i64,
            status: "error".to_string(),
            error_message: Some(error.to_string()),
            issues_fetched: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            pages: 0,
        };
        if let Err(e) = self.db.record_sync_run(&run) {
            tracing::warn!(error = %e, "Failed to record sync run");
        }
        error
    }
}
