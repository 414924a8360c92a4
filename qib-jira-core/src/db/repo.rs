//! Database repository layer
//!
//! Provides the open/migrate handle plus insert and query operations for
//! issue records and sync-run accounting.

use crate::error::{Error, Result};
use crate::types::{parse_jira_date, Issue};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Outcome of persisting a single issue record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    /// Issue key was not present; a new row was inserted
    Inserted,
    /// Issue key was present with a different content hash; row rewritten
    Updated,
    /// Issue key was present with an identical content hash; row untouched
    Unchanged,
}

/// Counts for one batch of upserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// One recorded fetch-and-persist cycle
#[derive(Debug, Clone)]
pub struct SyncRun {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the cycle
    pub duration_ms: i64,
    /// "success" or "error"
    pub status: String,
    /// Failure detail for error runs
    pub error_message: Option<String>,
    /// Issues returned by the search
    pub issues_fetched: i64,
    /// Rows inserted
    pub inserted: i64,
    /// Rows updated
    pub updated: i64,
    /// Rows skipped as unchanged
    pub unchanged: i64,
    /// Search pages fetched
    pub pages: i64,
}

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL so an operator can inspect the file while a scheduled run writes
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Issue operations
    // ============================================

    /// Persist one issue record, keyed by issue key.
    ///
    /// A row with an identical content hash is left untouched, so re-running
    /// with an overlapping record set never duplicates or rewrites rows.
    pub fn upsert_issue(&self, issue: &Issue) -> Result<UpsertResult> {
        let conn = self.conn.lock().unwrap();
        Self::upsert_issue_on(&conn, issue, Utc::now())
    }

    /// Persist a batch of issue records in one transaction.
    pub fn upsert_issues(&self, issues: &[Issue]) -> Result<UpsertCounts> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let mut counts = UpsertCounts::default();
        for issue in issues {
            match Self::upsert_issue_on(&tx, issue, now)? {
                UpsertResult::Inserted => counts.inserted += 1,
                UpsertResult::Updated => counts.updated += 1,
                UpsertResult::Unchanged => counts.unchanged += 1,
            }
        }

        tx.commit()?;
        Ok(counts)
    }

    fn upsert_issue_on(
        conn: &Connection,
        issue: &Issue,
        now: DateTime<Utc>,
    ) -> Result<UpsertResult> {
        let hash = issue.content_hash();

        let existing: Option<String> = conn
            .query_row(
                "SELECT content_hash FROM issues WHERE issue_key = ?",
                [&issue.key],
                |r| r.get(0),
            )
            .optional()?;

        if existing.as_deref() == Some(hash.as_str()) {
            tracing::debug!(key = %issue.key, "Issue unchanged, skipping");
            return Ok(UpsertResult::Unchanged);
        }

        // first_seen_at is set on insert only; the conflict branch leaves it
        conn.execute(
            r#"
            INSERT INTO issues (
                issue_key, issue_id, project, issue_type, summary,
                status, priority, resolution, assignee, assignee_id,
                reporter, creator, labels, description, environment,
                created, updated, last_viewed, due_date, resolution_date,
                original_estimate_secs, remaining_estimate_secs,
                worklog, time_tracking, content_hash, raw_data,
                last_synced_at, first_seen_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                    ?25, ?26, ?27, ?27)
            ON CONFLICT(issue_key) DO UPDATE SET
                issue_id = excluded.issue_id,
                project = excluded.project,
                issue_type = excluded.issue_type,
                summary = excluded.summary,
                status = excluded.status,
                priority = excluded.priority,
                resolution = excluded.resolution,
                assignee = excluded.assignee,
                assignee_id = excluded.assignee_id,
                reporter = excluded.reporter,
                creator = excluded.creator,
                labels = excluded.labels,
                description = excluded.description,
                environment = excluded.environment,
                created = excluded.created,
                updated = excluded.updated,
                last_viewed = excluded.last_viewed,
                due_date = excluded.due_date,
                resolution_date = excluded.resolution_date,
                original_estimate_secs = excluded.original_estimate_secs,
                remaining_estimate_secs = excluded.remaining_estimate_secs,
                worklog = excluded.worklog,
                time_tracking = excluded.time_tracking,
                content_hash = excluded.content_hash,
                raw_data = excluded.raw_data,
                last_synced_at = excluded.last_synced_at
            "#,
            params![
                issue.key,
                issue.id,
                issue.project,
                issue.issue_type,
                issue.summary,
                issue.status,
                issue.priority,
                issue.resolution,
                issue.assignee,
                issue.assignee_id,
                issue.reporter,
                issue.creator,
                issue.labels,
                issue.description,
                issue.environment,
                issue.created.map(|t| t.to_rfc3339()),
                issue.updated.map(|t| t.to_rfc3339()),
                issue.last_viewed.map(|t| t.to_rfc3339()),
                issue.due_date.map(|d| d.to_string()),
                issue.resolution_date.map(|t| t.to_rfc3339()),
                issue.original_estimate_secs,
                issue.remaining_estimate_secs,
                issue.worklog,
                issue.time_spent,
                hash,
                serde_json::to_string(&issue.raw)?,
                now.to_rfc3339(),
            ],
        )?;

        if existing.is_some() {
            tracing::info!(key = %issue.key, "Updated issue");
            Ok(UpsertResult::Updated)
        } else {
            tracing::info!(key = %issue.key, "Inserted issue");
            Ok(UpsertResult::Inserted)
        }
    }

    /// Total number of issue rows
    pub fn count_issues(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM issues", [], |r| r.get(0))?;
        Ok(count)
    }

    /// All issue keys, sorted
    pub fn list_issue_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT issue_key FROM issues ORDER BY issue_key")?;
        let keys = stmt
            .query_map([], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    /// Get one issue by key
    pub fn get_issue(&self, key: &str) -> Result<Option<Issue>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM issues WHERE issue_key = ?", [key], |row| {
            Self::row_to_issue(row)
        })
        .optional()
        .map_err(Error::from)
    }

    fn row_to_issue(row: &Row) -> rusqlite::Result<Issue> {
        let parse_dt = |value: Option<String>| {
            value
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        let raw_str: Option<String> = row.get("raw_data")?;
        let due_str: Option<String> = row.get("due_date")?;

        Ok(Issue {
            key: row.get("issue_key")?,
            id: row.get("issue_id")?,
            project: row.get("project")?,
            issue_type: row.get("issue_type")?,
            summary: row.get("summary")?,
            status: row.get("status")?,
            priority: row.get("priority")?,
            resolution: row.get("resolution")?,
            assignee: row.get("assignee")?,
            assignee_id: row.get("assignee_id")?,
            reporter: row.get("reporter")?,
            creator: row.get("creator")?,
            labels: row.get("labels")?,
            description: row.get("description")?,
            environment: row.get("environment")?,
            created: parse_dt(row.get("created")?),
            updated: parse_dt(row.get("updated")?),
            last_viewed: parse_dt(row.get("last_viewed")?),
            due_date: due_str.as_deref().and_then(parse_jira_date),
            resolution_date: parse_dt(row.get("resolution_date")?),
            original_estimate_secs: row.get("original_estimate_secs")?,
            remaining_estimate_secs: row.get("remaining_estimate_secs")?,
            worklog: row.get("worklog")?,
            time_spent: row.get("time_tracking")?,
            raw: raw_str
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or(serde_json::Value::Null),
        })
    }

    // ============================================
    // Sync run operations
    // ============================================

    /// Record one fetch-and-persist cycle
    pub fn record_sync_run(&self, run: &SyncRun) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO sync_runs (
                started_at, duration_ms, status, error_message,
                issues_fetched, inserted, updated, unchanged, pages
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                run.started_at.to_rfc3339(),
                run.duration_ms,
                run.status,
                run.error_message,
                run.issues_fetched,
                run.inserted,
                run.updated,
                run.unchanged,
                run.pages,
            ],
        )?;
        Ok(())
    }

    /// Total number of recorded runs
    pub fn count_sync_runs(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_runs", [], |r| r.get(0))?;
        Ok(count)
    }

    /// Most recently recorded run, if any
    pub fn last_sync_run(&self) -> Result<Option<SyncRun>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT started_at, duration_ms, status, error_message,
                    issues_fetched, inserted, updated, unchanged, pages
             FROM sync_runs ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                let started_str: String = row.get(0)?;
                Ok(SyncRun {
                    started_at: DateTime::parse_from_rfc3339(&started_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    duration_ms: row.get(1)?,
                    status: row.get(2)?,
                    error_message: row.get(3)?,
                    issues_fetched: row.get(4)?,
                    inserted: row.get(5)?,
                    updated: row.get(6)?,
                    unchanged: row.get(7)?,
                    pages: row.get(8)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_issue;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_insert_then_unchanged() {
        let db = test_db();
        let issue = sample_issue("BSUP-1");

        assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Inserted);
        assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Unchanged);
        assert_eq!(db.count_issues().unwrap(), 1);
    }

    #[test]
    fn test_update_on_changed_hash() {
        let db = test_db();
        let mut issue = sample_issue("BSUP-1");
        db.upsert_issue(&issue).unwrap();

        issue.status = Some("Done".to_string());
        assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Updated);

        let stored = db.get_issue("BSUP-1").unwrap().unwrap();
        assert_eq!(stored.status.as_deref(), Some("Done"));
        assert_eq!(db.count_issues().unwrap(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let db = test_db();
        let issue = sample_issue("BSUP-7");
        db.upsert_issue(&issue).unwrap();

        let stored = db.get_issue("BSUP-7").unwrap().unwrap();
        assert_eq!(stored.key, issue.key);
        assert_eq!(stored.project, issue.project);
        assert_eq!(stored.assignee, issue.assignee);
        assert_eq!(stored.labels, issue.labels);
        assert_eq!(stored.created, issue.created);
        assert_eq!(stored.due_date, issue.due_date);
        assert_eq!(stored.original_estimate_secs, issue.original_estimate_secs);
        assert_eq!(stored.raw, issue.raw);
        // A faithful roundtrip means the hash skip keeps working
        assert_eq!(stored.content_hash(), issue.content_hash());
    }

    #[test]
    fn test_batch_counts() {
        let db = test_db();
        let a = sample_issue("BSUP-1");
        let mut b = sample_issue("BSUP-2");

        let counts = db.upsert_issues(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(counts.inserted, 2);

        b.summary = Some("Changed".to_string());
        let c = sample_issue("BSUP-3");
        let counts = db.upsert_issues(&[a, b, c]).unwrap();
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.unchanged, 1);
        assert_eq!(db.count_issues().unwrap(), 3);
    }

    #[test]
    fn test_missing_issue_is_none() {
        let db = test_db();
        assert!(db.get_issue("BSUP-404").unwrap().is_none());
    }

    #[test]
    fn test_sync_run_roundtrip() {
        let db = test_db();
        assert_eq!(db.count_sync_runs().unwrap(), 0);
        assert!(db.last_sync_run().unwrap().is_none());

        db.record_sync_run(&SyncRun {
            started_at: Utc::now(),
            duration_ms: 1234,
            status: "success".to_string(),
            error_message: None,
            issues_fetched: 10,
            inserted: 4,
            updated: 2,
            unchanged: 4,
            pages: 1,
        })
        .unwrap();

        assert_eq!(db.count_sync_runs().unwrap(), 1);
        let run = db.last_sync_run().unwrap().unwrap();
        assert_eq!(run.status, "success");
        assert_eq!(run.issues_fetched, 10);
        assert_eq!(run.inserted, 4);
    }
}
