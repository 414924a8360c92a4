//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: issues table plus per-run accounting
    r#"
    -- One row per Jira issue, keyed by issue key.
    -- Scalar columns are the typed projection; raw_data keeps the full
    -- API object so later schema additions can be backfilled.
    CREATE TABLE IF NOT EXISTS issues (
        issue_key               TEXT PRIMARY KEY,
        issue_id                TEXT NOT NULL,
        project                 TEXT NOT NULL,
        issue_type              TEXT,
        summary                 TEXT,
        status                  TEXT,
        priority                TEXT,
        resolution              TEXT,
        assignee                TEXT,
        assignee_id             TEXT,
        reporter                TEXT,
        creator                 TEXT,
        labels                  TEXT NOT NULL DEFAULT '',
        description             TEXT,
        environment             TEXT,
        created                 DATETIME,
        updated                 DATETIME,
        last_viewed             DATETIME,
        due_date                DATE,
        resolution_date         DATETIME,
        original_estimate_secs  INTEGER,
        remaining_estimate_secs INTEGER,
        worklog                 TEXT,
        time_tracking           TEXT,

        -- Change detection
        content_hash            TEXT NOT NULL,

        -- Lossless capture
        raw_data                JSON,

        -- Lineage
        first_seen_at           DATETIME NOT NULL,
        last_synced_at          DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_issues_project ON issues(project);
    CREATE INDEX IF NOT EXISTS idx_issues_updated ON issues(updated);
    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);

    -- One row per fetch-and-persist cycle
    CREATE TABLE IF NOT EXISTS sync_runs (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        started_at      DATETIME NOT NULL,
        duration_ms     INTEGER NOT NULL,
        status          TEXT NOT NULL,
        error_message   TEXT,
        issues_fetched  INTEGER NOT NULL DEFAULT 0,
        inserted        INTEGER NOT NULL DEFAULT 0,
        updated         INTEGER NOT NULL DEFAULT 0,
        unchanged       INTEGER NOT NULL DEFAULT 0,
        pages           INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_sync_runs_started ON sync_runs(started_at);
    CREATE INDEX IF NOT EXISTS idx_sync_runs_status ON sync_runs(status) WHERE status != 'success';
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
