//! Integration tests for the qib-jira storage and sync pipeline
//!
//! These run against file-backed databases in a temp directory to exercise
//! the same code paths a real run takes, without touching the network
//! (except for one deliberately unreachable endpoint).

use qib_jira_core::db::UpsertResult;
use qib_jira_core::jira::issue_from_api;
use qib_jira_core::{Database, SyncConfig, SyncRunner};
use tempfile::TempDir;

/// Build an issue record the way a fetch would: through the API decoder.
fn fetched_issue(key: &str, summary: &str, status: &str) -> qib_jira_core::Issue {
    let value = serde_json::json!({
        "id": "10000",
        "key": key,
        "fields": {
            "summary": summary,
            "status": {"name": status},
            "project": {"key": "BSUP"},
            "labels": [],
            "created": "2024-03-01T09:00:00.000+0000",
            "updated": "2024-03-15T10:30:00.000+0000"
        }
    });
    issue_from_api(&value).expect("fixture should decode")
}

#[test]
fn overlapping_record_sets_do_not_duplicate() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();

    // First run returns [A, B]
    let a = fetched_issue("BSUP-1", "First", "Open");
    let b = fetched_issue("BSUP-2", "Second", "Open");
    db.upsert_issues(&[a, b]).unwrap();

    // Later run returns [B, C] with B in a new state
    let b2 = fetched_issue("BSUP-2", "Second", "Done");
    let c = fetched_issue("BSUP-3", "Third", "Open");
    let counts = db.upsert_issues(&[b2, c]).unwrap();

    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.updated, 1);

    // Table holds exactly {A, B, C}, with B reflecting the latest fetch
    assert_eq!(
        db.list_issue_keys().unwrap(),
        vec!["BSUP-1", "BSUP-2", "BSUP-3"]
    );
    let stored_b = db.get_issue("BSUP-2").unwrap().unwrap();
    assert_eq!(stored_b.status.as_deref(), Some("Done"));
}

#[test]
fn unchanged_records_are_skipped() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db");
    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();

    let issue = fetched_issue("BSUP-5", "Stable", "Open");
    assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Inserted);
    assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Unchanged);
    assert_eq!(db.upsert_issue(&issue).unwrap(), UpsertResult::Unchanged);
    assert_eq!(db.count_issues().unwrap(), 1);
}

#[test]
fn database_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db");

    {
        let db = Database::open(&db_path).unwrap();
        db.migrate().unwrap();
        db.upsert_issue(&fetched_issue("BSUP-9", "Persisted", "Open"))
            .unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    db.migrate().unwrap();
    let stored = db.get_issue("BSUP-9").unwrap().unwrap();
    assert_eq!(stored.summary.as_deref(), Some("Persisted"));
}

#[test]
fn invalid_config_fails_before_touching_the_database() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("never-created.db");

    let config = SyncConfig {
        database: db_path.clone(),
        ..SyncConfig::default() // no credentials
    };

    assert!(SyncRunner::new(&config).is_err());
    assert!(!db_path.exists(), "validation failure must precede db open");
}

#[test]
fn failed_fetch_is_surfaced_and_recorded() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("test.db");

    let config = SyncConfig {
        email: "admin@example.com".to_string(),
        token: "api-token".to_string(),
        // Nothing listens here; the fetch fails without network access
        server: "http://127.0.0.1:9".to_string(),
        database: db_path.clone(),
        timeout_secs: 2,
        ..SyncConfig::default()
    };

    let runner = SyncRunner::new(&config).unwrap();
    let result = runner.run_once();
    assert!(result.is_err(), "unreachable server must surface an error");

    // The failed cycle is recorded; no issue rows appeared
    let run = runner.database().last_sync_run().unwrap().unwrap();
    assert_eq!(run.status, "error");
    assert!(run.error_message.is_some());
    assert_eq!(run.issues_fetched, 0);
    assert_eq!(runner.database().count_issues().unwrap(), 0);
}
