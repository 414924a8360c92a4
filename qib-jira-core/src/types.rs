//! Core domain types for qib-jira
//!
//! The canonical record is [`Issue`]: a flat projection of one Jira work
//! item, carrying the fields the `issues` table stores plus the full API
//! object under [`Issue::raw`] so nothing the server returned is lost.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single Jira work item, flattened for storage.
///
/// Field names mirror the REST API v2 search response; nested objects
/// (assignee, status, priority, ...) are reduced to their display values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue key, e.g. "BSUP-123" (primary identity)
    pub key: String,
    /// Numeric issue id as returned by the API
    pub id: String,
    /// Project key the issue belongs to
    pub project: String,
    /// Issue type name (Task, Bug, ...)
    pub issue_type: Option<String>,
    /// One-line summary
    pub summary: Option<String>,
    /// Workflow status name
    pub status: Option<String>,
    /// Priority name
    pub priority: Option<String>,
    /// Resolution name, if resolved
    pub resolution: Option<String>,
    /// Assignee display name
    pub assignee: Option<String>,
    /// Assignee Atlassian account id
    pub assignee_id: Option<String>,
    /// Reporter display name
    pub reporter: Option<String>,
    /// Creator display name
    pub creator: Option<String>,
    /// Labels, comma-joined
    pub labels: String,
    /// Free-form description
    pub description: Option<String>,
    /// Environment field
    pub environment: Option<String>,
    /// Creation timestamp
    pub created: Option<DateTime<Utc>>,
    /// Last-updated timestamp
    pub updated: Option<DateTime<Utc>>,
    /// Last-viewed timestamp
    pub last_viewed: Option<DateTime<Utc>>,
    /// Due date (date only)
    pub due_date: Option<NaiveDate>,
    /// Resolution timestamp
    pub resolution_date: Option<DateTime<Utc>>,
    /// Original time estimate in seconds
    pub original_estimate_secs: Option<i64>,
    /// Aggregate remaining estimate in seconds
    pub remaining_estimate_secs: Option<i64>,
    /// Flattened worklog entries ("3h|started:(...), 1d|started:(...)")
    pub worklog: Option<String>,
    /// Time spent per the timetracking field
    pub time_spent: Option<String>,
    /// Full issue object as returned by the API
    pub raw: serde_json::Value,
}

impl Issue {
    /// Deterministic hash over the stored scalar fields.
    ///
    /// Two fetches of the same issue produce the same hash unless a stored
    /// field changed, which lets persistence skip rewriting untouched rows.
    /// `raw` is excluded: it may carry fields we do not store.
    pub fn content_hash(&self) -> String {
        fn field(hasher: &mut Sha256, value: Option<&str>) {
            // Unit separator keeps ("ab", None) distinct from ("a", "b")
            hasher.update(value.unwrap_or("\u{0}").as_bytes());
            hasher.update([0x1f]);
        }

        let mut hasher = Sha256::new();

        field(&mut hasher, Some(self.key.as_str()));
        field(&mut hasher, Some(self.id.as_str()));
        field(&mut hasher, Some(self.project.as_str()));
        field(&mut hasher, self.issue_type.as_deref());
        field(&mut hasher, self.summary.as_deref());
        field(&mut hasher, self.status.as_deref());
        field(&mut hasher, self.priority.as_deref());
        field(&mut hasher, self.resolution.as_deref());
        field(&mut hasher, self.assignee.as_deref());
        field(&mut hasher, self.assignee_id.as_deref());
        field(&mut hasher, self.reporter.as_deref());
        field(&mut hasher, self.creator.as_deref());
        field(&mut hasher, Some(self.labels.as_str()));
        field(&mut hasher, self.description.as_deref());
        field(&mut hasher, self.environment.as_deref());
        field(&mut hasher, self.created.map(|t| t.to_rfc3339()).as_deref());
        field(&mut hasher, self.updated.map(|t| t.to_rfc3339()).as_deref());
        field(&mut hasher, self.last_viewed.map(|t| t.to_rfc3339()).as_deref());
        field(&mut hasher, self.due_date.map(|d| d.to_string()).as_deref());
        field(
            &mut hasher,
            self.resolution_date.map(|t| t.to_rfc3339()).as_deref(),
        );
        field(
            &mut hasher,
            self.original_estimate_secs.map(|n| n.to_string()).as_deref(),
        );
        field(
            &mut hasher,
            self.remaining_estimate_secs.map(|n| n.to_string()).as_deref(),
        );
        field(&mut hasher, self.worklog.as_deref());
        field(&mut hasher, self.time_spent.as_deref());

        hex::encode(hasher.finalize())
    }
}

/// Parse a Jira timestamp ("2024-03-15T10:30:00.000+0000" or RFC 3339).
pub fn parse_jira_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse a Jira date-only field ("2024-03-15").
pub fn parse_jira_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Test fixture shared by inline test modules across the crate.
#[cfg(test)]
pub(crate) fn sample_issue(key: &str) -> Issue {
    Issue {
        key: key.to_string(),
        id: "10001".to_string(),
        project: "BSUP".to_string(),
        issue_type: Some("Task".to_string()),
        summary: Some("Restore the sequencer backups".to_string()),
        status: Some("In Progress".to_string()),
        priority: Some("High".to_string()),
        resolution: None,
        assignee: Some("Ada Lovelace".to_string()),
        assignee_id: Some("5b10ac8d82e05b22cc7d4ef5".to_string()),
        reporter: Some("Charles Babbage".to_string()),
        creator: Some("Charles Babbage".to_string()),
        labels: "backup, urgent".to_string(),
        description: Some("Tape drive is offline.".to_string()),
        environment: None,
        created: parse_jira_datetime("2024-03-01T09:00:00.000+0000"),
        updated: parse_jira_datetime("2024-03-15T10:30:00.000+0000"),
        last_viewed: None,
        due_date: parse_jira_date("2024-03-20"),
        resolution_date: None,
        original_estimate_secs: Some(7200),
        remaining_estimate_secs: Some(3600),
        worklog: Some("1h|started:(2024-03-02T10:00:00.000+0000)".to_string()),
        time_spent: Some("1h".to_string()),
        raw: serde_json::json!({"key": key}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_jira_datetime() {
        let dt = parse_jira_datetime("2024-03-15T10:30:00.000+0000").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);

        // Non-UTC offsets are normalized
        let dt = parse_jira_datetime("2024-03-15T10:30:00.000+0100").unwrap();
        assert_eq!(dt.hour(), 9);

        // RFC 3339 also accepted
        assert!(parse_jira_datetime("2024-03-15T10:30:00Z").is_some());

        assert!(parse_jira_datetime("not a date").is_none());
    }

    #[test]
    fn test_parse_jira_date() {
        assert_eq!(
            parse_jira_date("2024-03-20"),
            NaiveDate::from_ymd_opt(2024, 3, 20)
        );
        assert!(parse_jira_date("20/03/2024").is_none());
    }

    #[test]
    fn test_content_hash_stable() {
        let a = sample_issue("BSUP-1");
        let b = sample_issue("BSUP-1");
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_tracks_field_changes() {
        let a = sample_issue("BSUP-1");
        let mut b = sample_issue("BSUP-1");
        b.status = Some("Done".to_string());
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_ignores_raw() {
        let a = sample_issue("BSUP-1");
        let mut b = sample_issue("BSUP-1");
        b.raw = serde_json::json!({"key": "BSUP-1", "extra": true});
        assert_eq!(a.content_hash(), b.content_hash());
    }
}
