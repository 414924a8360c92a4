//! Search request construction and response decoding
//!
//! The JQL builder and the mapping from the REST API v2 search response
//! shape onto the flat [`Issue`] record.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{parse_jira_date, parse_jira_datetime, Issue};

/// Fields requested from the search endpoint.
///
/// Explicit list so a run's request is fully determined by configuration and
/// the server never decides which fields come back.
pub const SEARCH_FIELDS: &str = "summary,issuetype,status,project,priority,resolution,\
assignee,reporter,creator,created,updated,lastViewed,resolutiondate,duedate,labels,\
description,environment,timeoriginalestimate,aggregatetimeestimate,worklog,timetracking";

/// Build the JQL query for one run.
///
/// Pure function of (project, days, today): the same inputs always produce
/// the same query string.
pub fn build_jql(project: &str, days: u32, today: NaiveDate) -> String {
    let cutoff = (today - chrono::Duration::days(i64::from(days)))
        .format("%Y-%m-%d")
        .to_string();
    format!(
        "createdDate >= '{0}' AND updated >= '{0}' AND project={1}",
        cutoff, project
    )
}

/// One page of the search response.
///
/// Issues are kept as raw JSON values; [`issue_from_api`] performs the typed
/// projection while the original value is preserved on the record.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "startAt")]
    pub start_at: u64,
    #[serde(rename = "maxResults")]
    pub max_results: u64,
    pub total: u64,
    pub issues: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    id: String,
    key: String,
    #[serde(default)]
    fields: ApiFields,
}

#[derive(Debug, Default, Deserialize)]
struct ApiFields {
    summary: Option<String>,
    description: Option<String>,
    environment: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    issuetype: Option<NamedRef>,
    status: Option<NamedRef>,
    priority: Option<NamedRef>,
    resolution: Option<NamedRef>,
    project: Option<ProjectRef>,
    assignee: Option<UserRef>,
    reporter: Option<UserRef>,
    creator: Option<UserRef>,
    created: Option<String>,
    updated: Option<String>,
    #[serde(rename = "lastViewed")]
    last_viewed: Option<String>,
    #[serde(rename = "duedate")]
    due_date: Option<String>,
    #[serde(rename = "resolutiondate")]
    resolution_date: Option<String>,
    #[serde(rename = "timeoriginalestimate")]
    time_original_estimate: Option<i64>,
    #[serde(rename = "aggregatetimeestimate")]
    aggregate_time_estimate: Option<i64>,
    worklog: Option<ApiWorklog>,
    timetracking: Option<ApiTimeTracking>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(rename = "accountId")]
    account_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiWorklog {
    #[serde(default)]
    worklogs: Vec<ApiWorklogEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiWorklogEntry {
    #[serde(rename = "timeSpent")]
    time_spent: Option<String>,
    started: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTimeTracking {
    #[serde(rename = "timeSpent")]
    time_spent: Option<String>,
}

/// Decode one issue object from the search response.
///
/// Unknown fields are ignored for the typed projection but survive in
/// [`Issue::raw`]. A missing `id` or `key` is a malformed response.
pub fn issue_from_api(value: &serde_json::Value) -> Result<Issue> {
    let api: ApiIssue = serde_json::from_value(value.clone())?;

    if api.key.is_empty() {
        return Err(Error::Api {
            status: 200,
            message: "search response contained an issue without a key".to_string(),
        });
    }

    let fields = api.fields;

    // Project key from the fields object, falling back to the key prefix
    let project = fields
        .project
        .and_then(|p| p.key)
        .unwrap_or_else(|| api.key.split('-').next().unwrap_or_default().to_string());

    let worklog = fields.worklog.and_then(|w| {
        if w.worklogs.is_empty() {
            return None;
        }
        let entries: Vec<String> = w
            .worklogs
            .iter()
            .map(|e| {
                format!(
                    "{}|started:({})",
                    e.time_spent.as_deref().unwrap_or(""),
                    e.started.as_deref().unwrap_or("")
                )
            })
            .collect();
        Some(entries.join(", "))
    });

    Ok(Issue {
        key: api.key,
        id: api.id,
        project,
        issue_type: fields.issuetype.and_then(|t| t.name),
        summary: fields.summary,
        status: fields.status.and_then(|s| s.name),
        priority: fields.priority.and_then(|p| p.name),
        resolution: fields.resolution.and_then(|r| r.name),
        assignee: fields
            .assignee
            .as_ref()
            .and_then(|a| a.display_name.clone()),
        assignee_id: fields.assignee.and_then(|a| a.account_id),
        reporter: fields.reporter.and_then(|r| r.display_name),
        creator: fields.creator.and_then(|c| c.display_name),
        labels: fields.labels.join(", "),
        description: fields.description,
        environment: fields.environment,
        created: fields.created.as_deref().and_then(parse_jira_datetime),
        updated: fields.updated.as_deref().and_then(parse_jira_datetime),
        last_viewed: fields.last_viewed.as_deref().and_then(parse_jira_datetime),
        due_date: fields.due_date.as_deref().and_then(parse_jira_date),
        resolution_date: fields
            .resolution_date
            .as_deref()
            .and_then(parse_jira_datetime),
        original_estimate_secs: fields.time_original_estimate,
        remaining_estimate_secs: fields.aggregate_time_estimate,
        worklog,
        time_spent: fields.timetracking.and_then(|t| t.time_spent),
        raw: value.clone(),
    })
}
