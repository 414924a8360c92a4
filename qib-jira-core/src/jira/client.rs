//! HTTP client for the Jira Cloud REST search API
//!
//! Authenticates with basic auth (account email + API token) and walks the
//! paginated `/rest/api/2/search` endpoint.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::types::Issue;

use super::search::{issue_from_api, SearchResponse, SEARCH_FIELDS};

/// Issues requested per search page
pub const PAGE_SIZE: u64 = 100;

/// HTTP client for the Jira Cloud search API
pub struct JiraClient {
    http_client: reqwest::Client,
    base_url: String,
    email: String,
    token: String,
}

/// Result of walking every page of one search
#[derive(Debug)]
pub struct SearchOutcome {
    /// Decoded issue records, in server order
    pub issues: Vec<Issue>,
    /// Number of pages fetched
    pub pages: u32,
}

impl JiraClient {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config.server.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
            email: config.email.clone(),
            token: config.token.clone(),
        })
    }

    /// Fetch one page of search results
    pub async fn search_page(&self, jql: &str, start_at: u64) -> Result<SearchResponse> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let start_at_param = start_at.to_string();
        let max_results_param = PAGE_SIZE.to_string();

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.email, Some(&self.token))
            .query(&[
                ("jql", jql),
                ("startAt", start_at_param.as_str()),
                ("maxResults", max_results_param.as_str()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("request failed: {}", e)))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("failed to read response: {}", e)))?;

        // Decode through serde_json so shape mismatches surface as JSON errors
        let page: SearchResponse = serde_json::from_str(&body)?;
        Ok(page)
    }

    /// Fetch and decode every page matching the query.
    ///
    /// `progress` is invoked after each page with (issues fetched so far,
    /// total reported by the server). The walk stops at the first short page.
    pub async fn search_issues<F>(&self, jql: &str, mut progress: F) -> Result<SearchOutcome>
    where
        F: FnMut(usize, u64),
    {
        let mut issues = Vec::new();
        let mut start_at = 0u64;
        let mut pages = 0u32;

        loop {
            tracing::debug!(jql, start_at, "Fetching search page");
            let page = self.search_page(jql, start_at).await?;
            pages += 1;

            let page_len = page.issues.len();
            for value in &page.issues {
                issues.push(issue_from_api(value)?);
            }

            progress(issues.len(), page.total);

            tracing::debug!(
                page_len,
                total = page.total,
                fetched = issues.len(),
                "Search page decoded"
            );

            if (page_len as u64) < PAGE_SIZE {
                break;
            }
            start_at += page_len as u64;
        }

        Ok(SearchOutcome { issues, pages })
    }
}
