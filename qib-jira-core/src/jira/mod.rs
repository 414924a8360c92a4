//! Jira Cloud REST API integration
//!
//! This module provides the search client and the decoding of search
//! responses into [`crate::types::Issue`] records.

pub mod client;
pub mod search;

pub use client::{JiraClient, SearchOutcome, PAGE_SIZE};
pub use search::{build_jql, issue_from_api, SearchResponse, SEARCH_FIELDS};
