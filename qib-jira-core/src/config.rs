//! Run configuration for a sync
//!
//! Configuration is resolved by the CLI from flags with environment-variable
//! fallback (`JIRA_EMAIL`, `JIRA_TOKEN`, `JIRA_SERVER`, `HEALTH_CHECK_URL`,
//! optionally loaded from a local `.env` file). Once resolved it is immutable
//! for the lifetime of a run.
//!
//! Log files follow the XDG Base Directory Specification:
//! `$XDG_STATE_HOME/qib-jira/` (~/.local/state/qib-jira/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default Jira Cloud server
pub const DEFAULT_SERVER: &str = "https://quadram-institute.atlassian.net";

/// Default database file, relative to the working directory
pub const DEFAULT_DATABASE: &str = "qib-jira.db";

/// Default project key filter
pub const DEFAULT_PROJECT: &str = "BSUP";

/// Default look-back window in days
pub const DEFAULT_DAYS: u32 = 30;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Fully resolved configuration for one sync run (or one scheduled loop).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Jira Cloud base URL
    #[serde(default = "default_server")]
    pub server: String,

    /// Jira Cloud account email (basic auth username)
    pub email: String,

    /// Jira Cloud API token (basic auth password)
    pub token: String,

    /// Project key to filter issues by
    #[serde(default = "default_project")]
    pub project: String,

    /// Look-back window in days for created/updated filtering
    #[serde(default = "default_days")]
    pub days: u32,

    /// SQLite database file path
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Re-run interval in minutes; None means a single run
    #[serde(default)]
    pub schedule: Option<u64>,

    /// Health-check URL pinged after each successful run
    #[serde(default)]
    pub health_check: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

fn default_timeout() -> u64 {
    30
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            email: String::new(),
            token: String::new(),
            project: default_project(),
            days: default_days(),
            database: default_database(),
            schedule: None,
            health_check: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl SyncConfig {
    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::Config(
                "email is required (flag --email or JIRA_EMAIL)".to_string(),
            ));
        }
        if self.token.trim().is_empty() {
            return Err(Error::Config(
                "token is required (flag --token or JIRA_TOKEN)".to_string(),
            ));
        }
        if self.server.trim().is_empty() {
            return Err(Error::Config("server must not be empty".to_string()));
        }
        if self.days == 0 {
            return Err(Error::Config("days must be at least 1".to_string()));
        }
        if self.schedule == Some(0) {
            return Err(Error::Config(
                "schedule interval must be at least 1 minute".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/qib-jira/` (~/.local/state/qib-jira/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("qib-jira")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("qib-jira.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SyncConfig {
        SyncConfig {
            email: "admin@example.com".to_string(),
            token: "secret".to_string(),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.project, "BSUP");
        assert_eq!(config.days, 30);
        assert_eq!(config.database, PathBuf::from("qib-jira.db"));
        assert!(config.schedule.is_none());
        assert!(config.health_check.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = SyncConfig::default();
        assert!(config.validate().is_err());

        let config = SyncConfig {
            email: "admin@example.com".to_string(),
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_zero_days_rejected() {
        let config = SyncConfig {
            days: 0,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_schedule_rejected() {
        let config = SyncConfig {
            schedule: Some(0),
            ..valid_config()
        };
        assert!(config.validate().is_err());

        let config = SyncConfig {
            schedule: Some(15),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_path() {
        assert!(SyncConfig::log_path().ends_with("qib-jira/qib-jira.log"));
    }
}
