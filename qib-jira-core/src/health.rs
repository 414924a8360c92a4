//! Best-effort health-check notification
//!
//! A dead-man's-switch endpoint expects a ping after every successful run;
//! the monitoring side alerts when pings stop arriving. A failed ping is
//! logged and never escalated.

use std::time::Duration;

use crate::error::{Error, Result};

/// Timeout for the notification request
pub const PING_TIMEOUT_SECS: u64 = 10;

/// Sends the post-run liveness ping
pub struct HealthNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl HealthNotifier {
    /// Create a notifier for the given URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PING_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    /// The configured URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the configured URL; the response body is ignored.
    ///
    /// Returns whether the ping landed. Failures are logged at warn level
    /// only - a missed ping is the monitoring service's signal, not ours.
    pub async fn ping(&self) -> bool {
        match self.http_client.get(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(url = %self.url, "Pinged health check");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    url = %self.url,
                    status = %response.status(),
                    "Health check ping rejected"
                );
                false
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Health check ping failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_construction() {
        let notifier = HealthNotifier::new("https://hc-ping.com/some-uuid").unwrap();
        assert_eq!(notifier.url(), "https://hc-ping.com/some-uuid");
    }
}
