use super::defaults::MAX_UNLOCK_TIMEOUT_SECS;
use super::settings::AppConfig;
use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

/// Names are spliced into engine search queries, so only plain identifiers are accepted.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

impl AppConfig {
    /// Validate configuration values are sane.
    pub(crate) fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.uri.is_empty(), "URI not specified in configuration");
        anyhow::ensure!(!self.username.is_empty(), "USERNAME not specified in configuration");
        anyhow::ensure!(!self.password.is_empty(), "PASSWORD not specified in configuration");
        anyhow::ensure!(!self.ca_path.is_empty(), "CA_PATH not specified in configuration");

        let Some(threshold) = self.threshold else {
            anyhow::bail!("THRESHOLD not specified in configuration");
        };
        anyhow::ensure!(threshold <= 100, "THRESHOLD must be between 0 and 100");

        anyhow::ensure!(self.iteration_sleep_secs >= 1, "ITERATION_SLEEP must be >= 1");
        anyhow::ensure!(self.unlock_poll_interval_secs >= 1, "UNLOCK_POLL_INTERVAL must be >= 1");
        anyhow::ensure!(
            self.unlock_timeout_secs >= self.unlock_poll_interval_secs,
            "UNLOCK_TIMEOUT must be at least UNLOCK_POLL_INTERVAL"
        );
        anyhow::ensure!(
            self.unlock_timeout_secs <= MAX_UNLOCK_TIMEOUT_SECS,
            "UNLOCK_TIMEOUT must be at most {MAX_UNLOCK_TIMEOUT_SECS} seconds"
        );
        anyhow::ensure!(self.request_timeout_secs >= 1, "REQUEST_TIMEOUT must be >= 1");

        if let Some(dc) = &self.datacenter {
            anyhow::ensure!(NAME_RE.is_match(dc), "DATACENTER '{dc}' contains invalid characters");
        }
        for name in &self.excluded_domains {
            anyhow::ensure!(
                NAME_RE.is_match(name),
                "NO_BALANCE entry '{name}' contains invalid characters"
            );
        }
        Ok(())
    }
}
