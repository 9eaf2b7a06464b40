use super::defaults::{
    DEFAULT_CONFIG_PATH, DEFAULT_ITERATION_SLEEP_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_STATUS_PORT, DEFAULT_UNLOCK_INITIAL_DELAY_SECS, DEFAULT_UNLOCK_POLL_INTERVAL_SECS,
    DEFAULT_UNLOCK_TIMEOUT_SECS,
};
use crate::balancer::{Policy, PowerPolicy};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Process-wide configuration, loaded once at startup and read-only afterwards.
#[derive(Clone)]
pub(crate) struct AppConfig {
    pub config_path: String,
    /// Engine API root, e.g. `https://engine.example.com/ovirt-engine/api`.
    pub uri: String,
    pub username: String,
    pub password: String,
    /// PEM bundle used as the only trust anchor for the engine's TLS certificate.
    pub ca_path: String,
    /// Occupancy percentage at or above which a domain is overloaded. Mandatory.
    pub threshold: Option<u8>,
    /// Only balance storage domains of this datacenter.
    pub datacenter: Option<String>,
    /// Domains never used as source or destination.
    pub excluded_domains: HashSet<String>,
    pub debug: bool,
    pub iteration_sleep_secs: u64,
    pub power_policy: PowerPolicy,
    pub unlock_initial_delay_secs: u64,
    pub unlock_poll_interval_secs: u64,
    pub unlock_timeout_secs: u64,
    /// 0 disables the status endpoint.
    pub status_port: u16,
    pub request_timeout_secs: u64,
    /// Problems found while parsing, logged once logging is up.
    pub notices: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("config_path", &self.config_path)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ca_path", &self.ca_path)
            .field("threshold", &self.threshold)
            .field("datacenter", &self.datacenter)
            .field("excluded_domains", &self.excluded_domains)
            .field("power_policy", &self.power_policy)
            .field("iteration_sleep_secs", &self.iteration_sleep_secs)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            uri: String::new(),
            username: String::new(),
            password: String::new(),
            ca_path: String::new(),
            threshold: None,
            datacenter: None,
            excluded_domains: HashSet::new(),
            debug: false,
            iteration_sleep_secs: DEFAULT_ITERATION_SLEEP_SECS,
            power_policy: PowerPolicy::default(),
            unlock_initial_delay_secs: DEFAULT_UNLOCK_INITIAL_DELAY_SECS,
            unlock_poll_interval_secs: DEFAULT_UNLOCK_POLL_INTERVAL_SECS,
            unlock_timeout_secs: DEFAULT_UNLOCK_TIMEOUT_SECS,
            status_port: DEFAULT_STATUS_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            notices: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then the config file, then env overrides.
    ///
    /// `path_override` comes from the command line and wins over `SB_CONFIG_PATH`.
    pub fn load(path_override: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("SB_CONFIG_PATH") {
            config.config_path = path;
        }
        if let Some(path) = path_override {
            config.config_path = path.to_string();
        }

        let cfg_path = Path::new(&config.config_path);
        if !cfg_path.exists() {
            bail!(
                "Config file {} does not exist. Create it from the documented example.",
                config.config_path
            );
        }
        let contents = fs::read_to_string(cfg_path)
            .with_context(|| format!("Failed to read config file: {}", config.config_path))?;
        config.parse_ini(&contents);

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Connection settings may come from the environment so secrets stay out of the file.
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SB_URI") {
            self.uri = v;
        }
        if let Ok(v) = std::env::var("SB_USERNAME") {
            self.username = v;
        }
        if let Ok(v) = std::env::var("SB_PASSWORD") {
            self.password = v;
        }
        if let Ok(v) = std::env::var("SB_CA_PATH") {
            self.ca_path = v;
        }
    }

    /// The balancing policy handed to the planner components.
    pub(crate) fn policy(&self) -> Result<Policy> {
        let threshold = self.threshold.context("THRESHOLD is not set")?;
        Ok(Policy {
            threshold,
            power_policy: self.power_policy,
            datacenter: self.datacenter.clone(),
            excluded_domains: self.excluded_domains.clone(),
        })
    }

    pub(crate) const fn iteration_sleep(&self) -> Duration {
        Duration::from_secs(self.iteration_sleep_secs)
    }
}
