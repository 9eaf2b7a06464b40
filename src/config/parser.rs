use super::settings::AppConfig;
use crate::balancer::PowerPolicy;

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "yes" | "true" | "1")
}

impl AppConfig {
    /// Parse the simple KEY="VALUE" config format.
    pub(crate) fn parse_ini(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');

            match key {
                "URI" => self.uri = value.to_string(),
                "USERNAME" => self.username = value.to_string(),
                "PASSWORD" => self.password = value.to_string(),
                "CA_PATH" => self.ca_path = value.to_string(),
                "THRESHOLD" => match value.parse() {
                    Ok(v) => self.threshold = Some(v),
                    Err(_) => self.notices.push(format!("Ignoring invalid THRESHOLD '{value}'")),
                },
                "DATACENTER" => {
                    self.datacenter = (!value.is_empty()).then(|| value.to_string());
                }
                "NO_BALANCE" => {
                    self.excluded_domains = value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                "DEBUG" => self.debug = parse_flag(value),
                "POLICY" => {
                    if let Some(policy) = PowerPolicy::parse(value) {
                        self.power_policy = policy;
                    } else {
                        self.notices.push(format!(
                            "Unknown POLICY '{value}', falling back to '{}'",
                            PowerPolicy::Both
                        ));
                        self.power_policy = PowerPolicy::Both;
                    }
                }
                "ITERATION_SLEEP" => {
                    self.parse_number(key, value, |c, v| c.iteration_sleep_secs = v);
                }
                "UNLOCK_INITIAL_DELAY" => {
                    self.parse_number(key, value, |c, v| c.unlock_initial_delay_secs = v);
                }
                "UNLOCK_POLL_INTERVAL" => {
                    self.parse_number(key, value, |c, v| c.unlock_poll_interval_secs = v);
                }
                "UNLOCK_TIMEOUT" => self.parse_number(key, value, |c, v| c.unlock_timeout_secs = v),
                "REQUEST_TIMEOUT" => {
                    self.parse_number(key, value, |c, v| c.request_timeout_secs = v);
                }
                "STATUS_PORT" => match value.parse() {
                    Ok(v) => self.status_port = v,
                    Err(_) => self.notices.push(format!("Ignoring invalid STATUS_PORT '{value}'")),
                },
                _ => {} // Ignore unknown keys
            }
        }
    }

    fn parse_number(&mut self, key: &str, value: &str, apply: impl FnOnce(&mut Self, u64)) {
        match value.parse() {
            Ok(v) => apply(self, v),
            Err(_) => self.notices.push(format!("Ignoring invalid {key} '{value}'")),
        }
    }
}
