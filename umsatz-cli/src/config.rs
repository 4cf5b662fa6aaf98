use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use umsatz_bank::BankConfig;

/// Optional TOML config; every field has a compiled-in default so a partial
/// file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bank: BankSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankSection {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub challenge_timeout_secs: u64,
    pub poll_retries: u32,
    pub export_retries: u32,
    pub backoff_base_millis: u64,
    pub request_timeout_secs: u64,
}

impl Default for BankSection {
    fn default() -> Self {
        let defaults = BankConfig::default();
        Self {
            base_url: defaults.base_url,
            poll_interval_secs: defaults.poll_interval.as_secs(),
            challenge_timeout_secs: defaults.challenge_timeout.as_secs(),
            poll_retries: defaults.poll_retry_limit,
            export_retries: defaults.export_retry_limit,
            backoff_base_millis: defaults.backoff_base.as_millis() as u64,
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

impl Config {
    pub fn bank_config(&self) -> BankConfig {
        BankConfig {
            base_url: self.bank.base_url.clone(),
            poll_interval: Duration::from_secs(self.bank.poll_interval_secs),
            challenge_timeout: Duration::from_secs(self.bank.challenge_timeout_secs),
            poll_retry_limit: self.bank.poll_retries,
            export_retry_limit: self.bank.export_retries,
            backoff_base: Duration::from_millis(self.bank.backoff_base_millis),
            request_timeout: Duration::from_secs(self.bank.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bank_config() {
        let bank = Config::default().bank_config();
        let reference = BankConfig::default();
        assert_eq!(bank.base_url, reference.base_url);
        assert_eq!(bank.poll_interval, reference.poll_interval);
        assert_eq!(bank.challenge_timeout, reference.challenge_timeout);
    }

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let config: Config = toml::from_str("[bank]\npoll_interval_secs = 5\n").unwrap();
        assert_eq!(config.bank.poll_interval_secs, 5);
        assert_eq!(config.bank.base_url, BankConfig::default().base_url);
    }
}
