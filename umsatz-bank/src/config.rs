use std::time::Duration;

/// Tunables for the conversation with the bank. The defaults mirror the web
/// banking's observed behavior; the CLI overlays values from its config file.
#[derive(Debug, Clone)]
pub struct BankConfig {
    pub base_url: String,
    /// Pause between two challenge status polls.
    pub poll_interval: Duration,
    /// Total budget for the out-of-band confirmation.
    pub challenge_timeout: Duration,
    /// Consecutive transient poll failures tolerated before giving up.
    pub poll_retry_limit: u32,
    /// Transient export failures retried per account.
    pub export_retry_limit: u32,
    /// First backoff delay; doubles per retry.
    pub backoff_base: Duration,
    pub request_timeout: Duration,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.dkb.de".to_string(),
            poll_interval: Duration::from_secs(3),
            challenge_timeout: Duration::from_secs(300),
            poll_retry_limit: 3,
            export_retry_limit: 3,
            backoff_base: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}
