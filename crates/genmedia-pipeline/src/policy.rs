use std::time::Duration;

use genmedia_core::Config;

/// How the video workflow waits for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed delay before every status check.
    pub interval: Duration,
    /// `None` polls until the job is done.
    pub max_attempts: Option<u32>,
    /// Consecutive transport or rate-limit failures tolerated while polling.
    pub max_transient_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: None,
            max_transient_failures: 3,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.video_poll_interval_secs),
            max_attempts: config.video_poll_max_attempts,
            max_transient_failures: config.video_poll_max_transient_failures,
        }
    }

    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}
