use crate::retry_policy::SubmissionRetryPolicy;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

pub const ENV_PREFIX: &str = "SAGE_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to read configuration from the environment: {0}")]
    Env(#[from] envy::Error),
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("retry delay bounds are inverted: min {min_ms}ms > max {max_ms}ms")]
    InvertedRetryBounds { min_ms: u64, max_ms: u64 },
    #[error("attempt timeout must be at least 1ms")]
    ZeroAttemptTimeout,
}

/// Submission and ledger read settings, read from `SAGE_*` environment variables.
/// `attempt_timeout_ms` bounds every single submit, confirm and read call.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct SubmitterConfiguration {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_attempts")]
    pub max_submit_attempts: u32,
    #[serde(default = "default_attempts")]
    pub max_confirm_attempts: u32,
    #[serde(default = "default_attempts")]
    pub max_read_attempts: u32,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_retry_min_delay_ms")]
    pub retry_min_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_batch_size() -> usize {
    5
}

fn default_attempts() -> u32 {
    5
}

fn default_attempt_timeout_ms() -> u64 {
    30_000
}

fn default_retry_min_delay_ms() -> u64 {
    250
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

impl Default for SubmitterConfiguration {
    fn default() -> Self {
        SubmitterConfiguration {
            batch_size: default_batch_size(),
            max_submit_attempts: default_attempts(),
            max_confirm_attempts: default_attempts(),
            max_read_attempts: default_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            retry_min_delay_ms: default_retry_min_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl SubmitterConfiguration {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let config: SubmitterConfiguration = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validated()
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigurationError> {
        let config: SubmitterConfiguration = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validated()
    }

    fn validated(self) -> Result<Self, ConfigurationError> {
        if self.batch_size == 0 {
            return Err(ConfigurationError::ZeroBatchSize);
        }
        if self.retry_min_delay_ms > self.retry_max_delay_ms {
            return Err(ConfigurationError::InvertedRetryBounds {
                min_ms: self.retry_min_delay_ms,
                max_ms: self.retry_max_delay_ms,
            });
        }
        if self.attempt_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroAttemptTimeout);
        }
        Ok(self)
    }

    pub fn batch_size(&self) -> Result<NonZeroUsize, ConfigurationError> {
        NonZeroUsize::new(self.batch_size).ok_or(ConfigurationError::ZeroBatchSize)
    }

    pub fn submit_policy(&self) -> SubmissionRetryPolicy {
        self.policy(self.max_submit_attempts)
    }

    pub fn confirm_policy(&self) -> SubmissionRetryPolicy {
        self.policy(self.max_confirm_attempts)
    }

    pub fn read_policy(&self) -> SubmissionRetryPolicy {
        self.policy(self.max_read_attempts)
    }

    fn policy(&self, max_attempts: u32) -> SubmissionRetryPolicy {
        SubmissionRetryPolicy::new(max_attempts, self.retry_min_delay(), self.retry_max_delay())
            .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
    }

    fn retry_min_delay(&self) -> Duration {
        Duration::from_millis(self.retry_min_delay_ms)
    }

    fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}
