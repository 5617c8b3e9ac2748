use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{RetryDecision, RetryPolicy, Retryable};
use sage_domain::{ConfirmFailure, ReadFailure, SubmitFailure};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::{event, Level};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded retry budget with exponential backoff between attempts.
/// Every attempt is also bounded in time; an attempt that does not finish is transient.
#[derive(Debug, Clone)]
pub struct SubmissionRetryPolicy {
    max_attempts: u32,
    attempt_timeout: Duration,
    backoff: ExponentialBackoff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// classified as fatal, returned after the attempt that produced it
    Fatal { attempts: u32, error: E },
    Exhausted { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    pub fn into_error(self) -> E {
        match self {
            RetryError::Fatal { error, .. } => error,
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

impl SubmissionRetryPolicy {
    /// `max_attempts` counts the first try; it is clamped to at least one.
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        let max_attempts = max_attempts.max(1);
        let backoff = ExponentialBackoff::builder()
            .retry_bounds(min_delay, max_delay.max(min_delay))
            .build_with_max_retries(max_attempts - 1);

        SubmissionRetryPolicy {
            max_attempts,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            backoff,
        }
    }

    pub fn with_attempt_timeout(self, attempt_timeout: Duration) -> Self {
        SubmissionRetryPolicy { attempt_timeout, ..self }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    pub fn next_delay(&self, started_at: SystemTime, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.max_attempts {
            return None;
        }
        match self.backoff.should_retry(started_at, attempts_made.saturating_sub(1)) {
            RetryDecision::Retry { execute_after } => Some(
                execute_after
                    .duration_since(SystemTime::now())
                    .unwrap_or(Duration::ZERO),
            ),
            RetryDecision::DoNotRetry => None,
        }
    }

    /// Runs `operation` until it succeeds, fails fatally or the attempts run out.
    /// `timed_out` turns an attempt that exceeded the attempt timeout into an error of the operation's type.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        classify: impl Fn(&E) -> Retryable,
        timed_out: impl Fn(Duration) -> E,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started_at = SystemTime::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(_elapsed) => timed_out(self.attempt_timeout),
            };

            if matches!(classify(&error), Retryable::Fatal) {
                return Err(RetryError::Fatal { attempts, error });
            }

            match self.next_delay(started_at, attempts) {
                Some(delay) => {
                    event!(
                        Level::WARN,
                        "{label} failed on attempt {attempts} of {}: {error}. Retrying in {delay:?}",
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(RetryError::Exhausted {
                        attempts,
                        last_error: error,
                    })
                }
            }
        }
    }
}

pub fn classify_submit_failure(failure: &SubmitFailure) -> Retryable {
    match failure {
        SubmitFailure::Transient { .. } => Retryable::Transient,
        SubmitFailure::Rejected { .. } => Retryable::Fatal,
    }
}

pub fn classify_read_failure(failure: &ReadFailure) -> Retryable {
    match failure {
        ReadFailure::Unavailable { .. } => Retryable::Transient,
        ReadFailure::NotFound { .. } | ReadFailure::UnexpectedAccountKind { .. } => Retryable::Fatal,
    }
}

pub fn submit_timed_out(after: Duration) -> SubmitFailure {
    SubmitFailure::Transient {
        reason: format!("no response within {after:?}"),
    }
}

pub fn confirm_timed_out(after: Duration) -> ConfirmFailure {
    ConfirmFailure::Transient {
        reason: format!("no response within {after:?}"),
    }
}

pub fn classify_confirm_failure(failure: &ConfirmFailure) -> Retryable {
    match failure {
        ConfirmFailure::Transient { .. } | ConfirmFailure::NotYetConfirmed { .. } => Retryable::Transient,
        ConfirmFailure::Expired { .. } => Retryable::Fatal,
    }
}
