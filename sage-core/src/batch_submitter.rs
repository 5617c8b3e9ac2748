use crate::retry_policy::{classify_confirm_failure, classify_submit_failure, confirm_timed_out, submit_timed_out, RetryError, SubmissionRetryPolicy};
use crate::sage_client::SubmissionClient;
use itertools::Itertools;
use sage_domain::{ConfirmFailure, OperationDescriptor, OperationOrigin, Signature, SubmissionError, SubmissionReport, SubmitFailure};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{event, info_span, Instrument, Level};

/// Splits `operations` into consecutive groups of at most `batch_size`, attaching `after`
/// to the last group only. An empty plan yields no groups.
pub fn partition_into_groups(operations: Vec<OperationDescriptor>, batch_size: NonZeroUsize, after: &[OperationDescriptor]) -> Vec<Vec<OperationDescriptor>> {
    let mut groups = operations
        .into_iter()
        .chunks(batch_size.get())
        .into_iter()
        .map(|chunk| chunk.collect_vec())
        .collect_vec();

    if let Some(last) = groups.last_mut() {
        last.extend(after.iter().cloned());
    }
    groups
}

/// Submits groups of operations one after another, waiting for each to confirm.
///
/// Groups run strictly in order because later groups may depend on accounts created by
/// earlier ones. A failing group does not stop the following groups.
#[derive(Debug, Clone)]
pub struct BatchSubmitter {
    client: Arc<dyn SubmissionClient>,
    submit_policy: SubmissionRetryPolicy,
    confirm_policy: SubmissionRetryPolicy,
}

impl BatchSubmitter {
    pub fn new(client: Arc<dyn SubmissionClient>, submit_policy: SubmissionRetryPolicy, confirm_policy: SubmissionRetryPolicy) -> Self {
        BatchSubmitter {
            client,
            submit_policy,
            confirm_policy,
        }
    }

    pub async fn submit(
        &self,
        operations: Vec<OperationDescriptor>,
        batch_size: NonZeroUsize,
        after: &[OperationDescriptor],
        cancellation: &CancellationToken,
    ) -> SubmissionReport {
        let groups = partition_into_groups(operations, batch_size, after);
        let number_of_groups = groups.len();
        let mut report = SubmissionReport::default();

        for (group_index, group) in groups.into_iter().enumerate() {
            let unresolved = origins_of(&group);

            if cancellation.is_cancelled() {
                event!(Level::INFO, "Submission cancelled, skipping group {} of {}", group_index + 1, number_of_groups);
                report.record_not_attempted(group_index, unresolved);
                continue;
            }

            let span = info_span!("submit_group", group_index, group_size = group.len());
            match self.submit_group(&group).instrument(span).await {
                Ok(signature) => {
                    event!(
                        Level::INFO,
                        "Group {} of {} confirmed with {} operations: {}",
                        group_index + 1,
                        number_of_groups,
                        group.len(),
                        signature
                    );
                    report.record_success(group_index, signature);
                }
                Err(error) => {
                    event!(Level::ERROR, "Group {} of {} failed: {}", group_index + 1, number_of_groups, error);
                    report.record_failure(group_index, error, unresolved);
                }
            }
        }

        report.finish()
    }

    async fn submit_group(&self, group: &[OperationDescriptor]) -> Result<Signature, SubmissionError> {
        let signature = self
            .submit_policy
            .run("submit", classify_submit_failure, submit_timed_out, || self.client.submit(group))
            .await
            .map_err(Self::submit_error)?;

        let status = self
            .confirm_policy
            .run("confirm", classify_confirm_failure, confirm_timed_out, || self.client.confirm(&signature))
            .await
            .map_err(|err| Self::confirm_error(&signature, err))?;

        match status.on_ledger_error {
            None => Ok(signature),
            Some(details) => Err(SubmissionError::OnLedgerRejection {
                signature: Some(signature),
                details,
            }),
        }
    }

    fn submit_error(error: RetryError<SubmitFailure>) -> SubmissionError {
        match error {
            RetryError::Fatal {
                error: SubmitFailure::Rejected { details },
                ..
            } => SubmissionError::OnLedgerRejection { signature: None, details },
            RetryError::Fatal { attempts, error } => SubmissionError::TransientSubmitFailure {
                attempts,
                reason: error.to_string(),
            },
            RetryError::Exhausted { attempts, last_error } => SubmissionError::TransientSubmitFailure {
                attempts,
                reason: last_error.to_string(),
            },
        }
    }

    fn confirm_error(signature: &Signature, error: RetryError<ConfirmFailure>) -> SubmissionError {
        match error {
            RetryError::Fatal {
                error: ConfirmFailure::Expired { signature },
                ..
            } => SubmissionError::Expired { signature },
            RetryError::Fatal { attempts, error } => SubmissionError::ConfirmationUnavailable {
                signature: signature.clone(),
                attempts,
                reason: error.to_string(),
            },
            RetryError::Exhausted { attempts, last_error } => SubmissionError::ConfirmationUnavailable {
                signature: signature.clone(),
                attempts,
                reason: last_error.to_string(),
            },
        }
    }
}

/// Origins of the operations in `operations`, for reporting.
pub fn origins_of(operations: &[OperationDescriptor]) -> Vec<OperationOrigin> {
    operations.iter().map(|op| op.origin.clone()).collect()
}
