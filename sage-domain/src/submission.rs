use crate::{OperationOrigin, SubmissionError};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Signature(pub String);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of polling a submitted signature. `on_ledger_error` is set when the ledger
/// included the batch but its execution failed.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfirmationStatus {
    pub on_ledger_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub group_index: usize,
    pub submitted_signature: Option<Signature>,
    pub confirmed: bool,
    pub error: Option<SubmissionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedGroup {
    pub group_index: usize,
    pub error: SubmissionError,
    pub unresolved: Vec<OperationOrigin>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotAttemptedGroup {
    pub group_index: usize,
    pub unresolved: Vec<OperationOrigin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionReport {
    pub outcomes: Vec<BatchOutcome>,
    /// signatures of confirmed groups, in submission order
    pub signatures: Vec<Signature>,
    pub failures: Vec<FailedGroup>,
    /// groups skipped because the submission was cancelled
    pub not_attempted: Vec<NotAttemptedGroup>,
    pub fully_succeeded: bool,
}

impl SubmissionReport {
    pub fn empty() -> Self {
        SubmissionReport {
            fully_succeeded: true,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, group_index: usize, signature: crate::Signature) {
        self.outcomes.push(BatchOutcome {
            group_index,
            submitted_signature: Some(signature.clone()),
            confirmed: true,
            error: None,
        });
        self.signatures.push(signature);
    }

    pub fn record_failure(&mut self, group_index: usize, error: SubmissionError, unresolved: Vec<OperationOrigin>) {
        let submitted_signature = match &error {
            SubmissionError::ConfirmationUnavailable { signature, .. } | SubmissionError::Expired { signature } => Some(signature.clone()),
            SubmissionError::OnLedgerRejection { signature, .. } => signature.clone(),
            SubmissionError::TransientSubmitFailure { .. } | SubmissionError::PartialBatchFailure { .. } => None,
        };
        self.outcomes.push(BatchOutcome {
            group_index,
            submitted_signature,
            confirmed: false,
            error: Some(error.clone()),
        });
        self.failures.push(FailedGroup {
            group_index,
            error,
            unresolved,
        });
    }

    pub fn record_not_attempted(&mut self, group_index: usize, unresolved: Vec<OperationOrigin>) {
        self.not_attempted.push(NotAttemptedGroup { group_index, unresolved });
    }

    pub fn finish(mut self) -> Self {
        self.fully_succeeded = self.failures.is_empty() && self.not_attempted.is_empty();
        self
    }

    /// Everything that did not make it onto the ledger, failed groups first.
    pub fn unresolved(&self) -> Vec<OperationOrigin> {
        self.failures
            .iter()
            .flat_map(|group| group.unresolved.iter().cloned())
            .chain(self.not_attempted.iter().flat_map(|group| group.unresolved.iter().cloned()))
            .collect()
    }

    pub fn into_result(self) -> Result<SubmissionReport, SubmissionError> {
        if self.fully_succeeded {
            Ok(self)
        } else {
            Err(SubmissionError::PartialBatchFailure {
                succeeded_signatures: self.signatures,
                failed_groups: self.failures,
            })
        }
    }
}
