use crate::{AccountKind, Address, CargoPodKind, FailedGroup, FleetStateKind, MovementKind, OperationKind, Signature, TargetState};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("game context has already been initialized")]
    AlreadyInitialized,
    #[error("game context used before it was initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadFailure {
    #[error("account {address} not found")]
    NotFound { address: Address },
    #[error("account {address} is a {actual}, expected a {expected}")]
    UnexpectedAccountKind {
        address: Address,
        expected: AccountKind,
        actual: AccountKind,
    },
    #[error("failed to read account {address}: {reason}")]
    Unavailable { address: Address, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to build {kind} operation: {reason}")]
pub struct BuildFailure {
    pub kind: OperationKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitFailure {
    #[error("network failure while submitting: {reason}")]
    Transient { reason: String },
    #[error("submission rejected by the ledger: {details}")]
    Rejected { details: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmFailure {
    #[error("network failure while confirming: {reason}")]
    Transient { reason: String },
    #[error("{signature} is not confirmed yet")]
    NotYetConfirmed { signature: Signature },
    #[error("{signature} expired before it was included in the ledger")]
    Expired { signature: Signature },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanningError {
    #[error("fleet in state {from} cannot transition to {to}")]
    IllegalTransition { from: FleetStateKind, to: TargetState },
    #[error("fleet is still in {kind} movement until {arrival_time}")]
    StillMoving { arrival_time: DateTime<Utc>, kind: MovementKind },
    #[error("crew is not normalized: {current} aboard, {required} required (capacity {capacity})")]
    CrewNotNormalized { current: u64, required: u64, capacity: u64 },
    #[error(transparent)]
    Read(#[from] ReadFailure),
    #[error(transparent)]
    Build(#[from] BuildFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("source holds {available} tokens, but {requested} tokens were requested")]
    SourceInsufficient { available: u64, requested: u64 },
    #[error("destination has room for {available} tokens, but {requested} tokens were requested")]
    DestinationFull { available: u64, requested: u64 },
    #[error("{resource} cannot be stored in a {pod_kind}")]
    InvalidResourceForPodKind { resource: Address, pod_kind: CargoPodKind },
    #[error("{resource} has a cargo unit multiplier of zero")]
    InvalidMultiplier { resource: Address },
    #[error("quantity of {resource} overflows")]
    QuantityOverflow { resource: Address },
    #[error("cargo pod {pod} is inconsistent: {reason}")]
    InconsistentSnapshot { pod: Address, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("submission still failing after {attempts} attempts: {reason}")]
    TransientSubmitFailure { attempts: u32, reason: String },
    #[error("confirmation of {signature} unavailable after {attempts} attempts: {reason}")]
    ConfirmationUnavailable {
        signature: Signature,
        attempts: u32,
        reason: String,
    },
    #[error("{signature} expired before it landed")]
    Expired { signature: Signature },
    #[error("ledger rejected the batch: {details}")]
    OnLedgerRejection { signature: Option<Signature>, details: String },
    #[error("{} group(s) failed after {} succeeded", .failed_groups.len(), .succeeded_signatures.len())]
    PartialBatchFailure {
        succeeded_signatures: Vec<Signature>,
        failed_groups: Vec<FailedGroup>,
    },
}

impl SubmissionError {
    /// Whether the effects of the failed group might already be on the ledger.
    pub fn may_have_applied(&self) -> bool {
        match self {
            SubmissionError::ConfirmationUnavailable { .. } => true,
            SubmissionError::PartialBatchFailure { failed_groups, .. } => failed_groups.iter().any(|group| group.error.may_have_applied()),
            SubmissionError::TransientSubmitFailure { .. } | SubmissionError::Expired { .. } | SubmissionError::OnLedgerRejection { .. } => false,
        }
    }
}
