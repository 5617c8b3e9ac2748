use crate::{Address, MovementKind, Sector, TransferDirection, TransferRequest};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OperationKind {
    Dock,
    Undock,
    SettleMovement,
    StopMining,
    StartMining,
    DepositCargo,
    WithdrawCargo,
}

/// Typed parameters handed to the instruction builder, one per ledger operation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationParams {
    Dock {
        fleet: Address,
        sector: Sector,
    },
    Undock {
        fleet: Address,
        starbase: Address,
    },
    SettleMovement {
        fleet: Address,
        movement: MovementKind,
        to_sector: Sector,
    },
    StopMining {
        fleet: Address,
        resource: Address,
        asteroid: Address,
        mine_item: Address,
        mint: Address,
    },
    StartMining {
        fleet: Address,
        resource: Address,
        asteroid: Address,
        mint: Address,
    },
    DepositCargo {
        fleet: Address,
        fleet_pod: Address,
        starbase_pod: Address,
        resource: Address,
        amount_in_tokens: u64,
    },
    WithdrawCargo {
        fleet: Address,
        fleet_pod: Address,
        starbase_pod: Address,
        resource: Address,
        amount_in_tokens: u64,
    },
}

impl OperationParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationParams::Dock { .. } => OperationKind::Dock,
            OperationParams::Undock { .. } => OperationKind::Undock,
            OperationParams::SettleMovement { .. } => OperationKind::SettleMovement,
            OperationParams::StopMining { .. } => OperationKind::StopMining,
            OperationParams::StartMining { .. } => OperationKind::StartMining,
            OperationParams::DepositCargo { .. } => OperationKind::DepositCargo,
            OperationParams::WithdrawCargo { .. } => OperationKind::WithdrawCargo,
        }
    }
}

/// Why an operation is part of a submission. Failed groups hand these back so a caller
/// can retry just the missing pieces.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum OperationOrigin {
    Transition {
        kind: OperationKind,
    },
    Command {
        kind: OperationKind,
    },
    CargoTransfer {
        direction: TransferDirection,
        request: TransferRequest,
        amount_in_tokens: u64,
    },
    Bookkeeping {
        label: String,
    },
}

/// Encoded ledger instruction. Never inspected outside the builder and the submission client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EncodedInstruction(pub Vec<u8>);

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub origin: OperationOrigin,
    pub instruction: EncodedInstruction,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionPlan {
    pub steps: Vec<OperationDescriptor>,
}

impl TransitionPlan {
    pub fn new(steps: Vec<OperationDescriptor>) -> Self {
        TransitionPlan { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn step_kinds(&self) -> Vec<OperationKind> {
        self.steps.iter().map(|step| step.kind).collect()
    }

    pub fn into_operations(self) -> Vec<OperationDescriptor> {
        self.steps
    }
}
