use crate::cargo_allocation::allocate_request;
use crate::sage_client::{build_descriptor, expect_cargo_type, read_cargo_pod, InstructionBuilder, LedgerReader};
use futures::future::try_join_all;
use itertools::Itertools;
use sage_domain::{
    AccountKind, Address, AllocationError, BuildFailure, CargoPodKind, CargoPodSnapshot, FleetAccount, GameContext, OperationDescriptor, OperationOrigin,
    OperationParams, ReadFailure, TransferDirection, TransferRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CargoTransferError {
    #[error("cannot transfer {} into the {}: {error}", .request.resource, .request.pod_kind)]
    Allocation { request: TransferRequest, error: AllocationError },
    #[error(transparent)]
    Snapshot(AllocationError),
    #[error(transparent)]
    Read(#[from] ReadFailure),
    #[error(transparent)]
    Build(#[from] BuildFailure),
}

/// Turns transfer requests between a fleet and a starbase into deposit/withdraw operations.
#[derive(Debug, Clone)]
pub struct CargoTransferManager {
    reader: Arc<dyn LedgerReader>,
    builder: Arc<dyn InstructionBuilder>,
}

impl CargoTransferManager {
    pub fn new(reader: Arc<dyn LedgerReader>, builder: Arc<dyn InstructionBuilder>) -> Self {
        CargoTransferManager { reader, builder }
    }

    /// Plans all `requests` in order against snapshots read right now.
    ///
    /// Each allocation is applied to a running copy of the snapshots before the next
    /// request is looked at, so two requests can't claim the same free space.
    /// Requests that allocate nothing produce no operation.
    pub async fn plan_transfers(
        &self,
        context: &GameContext,
        fleet: &FleetAccount,
        starbase_pod: &Address,
        direction: TransferDirection,
        requests: &[TransferRequest],
    ) -> Result<Vec<OperationDescriptor>, CargoTransferError> {
        // pod compatibility needs no ledger state
        if let Some(request) = requests
            .iter()
            .find(|request| !request.pod_kind.accepts_resource(&request.resource, context))
        {
            return Err(CargoTransferError::Allocation {
                request: request.clone(),
                error: AllocationError::InvalidResourceForPodKind {
                    resource: request.resource.clone(),
                    pod_kind: request.pod_kind,
                },
            });
        }
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let (mut fleet_pods, mut starbase, multipliers) = tokio::try_join!(
            self.read_fleet_pods(fleet, requests),
            async { read_cargo_pod(self.reader.as_ref(), starbase_pod).await.map_err(CargoTransferError::from) },
            self.read_multipliers(requests),
        )?;

        starbase.validate().map_err(CargoTransferError::Snapshot)?;

        let mut descriptors = Vec::new();
        for request in requests {
            let resource = &request.resource;
            let cargo_units_per_token = *multipliers.get(resource).ok_or_else(|| ReadFailure::NotFound { address: resource.clone() })?;
            let fleet_pod = fleet_pods
                .get(&request.pod_kind)
                .ok_or_else(|| ReadFailure::NotFound {
                    address: fleet.cargo_pods.pod(request.pod_kind).clone(),
                })?;

            let allocation_error = |error| CargoTransferError::Allocation {
                request: request.clone(),
                error,
            };

            let amount_in_tokens =
                allocate_request(context, request, direction, fleet_pod, &starbase, cargo_units_per_token).map_err(allocation_error)?;
            if amount_in_tokens == 0 {
                event!(Level::DEBUG, "Nothing to transfer for {} ({})", resource, request.mode);
                continue;
            }

            let (updated_fleet_pod, updated_starbase) = match direction {
                TransferDirection::ToFleet => (
                    fleet_pod
                        .with_tokens_added(resource, amount_in_tokens, cargo_units_per_token)
                        .map_err(allocation_error)?,
                    starbase.with_tokens_removed(resource, amount_in_tokens).map_err(allocation_error)?,
                ),
                TransferDirection::ToStarbase => (
                    fleet_pod.with_tokens_removed(resource, amount_in_tokens).map_err(allocation_error)?,
                    starbase
                        .with_tokens_added(resource, amount_in_tokens, cargo_units_per_token)
                        .map_err(allocation_error)?,
                ),
            };

            let params = transfer_params(fleet, &updated_fleet_pod.address, starbase_pod, resource, direction, amount_in_tokens);
            let origin = OperationOrigin::CargoTransfer {
                direction,
                request: request.clone(),
                amount_in_tokens,
            };
            descriptors.push(build_descriptor(self.builder.as_ref(), context, &params, origin)?);

            event!(
                Level::DEBUG,
                "Planned {} of {} {} ({} mode)",
                params.kind(),
                amount_in_tokens,
                resource,
                request.mode
            );
            fleet_pods.insert(request.pod_kind, updated_fleet_pod);
            starbase = updated_starbase;
        }

        Ok(descriptors)
    }

    async fn read_fleet_pods(&self, fleet: &FleetAccount, requests: &[TransferRequest]) -> Result<HashMap<CargoPodKind, CargoPodSnapshot>, CargoTransferError> {
        let pod_kinds = requests.iter().map(|request| request.pod_kind).unique().collect_vec();

        let snapshots = try_join_all(
            pod_kinds
                .iter()
                .map(|kind| read_cargo_pod(self.reader.as_ref(), fleet.cargo_pods.pod(*kind))),
        )
        .await?;

        pod_kinds
            .into_iter()
            .zip(snapshots)
            .map(|(kind, snapshot)| -> Result<(CargoPodKind, CargoPodSnapshot), CargoTransferError> {
                if snapshot.kind != Some(kind) {
                    return Err(CargoTransferError::Snapshot(AllocationError::InconsistentSnapshot {
                        pod: snapshot.address.clone(),
                        reason: format!("expected a {kind}, found {:?}", snapshot.kind),
                    }));
                }
                snapshot.validate().map_err(CargoTransferError::Snapshot)?;
                Ok((kind, snapshot))
            })
            .collect()
    }

    /// Cargo unit multipliers per resource. Cargo type accounts are keyed by mint.
    async fn read_multipliers(&self, requests: &[TransferRequest]) -> Result<HashMap<Address, u64>, CargoTransferError> {
        let lookups = requests
            .iter()
            .map(|request| request.resource.clone())
            .unique()
            .map(|mint| (mint, AccountKind::CargoType))
            .collect_vec();

        let results = self.reader.read_many(&lookups).await;

        lookups
            .into_iter()
            .zip(results)
            .map(|((mint, _), result)| -> Result<(Address, u64), CargoTransferError> {
                let cargo_type = expect_cargo_type(&mint, result?)?;
                Ok((mint, cargo_type.cargo_units_per_token))
            })
            .collect()
    }
}

fn transfer_params(
    fleet: &FleetAccount,
    fleet_pod: &Address,
    starbase_pod: &Address,
    resource: &Address,
    direction: TransferDirection,
    amount_in_tokens: u64,
) -> OperationParams {
    match direction {
        TransferDirection::ToFleet => OperationParams::WithdrawCargo {
            fleet: fleet.address.clone(),
            fleet_pod: fleet_pod.clone(),
            starbase_pod: starbase_pod.clone(),
            resource: resource.clone(),
            amount_in_tokens,
        },
        TransferDirection::ToStarbase => OperationParams::DepositCargo {
            fleet: fleet.address.clone(),
            fleet_pod: fleet_pod.clone(),
            starbase_pod: starbase_pod.clone(),
            resource: resource.clone(),
            amount_in_tokens,
        },
    }
}
