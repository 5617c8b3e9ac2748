use sage_domain::{AllocationError, CargoPodSnapshot, GameContext, TransferDirection, TransferMode, TransferRequest};

/// Computes how much to move for a transfer request.
///
/// All quantities share one unit; converting between tokens and cargo units is the
/// caller's job. The result never exceeds the destination's free capacity.
pub fn allocate(
    mode: TransferMode,
    requested_value: u64,
    resource_amount_in_source: u64,
    resource_amount_in_destination: u64,
    destination_max_capacity: u64,
    destination_current_total_usage: u64,
) -> Result<u64, AllocationError> {
    let free_capacity = destination_max_capacity.saturating_sub(destination_current_total_usage);

    match mode {
        TransferMode::Fixed => {
            if resource_amount_in_source < requested_value {
                return Err(AllocationError::SourceInsufficient {
                    available: resource_amount_in_source,
                    requested: requested_value,
                });
            }
            if free_capacity < requested_value {
                return Err(AllocationError::DestinationFull {
                    available: free_capacity,
                    requested: requested_value,
                });
            }
            Ok(requested_value)
        }
        TransferMode::Max => {
            let needed = requested_value.saturating_sub(resource_amount_in_destination);
            if needed == 0 {
                return Ok(0);
            }
            Ok(free_capacity.min(needed).min(resource_amount_in_source))
        }
        TransferMode::Min => {
            let needed = requested_value.saturating_sub(resource_amount_in_destination);
            if needed == 0 {
                return Ok(0);
            }
            if needed > resource_amount_in_source {
                return Err(AllocationError::SourceInsufficient {
                    available: resource_amount_in_source,
                    requested: needed,
                });
            }
            if needed > free_capacity {
                return Err(AllocationError::DestinationFull {
                    available: free_capacity,
                    requested: needed,
                });
            }
            Ok(needed)
        }
        TransferMode::MinAndFill => {
            if resource_amount_in_destination >= requested_value {
                return Ok(0);
            }
            let needed = requested_value - resource_amount_in_destination;
            if needed > resource_amount_in_source {
                return Err(AllocationError::SourceInsufficient {
                    available: resource_amount_in_source,
                    requested: needed,
                });
            }
            // not capped by `needed`: once we move at all, we top off
            Ok(free_capacity.min(resource_amount_in_source))
        }
    }
}

/// Allocates a request between a fleet pod and a starbase depot, in tokens.
///
/// Free capacity is converted to whole tokens by floor division, so the returned
/// amount times `cargo_units_per_token` always fits into the destination.
pub fn allocate_request(
    context: &GameContext,
    request: &TransferRequest,
    direction: TransferDirection,
    fleet_pod: &CargoPodSnapshot,
    starbase_pod: &CargoPodSnapshot,
    cargo_units_per_token: u64,
) -> Result<u64, AllocationError> {
    if !request.pod_kind.accepts_resource(&request.resource, context) {
        return Err(AllocationError::InvalidResourceForPodKind {
            resource: request.resource.clone(),
            pod_kind: request.pod_kind,
        });
    }
    if cargo_units_per_token == 0 {
        return Err(AllocationError::InvalidMultiplier {
            resource: request.resource.clone(),
        });
    }

    let (source, destination) = match direction {
        TransferDirection::ToFleet => (starbase_pod, fleet_pod),
        TransferDirection::ToStarbase => (fleet_pod, starbase_pod),
    };

    let free_tokens = destination.free_capacity_in_cargo_units() / cargo_units_per_token;

    allocate(
        request.mode,
        request.value,
        source.amount_in_tokens(&request.resource),
        destination.amount_in_tokens(&request.resource),
        free_tokens,
        0,
    )
}
