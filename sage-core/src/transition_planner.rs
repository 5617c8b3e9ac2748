use crate::fleet_state::{classify, Movement};
use crate::format_time_delta_hh_mm_ss;
use crate::sage_client::{build_descriptor, read_planet, read_starbase, resolve_resource_mint, InstructionBuilder, LedgerReader};
use chrono::{DateTime, Utc};
use sage_domain::{
    Address, CrewCount, FleetAccount, FleetState, GameContext, MovementKind, OperationKind, OperationOrigin, OperationParams, PlanningError, Sector, TargetState,
    TransitionPlan,
};
use tracing::{event, Level};

/// Preparatory step before the ledger parameters it needs have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionStep {
    SettleMovement { movement: MovementKind, to_sector: Sector },
    StopMining { resource: Address, asteroid: Address },
    Undock { starbase: Address },
    Dock,
}

impl TransitionStep {
    pub fn kind(&self) -> OperationKind {
        match self {
            TransitionStep::SettleMovement { .. } => OperationKind::SettleMovement,
            TransitionStep::StopMining { .. } => OperationKind::StopMining,
            TransitionStep::Undock { .. } => OperationKind::Undock,
            TransitionStep::Dock => OperationKind::Dock,
        }
    }
}

/// The transition table. Pure: everything it needs is in the fleet's current state.
///
/// Moving fleets can only be planned for once `now >= arrival_time`; before that the
/// caller gets [`PlanningError::StillMoving`] and may try again later. `Respawn` has no
/// known way out and is rejected as an illegal transition.
pub fn transition_steps(state: &FleetState, crew: &CrewCount, target: TargetState, now: DateTime<Utc>) -> Result<Vec<TransitionStep>, PlanningError> {
    match (state, target) {
        (FleetState::Idle { .. }, TargetState::Idle) => Ok(vec![]),
        (FleetState::Idle { .. }, TargetState::StarbaseLoadingBay) => Ok(vec![TransitionStep::Dock]),

        (FleetState::StarbaseLoadingBay { .. }, TargetState::StarbaseLoadingBay) => Ok(vec![]),
        (FleetState::StarbaseLoadingBay { starbase }, TargetState::Idle) => {
            if !crew.is_normalized() {
                return Err(PlanningError::CrewNotNormalized {
                    current: crew.current,
                    required: crew.required,
                    capacity: crew.capacity,
                });
            }
            Ok(vec![TransitionStep::Undock { starbase: starbase.clone() }])
        }

        (FleetState::MoveWarp { to_sector, arrival_time }, target) => {
            settle_movement(Movement::new(MovementKind::Warp, *to_sector, *arrival_time), target, now)
        }
        (FleetState::MoveSubwarp { to_sector, arrival_time }, target) => {
            settle_movement(Movement::new(MovementKind::Subwarp, *to_sector, *arrival_time), target, now)
        }

        (FleetState::MineAsteroid { resource, asteroid }, target) => {
            let stop = TransitionStep::StopMining {
                resource: resource.clone(),
                asteroid: asteroid.clone(),
            };
            match target {
                TargetState::Idle => Ok(vec![stop]),
                TargetState::StarbaseLoadingBay => Ok(vec![stop, TransitionStep::Dock]),
            }
        }

        // TODO: plan a way out of Respawn once the game's respawn rules are published
        (FleetState::Respawn { .. }, target) => Err(PlanningError::IllegalTransition {
            from: classify(state),
            to: target,
        }),
    }
}

fn settle_movement(movement: Movement, target: TargetState, now: DateTime<Utc>) -> Result<Vec<TransitionStep>, PlanningError> {
    if !movement.has_arrived(now) {
        return Err(PlanningError::StillMoving {
            arrival_time: movement.arrival_time,
            kind: movement.kind,
        });
    }

    let settle = TransitionStep::SettleMovement {
        movement: movement.kind,
        to_sector: movement.to_sector,
    };
    match target {
        TargetState::Idle => Ok(vec![settle]),
        TargetState::StarbaseLoadingBay => Ok(vec![settle, TransitionStep::Dock]),
    }
}

/// Sector the fleet will be in once all earlier steps of the plan have run.
async fn docking_sector(state: &FleetState, reader: &dyn LedgerReader) -> Result<Sector, PlanningError> {
    match state {
        FleetState::Idle { sector } | FleetState::Respawn { sector } => Ok(*sector),
        FleetState::MoveWarp { to_sector, .. } | FleetState::MoveSubwarp { to_sector, .. } => Ok(*to_sector),
        FleetState::MineAsteroid { asteroid, .. } => Ok(read_planet(reader, asteroid).await?.sector),
        FleetState::StarbaseLoadingBay { starbase } => Ok(read_starbase(reader, starbase).await?.sector),
    }
}

async fn resolve_step(fleet: &FleetAccount, step: TransitionStep, reader: &dyn LedgerReader) -> Result<OperationParams, PlanningError> {
    let fleet_address = fleet.address.clone();
    let params = match step {
        TransitionStep::SettleMovement { movement, to_sector } => OperationParams::SettleMovement {
            fleet: fleet_address,
            movement,
            to_sector,
        },
        TransitionStep::StopMining { resource, asteroid } => {
            let (resource_account, mine_item) = resolve_resource_mint(reader, &resource).await?;
            OperationParams::StopMining {
                fleet: fleet_address,
                resource,
                asteroid,
                mine_item: resource_account.mine_item,
                mint: mine_item.mint,
            }
        }
        TransitionStep::Undock { starbase } => OperationParams::Undock {
            fleet: fleet_address,
            starbase,
        },
        TransitionStep::Dock => OperationParams::Dock {
            fleet: fleet_address,
            sector: docking_sector(&fleet.state, reader).await?,
        },
    };
    Ok(params)
}

/// Plans the operations that bring `fleet` into `target`.
///
/// `fleet` must have been read right before calling this. Nothing is submitted here;
/// the returned plan is handed back in full or not at all.
pub async fn plan_transition(
    context: &GameContext,
    fleet: &FleetAccount,
    target: TargetState,
    now: DateTime<Utc>,
    reader: &dyn LedgerReader,
    builder: &dyn InstructionBuilder,
) -> Result<TransitionPlan, PlanningError> {
    let current = classify(&fleet.state);
    let steps = transition_steps(&fleet.state, &fleet.crew, target, now).inspect_err(|err| {
        if let PlanningError::StillMoving { arrival_time, .. } = err {
            event!(
                Level::DEBUG,
                "Fleet {} still moving, arrives in {}",
                fleet.address,
                format_time_delta_hh_mm_ss(*arrival_time - now)
            );
        }
    })?;

    let mut descriptors = Vec::with_capacity(steps.len());
    for step in steps {
        let kind = step.kind();
        let params = resolve_step(fleet, step, reader).await?;
        descriptors.push(build_descriptor(builder, context, &params, OperationOrigin::Transition { kind })?);
    }

    let plan = TransitionPlan::new(descriptors);
    event!(
        Level::DEBUG,
        fleet = %fleet.address,
        current = %current,
        target = %target,
        steps = ?plan.step_kinds(),
        "Planned transition"
    );
    Ok(plan)
}
