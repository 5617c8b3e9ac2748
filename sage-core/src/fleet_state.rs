use chrono::{DateTime, Utc};
use sage_domain::{FleetState, FleetStateKind, MovementKind, Sector};

pub fn classify(state: &FleetState) -> FleetStateKind {
    match state {
        FleetState::Idle { .. } => FleetStateKind::Idle,
        FleetState::MoveWarp { .. } => FleetStateKind::MoveWarp,
        FleetState::MoveSubwarp { .. } => FleetStateKind::MoveSubwarp,
        FleetState::StarbaseLoadingBay { .. } => FleetStateKind::StarbaseLoadingBay,
        FleetState::MineAsteroid { .. } => FleetStateKind::MineAsteroid,
        FleetState::Respawn { .. } => FleetStateKind::Respawn,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub kind: MovementKind,
    pub to_sector: Sector,
    pub arrival_time: DateTime<Utc>,
}

impl Movement {
    pub fn new(kind: MovementKind, to_sector: Sector, arrival_time: DateTime<Utc>) -> Self {
        Movement { kind, to_sector, arrival_time }
    }

    pub fn has_arrived(&self, now: DateTime<Utc>) -> bool {
        now >= self.arrival_time
    }
}
