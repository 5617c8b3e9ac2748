use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Address(pub String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Sector {
    pub x: i64,
    pub y: i64,
}

impl Sector {
    pub fn new(x: i64, y: i64) -> Self {
        Sector { x, y }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementKind {
    Warp,
    Subwarp,
}

/// Operational state of a fleet as stored on the ledger. Exactly one variant is active.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum FleetState {
    Idle {
        sector: Sector,
    },
    MoveWarp {
        to_sector: Sector,
        arrival_time: DateTime<Utc>,
    },
    MoveSubwarp {
        to_sector: Sector,
        arrival_time: DateTime<Utc>,
    },
    StarbaseLoadingBay {
        starbase: Address,
    },
    MineAsteroid {
        resource: Address,
        asteroid: Address,
    },
    Respawn {
        sector: Sector,
    },
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum FleetStateKind {
    Idle,
    MoveWarp,
    MoveSubwarp,
    StarbaseLoadingBay,
    MineAsteroid,
    Respawn,
}

/// States a command can ask the planner to reach before running its own operations.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
pub enum TargetState {
    Idle,
    StarbaseLoadingBay,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CrewCount {
    pub current: u64,
    pub required: u64,
    pub capacity: u64,
}

impl CrewCount {
    pub fn is_normalized(&self) -> bool {
        self.required <= self.current && self.current <= self.capacity
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FleetCargoPods {
    pub fuel_tank: Address,
    pub ammo_bank: Address,
    pub cargo_hold: Address,
}

impl FleetCargoPods {
    pub fn pod(&self, kind: crate::CargoPodKind) -> &Address {
        match kind {
            crate::CargoPodKind::FuelTank => &self.fuel_tank,
            crate::CargoPodKind::AmmoBank => &self.ammo_bank,
            crate::CargoPodKind::CargoHold => &self.cargo_hold,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FleetAccount {
    pub address: Address,
    pub owner_profile: Address,
    pub state: FleetState,
    pub crew: CrewCount,
    pub cargo_pods: FleetCargoPods,
}

/// A minable resource deposit on an asteroid.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceAccount {
    pub address: Address,
    pub mine_item: Address,
    pub asteroid: Address,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MineItemAccount {
    pub address: Address,
    pub mint: Address,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PlanetAccount {
    pub address: Address,
    pub sector: Sector,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StarbaseAccount {
    pub address: Address,
    pub sector: Sector,
}

/// Cargo units occupied by one token of `mint`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CargoTypeAccount {
    pub mint: Address,
    pub cargo_units_per_token: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AccountKind {
    Fleet,
    CargoPod,
    Resource,
    MineItem,
    Planet,
    Starbase,
    CargoType,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "account_kind")]
pub enum AccountData {
    Fleet(FleetAccount),
    CargoPod(crate::CargoPodSnapshot),
    Resource(ResourceAccount),
    MineItem(MineItemAccount),
    Planet(PlanetAccount),
    Starbase(StarbaseAccount),
    CargoType(CargoTypeAccount),
}

impl AccountData {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountData::Fleet(_) => AccountKind::Fleet,
            AccountData::CargoPod(_) => AccountKind::CargoPod,
            AccountData::Resource(_) => AccountKind::Resource,
            AccountData::MineItem(_) => AccountKind::MineItem,
            AccountData::Planet(_) => AccountKind::Planet,
            AccountData::Starbase(_) => AccountKind::Starbase,
            AccountData::CargoType(_) => AccountKind::CargoType,
        }
    }
}
