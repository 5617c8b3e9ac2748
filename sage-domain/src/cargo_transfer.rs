use crate::{Address, AllocationError, GameContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CargoPodKind {
    FuelTank,
    AmmoBank,
    CargoHold,
}

impl CargoPodKind {
    /// Fuel tanks only hold fuel, ammo banks only hold ammunition, the cargo hold takes anything.
    pub fn accepts_resource(&self, resource: &Address, context: &GameContext) -> bool {
        match self {
            CargoPodKind::FuelTank => resource == &context.fuel_mint,
            CargoPodKind::AmmoBank => resource == &context.ammo_mint,
            CargoPodKind::CargoHold => true,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHolding {
    pub amount_in_tokens: u64,
    pub amount_in_cargo_units: u64,
    pub cargo_units_per_token: u64,
}

pub fn tokens_to_cargo_units(resource: &Address, amount_in_tokens: u64, cargo_units_per_token: u64) -> Result<u64, AllocationError> {
    amount_in_tokens
        .checked_mul(cargo_units_per_token)
        .ok_or_else(|| AllocationError::QuantityOverflow { resource: resource.clone() })
}

/// Holdings and capacity of one cargo compartment, read fresh from the ledger.
///
/// Fleet pods carry their [`CargoPodKind`]. Starbase depots have no kind and no hard
/// capacity, which is expressed as `max_capacity_in_cargo_units == u64::MAX`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CargoPodSnapshot {
    pub address: Address,
    pub kind: Option<CargoPodKind>,
    pub max_capacity_in_cargo_units: u64,
    pub resources: BTreeMap<Address, ResourceHolding>,
    pub total_resources_amount_in_cargo_units: u64,
}

impl CargoPodSnapshot {
    pub fn fleet_pod(address: Address, kind: CargoPodKind, max_capacity_in_cargo_units: u64) -> Self {
        CargoPodSnapshot {
            address,
            kind: Some(kind),
            max_capacity_in_cargo_units,
            resources: BTreeMap::new(),
            total_resources_amount_in_cargo_units: 0,
        }
    }

    pub fn depot(address: Address) -> Self {
        CargoPodSnapshot {
            address,
            kind: None,
            max_capacity_in_cargo_units: u64::MAX,
            resources: BTreeMap::new(),
            total_resources_amount_in_cargo_units: 0,
        }
    }

    pub fn amount_in_tokens(&self, resource: &Address) -> u64 {
        self.resources
            .get(resource)
            .map(|holding| holding.amount_in_tokens)
            .unwrap_or(0)
    }

    pub fn cargo_units_per_token(&self, resource: &Address) -> Option<u64> {
        self.resources.get(resource).map(|holding| holding.cargo_units_per_token)
    }

    pub fn free_capacity_in_cargo_units(&self) -> u64 {
        self.max_capacity_in_cargo_units
            .saturating_sub(self.total_resources_amount_in_cargo_units)
    }

    /// Checks that every holding matches its multiplier, that the parts sum up to the
    /// recorded total and that the total fits into the pod.
    pub fn validate(&self) -> Result<(), AllocationError> {
        let mut sum: u64 = 0;
        for (resource, holding) in self.resources.iter() {
            let expected = tokens_to_cargo_units(resource, holding.amount_in_tokens, holding.cargo_units_per_token)?;
            if expected != holding.amount_in_cargo_units {
                return Err(self.inconsistent(format!(
                    "{resource} holds {} tokens at {} cargo units each, but reports {} cargo units",
                    holding.amount_in_tokens, holding.cargo_units_per_token, holding.amount_in_cargo_units
                )));
            }
            sum = sum
                .checked_add(holding.amount_in_cargo_units)
                .ok_or_else(|| AllocationError::QuantityOverflow { resource: resource.clone() })?;
        }

        if sum != self.total_resources_amount_in_cargo_units {
            return Err(self.inconsistent(format!(
                "holdings sum up to {sum} cargo units, but the recorded total is {}",
                self.total_resources_amount_in_cargo_units
            )));
        }

        if self.total_resources_amount_in_cargo_units > self.max_capacity_in_cargo_units {
            return Err(self.inconsistent(format!(
                "total of {} cargo units exceeds the capacity of {}",
                self.total_resources_amount_in_cargo_units, self.max_capacity_in_cargo_units
            )));
        }

        Ok(())
    }

    pub fn with_tokens_added(&self, resource: &Address, amount_in_tokens: u64, cargo_units_per_token: u64) -> Result<Self, AllocationError> {
        let added_cargo_units = tokens_to_cargo_units(resource, amount_in_tokens, cargo_units_per_token)?;
        let free_tokens = self
            .free_capacity_in_cargo_units()
            .checked_div(cargo_units_per_token)
            .unwrap_or(u64::MAX);
        if amount_in_tokens > free_tokens {
            return Err(AllocationError::DestinationFull {
                available: free_tokens,
                requested: amount_in_tokens,
            });
        }

        let mut updated = self.clone();
        let holding = updated.resources.entry(resource.clone()).or_insert(ResourceHolding {
            amount_in_tokens: 0,
            amount_in_cargo_units: 0,
            cargo_units_per_token,
        });
        if holding.cargo_units_per_token != cargo_units_per_token {
            return Err(self.inconsistent(format!(
                "{resource} is stored at {} cargo units per token, but {cargo_units_per_token} was given",
                holding.cargo_units_per_token
            )));
        }
        let overflow = || AllocationError::QuantityOverflow { resource: resource.clone() };
        holding.amount_in_tokens = holding.amount_in_tokens.checked_add(amount_in_tokens).ok_or_else(overflow)?;
        holding.amount_in_cargo_units = holding.amount_in_cargo_units.checked_add(added_cargo_units).ok_or_else(overflow)?;
        updated.total_resources_amount_in_cargo_units = updated
            .total_resources_amount_in_cargo_units
            .checked_add(added_cargo_units)
            .ok_or_else(overflow)?;

        Ok(updated)
    }

    pub fn with_tokens_removed(&self, resource: &Address, amount_in_tokens: u64) -> Result<Self, AllocationError> {
        let available = self.amount_in_tokens(resource);
        if amount_in_tokens > available {
            return Err(AllocationError::SourceInsufficient {
                available,
                requested: amount_in_tokens,
            });
        }
        if amount_in_tokens == 0 {
            return Ok(self.clone());
        }

        let mut updated = self.clone();
        if let Some(holding) = updated.resources.get_mut(resource) {
            let removed_cargo_units = tokens_to_cargo_units(resource, amount_in_tokens, holding.cargo_units_per_token)?;
            holding.amount_in_tokens -= amount_in_tokens;
            holding.amount_in_cargo_units = holding.amount_in_cargo_units.saturating_sub(removed_cargo_units);
            updated.total_resources_amount_in_cargo_units = updated
                .total_resources_amount_in_cargo_units
                .saturating_sub(removed_cargo_units);
            if holding.amount_in_tokens == 0 {
                updated.resources.remove(resource);
            }
        }

        Ok(updated)
    }

    fn inconsistent(&self, reason: String) -> AllocationError {
        AllocationError::InconsistentSnapshot {
            pod: self.address.clone(),
            reason,
        }
    }
}

/// How `TransferRequest::value` is interpreted when computing the amount to move.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransferMode {
    /// move exactly `value`
    Fixed,
    /// top the destination up to `value`, moving whatever fits
    Max,
    /// guarantee at least `value` in the destination
    Min,
    /// guarantee `value`, then fill the remaining space
    MinAndFill,
}

/// `value` is given in tokens of `resource`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferRequest {
    pub resource: Address,
    pub pod_kind: CargoPodKind,
    pub mode: TransferMode,
    pub value: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransferDirection {
    /// starbase -> fleet pod
    ToFleet,
    /// fleet pod -> starbase
    ToStarbase,
}
