use crate::{Address, ContextError};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Addresses every planning and allocation call needs. Passed explicitly, never global.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GameContext {
    pub game: Address,
    pub program: Address,
    pub profile: Address,
    pub fuel_mint: Address,
    pub ammo_mint: Address,
}

/// Owned slot for a [`GameContext`] that can be filled exactly once.
#[derive(Debug, Default)]
pub struct GameContextCell {
    context: OnceLock<GameContext>,
}

impl GameContextCell {
    pub fn new() -> Self {
        GameContextCell { context: OnceLock::new() }
    }

    pub fn initialize(&self, context: GameContext) -> Result<&GameContext, ContextError> {
        self.context.set(context).map_err(|_| ContextError::AlreadyInitialized)?;
        self.get()
    }

    pub fn get(&self) -> Result<&GameContext, ContextError> {
        self.context.get().ok_or(ContextError::NotInitialized)
    }
}
