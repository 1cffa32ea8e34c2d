//! Events published through the broker

use serde::{Deserialize, Serialize};

use crate::LedgerMovement;

/// Event emitted by the liquidity fee engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Ledger movements applied as one batch
    LedgerMovements(Vec<LedgerMovement>),
}

impl Event {
    pub fn ledger_movements(movements: Vec<LedgerMovement>) -> Self {
        Event::LedgerMovements(movements)
    }

    /// Number of movements carried by the event
    pub fn movement_count(&self) -> usize {
        match self {
            Event::LedgerMovements(movements) => movements.len(),
        }
    }
}
