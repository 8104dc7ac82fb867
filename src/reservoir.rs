//! Shared reservoir of surplus collateral
//!
//! One pool per engine. The administrator tops it up; the escrow ledger draws
//! from it when a wager would otherwise leave a game under-collateralized, and
//! settlement returns the drawn amount before the house sees any surplus.

use crate::common::types::Amount;
use crate::errors::{BookieError, BookieResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservoir {
    funds: Amount,
}

impl Reservoir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn funds(&self) -> Amount {
        self.funds
    }

    pub(crate) fn fund(&mut self, amount: Amount) -> BookieResult<Amount> {
        self.funds = self
            .funds
            .checked_add(amount)
            .ok_or(BookieError::Overflow("reservoir funding"))?;
        Ok(self.funds)
    }

    /// Only the escrow ledger draws, while accepting a wager
    pub(crate) fn draw(&mut self, amount: Amount) -> BookieResult<()> {
        if amount > self.funds {
            return Err(BookieError::ReservoirExhausted {
                requested: amount,
                available: self.funds,
            });
        }
        self.funds -= amount;
        Ok(())
    }

    /// Returns collateral previously drawn by a settled game
    pub(crate) fn restore(&mut self, amount: Amount) -> BookieResult<()> {
        self.funds = self
            .funds
            .checked_add(amount)
            .ok_or(BookieError::Overflow("reservoir return"))?;
        Ok(())
    }
}
