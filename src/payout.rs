//! American-odds payout arithmetic
//!
//! Integer-only. `payout` floors, `inverse_payout` returns the smallest stake
//! that earns at least the requested payout, so the pair composes to the
//! identity on every payout value the forward function can produce.

use crate::common::types::Amount;
use crate::errors::{BookieError, BookieResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted odds magnitude (even money)
pub const MIN_ODDS_MAGNITUDE: u32 = 100;

/// Largest accepted odds magnitude (1000:1 either way)
pub const MAX_ODDS_MAGNITUDE: u32 = 100_000;

/// Validated American odds
///
/// Negative values are favourites (risk `|odds|` to win 100), positive values
/// are underdogs (risk 100 to win `odds`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Odds(i32);

impl Odds {
    pub fn new(value: i32) -> BookieResult<Self> {
        Self::bounded(value, MAX_ODDS_MAGNITUDE)
    }

    /// Validates against a tighter magnitude cap than the global one
    pub fn bounded(value: i32, max_magnitude: u32) -> BookieResult<Self> {
        let max = max_magnitude.min(MAX_ODDS_MAGNITUDE);
        let magnitude = value.unsigned_abs();
        if magnitude < MIN_ODDS_MAGNITUDE || magnitude > max {
            return Err(BookieError::OddsOutOfRange {
                odds: value,
                min: MIN_ODDS_MAGNITUDE,
                max,
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn magnitude(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub fn is_favorite(self) -> bool {
        self.0 < 0
    }
}

impl TryFrom<i32> for Odds {
    type Error = BookieError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Odds::new(value)
    }
}

impl From<Odds> for i32 {
    fn from(odds: Odds) -> Self {
        odds.0
    }
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

fn narrow(value: u128, what: &'static str) -> BookieResult<Amount> {
    Amount::try_from(value).map_err(|_| BookieError::Overflow(what))
}

fn payout_wide(stake: u128, odds: Odds) -> u128 {
    let magnitude = odds.magnitude() as u128;
    if odds.is_favorite() {
        stake * 100 / magnitude
    } else {
        stake * magnitude / 100
    }
}

fn inverse_payout_wide(payout: u128, odds: Odds) -> u128 {
    let magnitude = odds.magnitude() as u128;
    if odds.is_favorite() {
        (payout * magnitude).div_ceil(100)
    } else {
        (payout * 100).div_ceil(magnitude)
    }
}

/// Winnings (excluding the returned stake) for `stake` at `odds`, floored
pub fn payout(stake: Amount, odds: Odds) -> BookieResult<Amount> {
    narrow(payout_wide(stake as u128, odds), "payout")
}

/// Smallest stake whose payout at `odds` is at least `payout`
pub fn inverse_payout(payout: Amount, odds: Odds) -> BookieResult<Amount> {
    narrow(inverse_payout_wide(payout as u128, odds), "inverse payout")
}

/// Largest stake whose payout at `odds` does not exceed `capacity`
///
/// Saturates at `Amount::MAX` when any representable stake fits.
pub fn max_stake_for_payout(capacity: Amount, odds: Odds) -> Amount {
    let first_over = inverse_payout_wide(capacity as u128 + 1, odds);
    // first_over >= 1 because capacity + 1 >= 1 and odds are non-zero
    Amount::try_from(first_over - 1).unwrap_or(Amount::MAX)
}
