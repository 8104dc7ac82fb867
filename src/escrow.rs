//! Per-game escrow ledger
//!
//! Tracks collateral (administrator funding, reservoir draws and accepted
//! stakes) against the worst-case obligation of the two mutually exclusive
//! wager pools. After every committed transition
//! `collateral >= max(obligation(home), obligation(away))`.

use crate::common::types::{Amount, Outcome, Side};
use crate::errors::{BookieError, BookieResult};
use crate::payout::{self, Odds};
use crate::reservoir::Reservoir;
use serde::{Deserialize, Serialize};

/// Stake and locked-in winnings accumulated on one side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideBook {
    pub staked: Amount,
    pub payouts: Amount,
}

impl SideBook {
    /// Owed to this side if it wins: every stake back plus every locked payout
    pub fn obligation(&self) -> u128 {
        self.staked as u128 + self.payouts as u128
    }
}

/// Cumulative stake per side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalWagers {
    pub home_or_under_wagered: Amount,
    pub away_or_over_wagered: Amount,
}

/// Pre-computed effect of accepting one wager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowQuote {
    pub side: Side,
    pub stake: Amount,
    pub payout: Amount,
    /// Collateral that must come from the reservoir
    pub shortfall: Amount,
    next_side: SideBook,
    next_drawn: Amount,
}

/// Split of a settled game's releasable surplus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRelease {
    pub to_reservoir: Amount,
    pub to_house: Amount,
}

impl HouseRelease {
    pub fn is_empty(&self) -> bool {
        self.to_reservoir == 0 && self.to_house == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEscrow {
    funded_collateral: Amount,
    reservoir_drawn: Amount,
    home: SideBook,
    away: SideBook,
    paid_to_bettors: Amount,
    returned_to_reservoir: Amount,
    released_to_house: Amount,
}

fn saturate(value: u128) -> Amount {
    Amount::try_from(value).unwrap_or(Amount::MAX)
}

impl GameEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn side(&self, side: Side) -> &SideBook {
        match side {
            Side::HomeOrUnder => &self.home,
            Side::AwayOrOver => &self.away,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::HomeOrUnder => &mut self.home,
            Side::AwayOrOver => &mut self.away,
        }
    }

    pub fn funded_collateral(&self) -> Amount {
        self.funded_collateral
    }

    pub fn reservoir_drawn(&self) -> Amount {
        self.reservoir_drawn
    }

    pub fn paid_to_bettors(&self) -> Amount {
        self.paid_to_bettors
    }

    pub fn released_to_house(&self) -> Amount {
        self.released_to_house
    }

    pub fn returned_to_reservoir(&self) -> Amount {
        self.returned_to_reservoir
    }

    pub fn total_wagers(&self) -> TotalWagers {
        TotalWagers {
            home_or_under_wagered: self.home.staked,
            away_or_over_wagered: self.away.staked,
        }
    }

    fn collateral_wide(&self) -> u128 {
        self.funded_collateral as u128
            + self.reservoir_drawn as u128
            + self.home.staked as u128
            + self.away.staked as u128
    }

    /// Funding, reservoir draws and accepted stakes held for this game
    pub fn collateral(&self) -> Amount {
        saturate(self.collateral_wide())
    }

    fn total_at_risk_wide(&self) -> u128 {
        self.home.obligation().max(self.away.obligation())
    }

    /// Worst-case amount owed across the two possible winning sides
    pub fn total_at_risk(&self) -> Amount {
        saturate(self.total_at_risk_wide())
    }

    pub fn spare_escrow_amount(&self) -> Amount {
        saturate(self.collateral_wide().saturating_sub(self.total_at_risk_wide()))
    }

    pub(crate) fn fund(&mut self, amount: Amount) -> BookieResult<()> {
        if self.collateral_wide() + amount as u128 > Amount::MAX as u128 {
            return Err(BookieError::Overflow("game collateral"));
        }
        self.funded_collateral += amount;
        Ok(())
    }

    /// Computes the effect of a wager without committing anything
    ///
    /// Fails with `InsufficientEscrow` when the reservoir cannot cover the
    /// collateral the wager would be missing.
    pub fn quote_wager(
        &self,
        side: Side,
        stake: Amount,
        payout: Amount,
        reservoir_available: Amount,
    ) -> BookieResult<EscrowQuote> {
        let current = self.side(side);
        let next_side = SideBook {
            staked: current
                .staked
                .checked_add(stake)
                .ok_or(BookieError::Overflow("side stake"))?,
            payouts: current
                .payouts
                .checked_add(payout)
                .ok_or(BookieError::Overflow("side payouts"))?,
        };

        let at_risk = next_side
            .obligation()
            .max(self.side(side.opposite()).obligation());
        let collateral = self.collateral_wide() + stake as u128;
        let shortfall = at_risk.saturating_sub(collateral);

        if shortfall > reservoir_available as u128 {
            return Err(BookieError::InsufficientEscrow {
                shortfall: saturate(shortfall),
                available: reservoir_available,
            });
        }
        // shortfall <= reservoir_available, so it fits
        let shortfall = shortfall as Amount;

        if collateral + shortfall as u128 > Amount::MAX as u128 {
            return Err(BookieError::Overflow("game collateral"));
        }

        Ok(EscrowQuote {
            side,
            stake,
            payout,
            shortfall,
            next_side,
            next_drawn: self.reservoir_drawn + shortfall,
        })
    }

    /// Commits a quote, drawing its shortfall from the reservoir
    pub(crate) fn accept(&mut self, quote: EscrowQuote, reservoir: &mut Reservoir) -> BookieResult<()> {
        if quote.shortfall > 0 {
            reservoir.draw(quote.shortfall)?;
        }
        *self.side_mut(quote.side) = quote.next_side;
        self.reservoir_drawn = quote.next_drawn;
        debug_assert!(self.collateral_wide() >= self.total_at_risk_wide());
        Ok(())
    }

    /// Largest stake on `side` at `odds` that keeps spare escrow non-negative,
    /// counting what the reservoir could still contribute
    ///
    /// Only the chosen side's obligation grows, and the other side is already
    /// covered by current collateral, so the binding constraint is
    /// `payout(stake) <= collateral + reservoir - obligation(side)`.
    pub fn max_bet(&self, side: Side, odds: Odds, reservoir_available: Amount) -> Amount {
        let capacity = (self.collateral_wide() + reservoir_available as u128)
            .saturating_sub(self.side(side).obligation());
        payout::max_stake_for_payout(saturate(capacity), odds)
    }

    /// Total owed to bettors under `outcome`
    pub fn owed_to_bettors(&self, outcome: Outcome) -> Amount {
        let owed = match outcome.winning_side() {
            Some(side) => self.side(side).obligation(),
            None => self.home.staked as u128 + self.away.staked as u128,
        };
        saturate(owed)
    }

    /// Custody attributable to this game right now
    pub fn balance(&self) -> Amount {
        saturate(
            self.collateral_wide()
                .saturating_sub(self.paid_to_bettors as u128)
                .saturating_sub(self.returned_to_reservoir as u128)
                .saturating_sub(self.released_to_house as u128),
        )
    }

    /// Owed to bettors under `outcome` but not yet claimed
    pub fn outstanding(&self, outcome: Outcome) -> Amount {
        self.owed_to_bettors(outcome).saturating_sub(self.paid_to_bettors)
    }

    pub(crate) fn record_bettor_payment(&mut self, outcome: Outcome, amount: Amount) -> BookieResult<()> {
        if amount > self.outstanding(outcome) {
            return Err(BookieError::LedgerInvariant(format!(
                "payment of {} exceeds outstanding obligation {}",
                amount,
                self.outstanding(outcome)
            )));
        }
        self.paid_to_bettors += amount;
        Ok(())
    }

    /// Surplus that can leave the game without touching unclaimed winnings
    pub fn plan_house_release(&self, outcome: Outcome) -> BookieResult<HouseRelease> {
        let outstanding = self.outstanding(outcome);
        let balance = self.balance();
        let releasable = balance.checked_sub(outstanding).ok_or_else(|| {
            BookieError::LedgerInvariant(format!(
                "balance {} below outstanding winnings {}",
                balance, outstanding
            ))
        })?;
        let reservoir_due = self.reservoir_drawn - self.returned_to_reservoir;
        let to_reservoir = releasable.min(reservoir_due);
        Ok(HouseRelease {
            to_reservoir,
            to_house: releasable - to_reservoir,
        })
    }

    /// Reservoir share of the releasable surplus, with nothing for the house
    pub fn plan_reservoir_return(&self, outcome: Outcome) -> BookieResult<HouseRelease> {
        let release = self.plan_house_release(outcome)?;
        Ok(HouseRelease {
            to_reservoir: release.to_reservoir,
            to_house: 0,
        })
    }

    pub(crate) fn apply_house_release(
        &mut self,
        release: HouseRelease,
        reservoir: &mut Reservoir,
    ) -> BookieResult<()> {
        if release.to_reservoir > 0 {
            reservoir.restore(release.to_reservoir)?;
        }
        self.returned_to_reservoir += release.to_reservoir;
        self.released_to_house += release.to_house;
        Ok(())
    }
}
