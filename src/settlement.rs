//! Claim planning for settled games
//!
//! Planning is read-only: it walks a bettor's unclaimed wagers, prices each
//! one against its game's outcome and checks the per-game totals against the
//! escrow's outstanding obligation. The engine transfers the total and only
//! then commits the plan.

use crate::common::types::{AccountId, Amount, GameId, Outcome, WagerId};
use crate::errors::{BookieError, BookieResult};
use crate::events::WagerResult;
use crate::registry::GameRegistry;
use crate::wager_book::{Wager, WagerBook};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What one wager returns to its bettor under `outcome`
pub fn wager_return(wager: &Wager, outcome: Outcome) -> (WagerResult, Amount) {
    match outcome.winning_side() {
        // stake + payout never overflows: both were admitted into side totals
        Some(side) if side == wager.side => (WagerResult::Won, wager.stake + wager.payout),
        Some(_) => (WagerResult::Lost, 0),
        None => (WagerResult::Pushed, wager.stake),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLine {
    pub wager: WagerId,
    pub game: GameId,
    pub stake: Amount,
    pub result: WagerResult,
    pub amount: Amount,
}

/// Priced claims for one bettor, not yet committed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPlan {
    pub bettor: Option<AccountId>,
    pub lines: Vec<ClaimLine>,
    /// Unclaimed wagers left for later because their game is not settled
    pub skipped: usize,
    pub total: Amount,
    per_game: BTreeMap<GameId, (Outcome, Amount)>,
}

impl ClaimPlan {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Bettor payment per game, with the outcome it was priced under
    pub fn per_game(&self) -> impl Iterator<Item = (GameId, Outcome, Amount)> + '_ {
        self.per_game
            .iter()
            .map(|(game, (outcome, amount))| (*game, *outcome, *amount))
    }
}

pub fn plan_claims(
    registry: &GameRegistry,
    book: &WagerBook,
    bettor: &AccountId,
) -> BookieResult<ClaimPlan> {
    let mut plan = ClaimPlan {
        bettor: Some(bettor.clone()),
        ..Default::default()
    };

    for wager in book.unclaimed_of(bettor) {
        let game = registry.get(wager.game)?;
        let Some(outcome) = game.outcome() else {
            plan.skipped += 1;
            continue;
        };
        // the outcome is priced on the game's spread, which must be the one the wager took
        if wager.spread_at_placement != game.spread {
            return Err(BookieError::LedgerInvariant(format!(
                "{} placed at spread {} but {} settled at {}",
                wager.id, wager.spread_at_placement, game.id, game.spread
            )));
        }

        let (result, amount) = wager_return(wager, outcome);
        plan.total = plan
            .total
            .checked_add(amount)
            .ok_or(BookieError::Overflow("claim total"))?;
        let entry = plan.per_game.entry(wager.game).or_insert((outcome, 0));
        entry.1 += amount;
        plan.lines.push(ClaimLine {
            wager: wager.id,
            game: wager.game,
            stake: wager.stake,
            result,
            amount,
        });
    }

    for (game_id, (outcome, amount)) in &plan.per_game {
        let outstanding = registry.get(*game_id)?.escrow().outstanding(*outcome);
        if *amount > outstanding {
            return Err(BookieError::LedgerInvariant(format!(
                "claims of {} on {} exceed outstanding winnings {}",
                amount, game_id, outstanding
            )));
        }
    }

    Ok(plan)
}
