//! Append-only wager book
//!
//! Each wager snapshots its odds, spread and locked payout at placement and
//! never changes again except for the one-way `claimed` flag.

use crate::common::types::{AccountId, Amount, GameId, Side, WagerId};
use crate::errors::{BookieError, BookieResult};
use crate::payout::Odds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wager {
    pub id: WagerId,
    pub game: GameId,
    pub bettor: AccountId,
    pub stake: Amount,
    pub side: Side,
    pub odds: Odds,
    pub spread_at_placement: i32,
    /// Winnings owed if `side` wins, fixed at placement
    pub payout: Amount,
    claimed: bool,
}

impl Wager {
    pub fn claimed(&self) -> bool {
        self.claimed
    }
}

/// Fields of a wager about to be recorded
#[derive(Debug, Clone)]
pub struct WagerTicket {
    pub game: GameId,
    pub bettor: AccountId,
    pub stake: Amount,
    pub side: Side,
    pub odds: Odds,
    pub spread_at_placement: i32,
    pub payout: Amount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WagerBook {
    wagers: Vec<Wager>,
    by_bettor: BTreeMap<AccountId, Vec<WagerId>>,
}

impl WagerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.wagers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wagers.is_empty()
    }

    pub fn get(&self, id: WagerId) -> BookieResult<&Wager> {
        self.wagers
            .get(id.0 as usize)
            .ok_or(BookieError::UnknownWager(id))
    }

    pub(crate) fn record(&mut self, ticket: WagerTicket) -> WagerId {
        let id = WagerId(self.wagers.len() as u64);
        self.by_bettor
            .entry(ticket.bettor.clone())
            .or_default()
            .push(id);
        self.wagers.push(Wager {
            id,
            game: ticket.game,
            bettor: ticket.bettor,
            stake: ticket.stake,
            side: ticket.side,
            odds: ticket.odds,
            spread_at_placement: ticket.spread_at_placement,
            payout: ticket.payout,
            claimed: false,
        });
        id
    }

    /// All wagers placed by `bettor`, oldest first
    pub fn wagers_of<'a>(&'a self, bettor: &AccountId) -> impl Iterator<Item = &'a Wager> + 'a {
        self.by_bettor
            .get(bettor)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.wagers.get(id.0 as usize))
    }

    pub fn unclaimed_of<'a>(&'a self, bettor: &AccountId) -> impl Iterator<Item = &'a Wager> + 'a {
        self.wagers_of(bettor).filter(|w| !w.claimed)
    }

    pub fn wagers_on(&self, game: GameId) -> impl Iterator<Item = &Wager> {
        self.wagers.iter().filter(move |w| w.game == game)
    }

    pub(crate) fn mark_claimed(&mut self, id: WagerId) -> BookieResult<()> {
        let wager = self
            .wagers
            .get_mut(id.0 as usize)
            .ok_or(BookieError::UnknownWager(id))?;
        if wager.claimed {
            return Err(BookieError::AlreadyClaimed(id));
        }
        wager.claimed = true;
        Ok(())
    }
}
