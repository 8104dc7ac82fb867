//! Committed-event outbox
//!
//! The engine appends one event per committed transition. Receipt issuance
//! and reward minting consume the outbox afterwards, so their failures can
//! never roll back or corrupt ledger state.

use crate::common::traits::EventConsumer;
use crate::common::types::{AccountId, Amount, ExternalId, FinalScore, GameId, Outcome, Side, WagerId};
use crate::escrow::HouseRelease;
use crate::payout::Odds;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

/// How a claimed wager resolved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WagerResult {
    Won,
    Pushed,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookEvent {
    GameCreated {
        game: GameId,
        external_id: ExternalId,
        spread: i32,
        label: String,
    },
    WagersToggled {
        game: GameId,
        open: bool,
    },
    VaultFunded {
        game: GameId,
        amount: Amount,
        funded_collateral: Amount,
    },
    ReservoirFunded {
        amount: Amount,
        funds: Amount,
    },
    WagerPlaced {
        wager: WagerId,
        game: GameId,
        bettor: AccountId,
        side: Side,
        stake: Amount,
        odds: Odds,
        reservoir_draw: Amount,
    },
    GameSettled {
        game: GameId,
        outcome: Outcome,
        score: FinalScore,
    },
    ReservoirReclaimed {
        game: GameId,
        amount: Amount,
        funds: Amount,
    },
    WagerClaimed {
        wager: WagerId,
        game: GameId,
        bettor: AccountId,
        stake: Amount,
        result: WagerResult,
        amount: Amount,
    },
    HouseReleased {
        game: GameId,
        release: HouseRelease,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequencedEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: BookEvent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outbox {
    next_seq: u64,
    pending: VecDeque<SequencedEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: BookEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push_back(SequencedEvent { seq, event });
        seq
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<SequencedEvent> {
        self.pending.drain(..).collect()
    }

    /// Drains the outbox into every consumer; returns how many handler calls failed
    pub fn dispatch(&mut self, consumers: &mut [&mut dyn EventConsumer]) -> usize {
        deliver(&self.drain(), consumers)
    }
}

/// Hands already drained events to every consumer in sequence order
pub fn deliver(events: &[SequencedEvent], consumers: &mut [&mut dyn EventConsumer]) -> usize {
    let mut failures = 0;
    for entry in events {
        for consumer in consumers.iter_mut() {
            if let Err(e) = consumer.handle(&entry.event) {
                failures += 1;
                warn!(
                    consumer = consumer.name(),
                    seq = entry.seq,
                    error = %e,
                    "Event consumer failed; ledger state unaffected"
                );
            }
        }
    }
    failures
}
