//! Outbox consumers: wager receipts and reward points
//!
//! Neither is consulted for settlement. They only react to committed events.

use crate::common::traits::EventConsumer;
use crate::common::types::{AccountId, Amount, GameId, Side, WagerId};
use crate::events::BookEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collectible receipt minted for one wager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub serial: u64,
    pub wager: WagerId,
    pub game: GameId,
    pub side: Side,
    pub stake: Amount,
}

/// Mints one receipt per placed wager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptIssuer {
    next_serial: u64,
    receipts: BTreeMap<AccountId, Vec<Receipt>>,
}

impl ReceiptIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receipts_of(&self, account: &AccountId) -> &[Receipt] {
        self.receipts.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn issued(&self) -> u64 {
        self.next_serial
    }
}

impl EventConsumer for ReceiptIssuer {
    fn name(&self) -> &str {
        "receipt-issuer"
    }

    fn handle(&mut self, event: &BookEvent) -> Result<(), String> {
        if let BookEvent::WagerPlaced {
            wager,
            game,
            bettor,
            side,
            stake,
            ..
        } = event
        {
            let owned = self.receipts.entry(bettor.clone()).or_default();
            if owned.iter().any(|r| r.wager == *wager) {
                return Err(format!("receipt for {} already minted", wager));
            }
            owned.push(Receipt {
                serial: self.next_serial,
                wager: *wager,
                game: *game,
                side: *side,
                stake: *stake,
            });
            self.next_serial += 1;
        }
        Ok(())
    }
}

/// Credits reward points on claimed wagers, proportional to stake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsMinter {
    basis_points: u32,
    points: BTreeMap<AccountId, Amount>,
}

impl RewardsMinter {
    pub fn new(basis_points: u32) -> Self {
        Self {
            basis_points,
            points: BTreeMap::new(),
        }
    }

    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    /// Rate for claims handled from now on; points already credited stay
    pub fn set_basis_points(&mut self, basis_points: u32) {
        self.basis_points = basis_points;
    }

    pub fn points_of(&self, account: &AccountId) -> Amount {
        self.points.get(account).copied().unwrap_or(0)
    }

    fn reward_for(&self, stake: Amount) -> Amount {
        // bps <= 10_000 keeps the quotient within stake
        (stake as u128 * self.basis_points as u128 / 10_000) as Amount
    }
}

impl EventConsumer for RewardsMinter {
    fn name(&self) -> &str {
        "rewards-minter"
    }

    fn handle(&mut self, event: &BookEvent) -> Result<(), String> {
        if let BookEvent::WagerClaimed { bettor, stake, .. } = event {
            let reward = self.reward_for(*stake);
            if reward == 0 {
                return Ok(());
            }
            let balance = self.points.entry(bettor.clone()).or_default();
            *balance = balance
                .checked_add(reward)
                .ok_or_else(|| format!("reward points overflow for {}", bettor))?;
        }
        Ok(())
    }
}
