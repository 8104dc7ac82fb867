//! In-memory collaborators
//!
//! A value ledger and both oracles backed by plain maps. The CLI persists
//! them inside its snapshot; tests use them directly.

use crate::common::traits::{OddsLine, OddsOracle, ScoreOracle, ValueLedger};
use crate::common::types::{AccountId, Amount, ExternalId, FinalScore, OddsRef};
use crate::errors::{BookieResult, LedgerError};
use crate::payout::Odds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Account balances plus a single custody account owned by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: BTreeMap<AccountId, Amount>,
    custody: Amount,
    #[serde(default)]
    frozen: BTreeSet<AccountId>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates value out of thin air for `account`
    pub fn mint(&mut self, account: &AccountId, amount: Amount) -> Result<Amount, LedgerError> {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected(format!("mint overflows {}", account)))?;
        Ok(*balance)
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Makes every transfer touching `account` fail
    pub fn freeze(&mut self, account: &AccountId) {
        self.frozen.insert(account.clone());
    }

    pub fn unfreeze(&mut self, account: &AccountId) {
        self.frozen.remove(account);
    }

    fn check_frozen(&self, account: &AccountId) -> Result<(), LedgerError> {
        if self.frozen.contains(account) {
            return Err(LedgerError::Rejected(format!("account {} is frozen", account)));
        }
        Ok(())
    }
}

impl ValueLedger for MemoryLedger {
    fn transfer_in(&mut self, from: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.check_frozen(from)?;
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected("custody overflow".to_string()))?;

        self.balances.insert(from.clone(), available - amount);
        self.custody = custody;
        Ok(())
    }

    fn transfer_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.check_frozen(to)?;
        if self.custody < amount {
            return Err(LedgerError::InsufficientCustody {
                needed: amount,
                available: self.custody,
            });
        }
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected(format!("balance overflow for {}", to)))?;

        self.custody -= amount;
        self.balances.insert(to.clone(), balance);
        Ok(())
    }

    fn custody_balance(&self) -> Amount {
        self.custody
    }
}

/// Posted odds lines keyed by odds reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineBoard {
    lines: BTreeMap<OddsRef, OddsLine>,
}

impl LineBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts or replaces a line; placed wagers keep their own snapshot
    pub fn post(&mut self, odds_ref: OddsRef, home: i32, away: i32) -> BookieResult<OddsLine> {
        let line = OddsLine {
            home: Odds::new(home)?,
            away: Odds::new(away)?,
        };
        self.lines.insert(odds_ref, line);
        Ok(line)
    }
}

impl OddsOracle for LineBoard {
    fn line_for(&self, odds_ref: OddsRef) -> Result<Option<OddsLine>, String> {
        Ok(self.lines.get(&odds_ref).copied())
    }
}

/// Reported scores keyed by external event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBoard {
    scores: BTreeMap<ExternalId, FinalScore>,
    #[serde(default)]
    offline: bool,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, event: ExternalId, score: FinalScore) {
        self.scores.insert(event, score);
    }

    /// Simulates an unreachable feed
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }
}

impl ScoreOracle for ScoreBoard {
    fn final_score(&self, event: ExternalId) -> Result<Option<FinalScore>, String> {
        if self.offline {
            return Err("score feed offline".to_string());
        }
        Ok(self.scores.get(&event).copied())
    }
}
