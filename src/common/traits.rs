//! Interfaces to the collaborators the engine depends on
//!
//! The value ledger, the two oracles and the outbox consumers live outside
//! the escrow core. The engine only sees these traits.

use crate::common::types::{AccountId, Amount, ExternalId, FinalScore, OddsRef};
use crate::errors::LedgerError;
use crate::events::BookEvent;
use crate::payout::Odds;
use serde::{Deserialize, Serialize};

/// Fungible-value ledger that moves stake into and payouts out of custody
///
/// Transfers are exact and atomic: an `Err` means nothing moved.
pub trait ValueLedger {
    /// Debit `from` and credit the engine's custody account
    fn transfer_in(&mut self, from: &AccountId, amount: Amount) -> Result<(), LedgerError>;

    /// Debit custody and credit `to`
    fn transfer_out(&mut self, to: &AccountId, amount: Amount) -> Result<(), LedgerError>;

    /// Value currently held in custody
    fn custody_balance(&self) -> Amount;
}

/// Final-score reporting authority
pub trait ScoreOracle {
    /// Latest score for the event, `None` if the oracle knows nothing about it
    fn final_score(&self, event: ExternalId) -> Result<Option<FinalScore>, String>;
}

/// Posted odds for both sides of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsLine {
    pub home: Odds,
    pub away: Odds,
}

/// Pre-game odds-line authority
pub trait OddsOracle {
    fn line_for(&self, odds_ref: OddsRef) -> Result<Option<OddsLine>, String>;
}

/// Downstream consumer of committed engine events (receipts, rewards)
///
/// Failures are reported back to the dispatcher for logging only.
pub trait EventConsumer {
    fn name(&self) -> &str;

    fn handle(&mut self, event: &BookEvent) -> Result<(), String>;
}
