//! Error types for the bookie escrow engine
//!
//! Every failure names the invariant it protects. `BookieError::kind` folds the
//! variants into the coarse taxonomy callers branch on.

use crate::common::types::{AccountId, Amount, ExternalId, GameId, WagerId};
use std::fmt;

/// Coarse failure classes surfaced to bettors and the administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A wager or reservoir draw would breach the solvency invariant
    InsufficientEscrow,
    /// The operation is not allowed in the game's current lifecycle state
    InvalidState,
    /// Administrator-only operation without a valid capability
    Unauthorized,
    /// Odds or amounts outside the supported range, or arithmetic overflow
    ArithmeticBounds,
    /// A collaborator (value ledger, oracle, config, storage) failed
    External,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InsufficientEscrow => write!(f, "insufficient-escrow"),
            ErrorKind::InvalidState => write!(f, "invalid-state"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::ArithmeticBounds => write!(f, "arithmetic-bounds"),
            ErrorKind::External => write!(f, "external"),
        }
    }
}

/// Root error type for all engine operations
#[derive(Debug, thiserror::Error)]
pub enum BookieError {
    #[error("not sufficient escrow: wager needs {shortfall} more collateral, reservoir holds {available}")]
    InsufficientEscrow { shortfall: Amount, available: Amount },

    #[error("not sufficient escrow: reservoir holds {available}, draw of {requested} refused")]
    ReservoirExhausted { requested: Amount, available: Amount },

    #[error("unknown game {0}")]
    UnknownGame(GameId),

    #[error("unknown wager {0}")]
    UnknownWager(WagerId),

    #[error("external event {external_id} already has active game {game}")]
    DuplicateGame { external_id: ExternalId, game: GameId },

    #[error("wagers are closed on game {0}")]
    WagersClosed(GameId),

    #[error("game {0} is already settled")]
    GameSettled(GameId),

    #[error("score for external event {0} is not final")]
    ScoreNotFinal(ExternalId),

    #[error("no odds line posted for game {0}")]
    NoOddsLine(GameId),

    #[error("offered odds {offered} do not match posted line {posted}")]
    OddsMismatch { offered: i32, posted: i32 },

    #[error("wager {0} was already claimed")]
    AlreadyClaimed(WagerId),

    #[error("{0} is not the administrator")]
    NotAdministrator(AccountId),

    #[error("admin capability belongs to a different engine")]
    ForeignCapability,

    #[error("odds {odds} outside supported range (|odds| must be within {min}..={max})")]
    OddsOutOfRange { odds: i32, min: u32, max: u32 },

    #[error("stake {stake} below minimum {min}")]
    StakeTooSmall { stake: Amount, min: Amount },

    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    #[error("ledger invariant violated: {0}")]
    LedgerInvariant(String),

    #[error("value ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("oracle error: {0}")]
    Oracle(String),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("engine service stopped")]
    ServiceStopped,
}

impl BookieError {
    /// Taxonomy class for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookieError::InsufficientEscrow { .. } | BookieError::ReservoirExhausted { .. } => {
                ErrorKind::InsufficientEscrow
            }
            BookieError::UnknownGame(_)
            | BookieError::UnknownWager(_)
            | BookieError::DuplicateGame { .. }
            | BookieError::WagersClosed(_)
            | BookieError::GameSettled(_)
            | BookieError::ScoreNotFinal(_)
            | BookieError::NoOddsLine(_)
            | BookieError::OddsMismatch { .. }
            | BookieError::AlreadyClaimed(_) => ErrorKind::InvalidState,
            BookieError::NotAdministrator(_) | BookieError::ForeignCapability => {
                ErrorKind::Unauthorized
            }
            BookieError::OddsOutOfRange { .. }
            | BookieError::StakeTooSmall { .. }
            | BookieError::Overflow(_)
            | BookieError::LedgerInvariant(_) => ErrorKind::ArithmeticBounds,
            BookieError::Ledger(_)
            | BookieError::Oracle(_)
            | BookieError::Configuration(_)
            | BookieError::Storage(_)
            | BookieError::ServiceStopped => ErrorKind::External,
        }
    }
}

/// Failures reported by the external value ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("account {account} holds {available}, needs {needed}")]
    InsufficientBalance {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },

    #[error("custody holds {available}, cannot release {needed}")]
    InsufficientCustody { needed: Amount, available: Amount },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Snapshot storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::ReadFailed(e.to_string()),
            _ => StorageError::WriteFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::CorruptedData(e.to_string())
    }
}

// Convenience type alias for Results
pub type BookieResult<T> = Result<T, BookieError>;
