//! Bookie - Fixed-Odds Wagering Escrow Engine
//!
//! Two-sided, fixed-odds sports-wagering escrow and settlement. Every
//! accepted wager is fully collateralized at acceptance time, either by
//! administrator funding, by the stakes already in the book, or by a draw on
//! the shared reservoir. Games settle from the score oracle's final result,
//! and each wager can be claimed exactly once.
//!
//! The engine is synchronous; `service` wraps it in a tokio task when
//! submissions arrive from many actors at once.

pub mod admin;
pub mod common;
pub mod config;
pub mod consumers;
pub mod engine;
pub mod errors;
pub mod escrow;
pub mod events;
pub mod memory;
pub mod payout;
pub mod registry;
pub mod reservoir;
pub mod service;
pub mod settlement;
pub mod storage;
pub mod wager_book;

pub use admin::AdminCap;
pub use common::traits::{EventConsumer, OddsLine, OddsOracle, ScoreOracle, ValueLedger};
pub use common::types::{
    AccountId, Amount, ExternalId, FinalScore, GameId, OddsRef, Outcome, ScoreRef, Side, WagerId,
};
pub use config::BookieConfig;
pub use engine::{BookState, Bookie};
pub use errors::{BookieError, BookieResult, ErrorKind};
pub use events::{BookEvent, WagerResult};
pub use payout::{inverse_payout, payout, Odds};
pub use registry::{GameState, NewGame};
pub use service::{BookHandle, BookService};
