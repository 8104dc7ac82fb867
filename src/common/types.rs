//! Shared type definitions for the bookie engine
//!
//! Identifiers, the amount type and the side/outcome enums used by every
//! component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer value units moved through the value ledger
pub type Amount = u64;

/// Identity of a bettor or the administrator on the value ledger
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Index of a game in the registry (assigned sequentially, never reused)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

/// Index of a wager in the wager book
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WagerId(pub u64);

/// Identifier of the real-world sporting event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub u64);

/// Handle into the odds oracle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OddsRef(pub u64);

/// Handle into the score oracle's feed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreRef(pub u64);

macro_rules! display_id {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, "{}"), self.0)
                }
            }
        )*
    };
}

display_id!(
    GameId => "game#",
    WagerId => "wager#",
    ExternalId => "event#",
    OddsRef => "line#",
    ScoreRef => "feed#",
);

/// Side of the proposition a wager backs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    HomeOrUnder,
    AwayOrOver,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::HomeOrUnder => Side::AwayOrOver,
            Side::AwayOrOver => Side::HomeOrUnder,
        }
    }

    /// Maps the `true = home/under` flag used on the bettor surface
    pub fn from_home_flag(home: bool) -> Self {
        if home {
            Side::HomeOrUnder
        } else {
            Side::AwayOrOver
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::HomeOrUnder => write!(f, "home/under"),
            Side::AwayOrOver => write!(f, "away/over"),
        }
    }
}

/// Settled result of a game against the spread
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Away,
    Push,
}

impl Outcome {
    /// Winning side, `None` on a push
    pub fn winning_side(self) -> Option<Side> {
        match self {
            Outcome::Home => Some(Side::HomeOrUnder),
            Outcome::Away => Some(Side::AwayOrOver),
            Outcome::Push => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => write!(f, "home"),
            Outcome::Away => write!(f, "away"),
            Outcome::Push => write!(f, "push"),
        }
    }
}

/// Score reported by the score oracle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FinalScore {
    pub home: u32,
    pub away: u32,
    pub finalized: bool,
}

impl FinalScore {
    pub fn final_result(home: u32, away: u32) -> Self {
        Self {
            home,
            away,
            finalized: true,
        }
    }
}
