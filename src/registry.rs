//! Game registry and lifecycle
//!
//! Games are created once per external event, toggled between open and
//! closed by the administrator, and settled from the score oracle's final
//! result. Settled games stay queryable forever.

use crate::common::types::{ExternalId, FinalScore, GameId, OddsRef, Outcome, ScoreRef};
use crate::errors::{BookieError, BookieResult};
use crate::escrow::{GameEscrow, TotalWagers};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spreads are quoted in tenths of a point (`-75` is -7.5)
pub const SPREAD_SCALE: i64 = 10;

/// Lifecycle state of a game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Created, never opened for wagering
    Created,
    WagersOpen,
    WagersClosed,
    Settled,
}

/// Parameters for a new game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGame {
    pub external_id: ExternalId,
    pub odds_ref: OddsRef,
    pub score_ref: ScoreRef,
    pub spread: i32,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub external_id: ExternalId,
    pub odds_ref: OddsRef,
    pub score_ref: ScoreRef,
    pub spread: i32,
    pub label: String,
    state: GameState,
    outcome: Option<Outcome>,
    final_score: Option<FinalScore>,
    pub(crate) escrow: GameEscrow,
}

impl Game {
    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn wagers_open(&self) -> bool {
        self.state == GameState::WagersOpen
    }

    pub fn is_settled(&self) -> bool {
        self.state == GameState::Settled
    }

    /// Winning side, set once the game settles
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn final_score(&self) -> Option<FinalScore> {
        self.final_score
    }

    pub fn escrow(&self) -> &GameEscrow {
        &self.escrow
    }

    pub fn total_wagers(&self) -> TotalWagers {
        self.escrow.total_wagers()
    }
}

/// Point-spread settlement: the spread is added to the home score
pub fn outcome_against_spread(score: &FinalScore, spread: i32) -> Outcome {
    let home = score.home as i64 * SPREAD_SCALE + spread as i64;
    let away = score.away as i64 * SPREAD_SCALE;
    match home.cmp(&away) {
        std::cmp::Ordering::Greater => Outcome::Home,
        std::cmp::Ordering::Less => Outcome::Away,
        std::cmp::Ordering::Equal => Outcome::Push,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameRegistry {
    games: Vec<Game>,
    /// Unsettled game per external event
    active: BTreeMap<ExternalId, GameId>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn get(&self, id: GameId) -> BookieResult<&Game> {
        self.games
            .get(id.0 as usize)
            .ok_or(BookieError::UnknownGame(id))
    }

    pub(crate) fn get_mut(&mut self, id: GameId) -> BookieResult<&mut Game> {
        self.games
            .get_mut(id.0 as usize)
            .ok_or(BookieError::UnknownGame(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Game> {
        self.games.iter()
    }

    pub fn active_game_for(&self, external_id: ExternalId) -> Option<GameId> {
        self.active.get(&external_id).copied()
    }

    pub(crate) fn create(&mut self, params: NewGame) -> BookieResult<GameId> {
        if let Some(game) = self.active.get(&params.external_id) {
            return Err(BookieError::DuplicateGame {
                external_id: params.external_id,
                game: *game,
            });
        }

        let id = GameId(self.games.len() as u64);
        self.active.insert(params.external_id, id);
        self.games.push(Game {
            id,
            external_id: params.external_id,
            odds_ref: params.odds_ref,
            score_ref: params.score_ref,
            spread: params.spread,
            label: params.label,
            state: GameState::Created,
            outcome: None,
            final_score: None,
            escrow: GameEscrow::new(),
        });
        Ok(id)
    }

    /// Opens or closes wagering; returns whether the state changed
    pub(crate) fn set_wagers_open(&mut self, id: GameId, open: bool) -> BookieResult<bool> {
        let game = self.get_mut(id)?;
        let next = match (game.state, open) {
            (GameState::Settled, _) => return Err(BookieError::GameSettled(id)),
            (GameState::WagersOpen, true) => return Ok(false),
            (GameState::Created | GameState::WagersClosed, false) => return Ok(false),
            (_, true) => GameState::WagersOpen,
            (_, false) => GameState::WagersClosed,
        };
        game.state = next;
        Ok(true)
    }

    /// Records the final result; a settled game is left as is
    pub(crate) fn settle(&mut self, id: GameId, score: FinalScore) -> BookieResult<Outcome> {
        let game = self.get_mut(id)?;
        if let Some(outcome) = game.outcome {
            return Ok(outcome);
        }
        if !score.finalized {
            return Err(BookieError::ScoreNotFinal(game.external_id));
        }

        let outcome = outcome_against_spread(&score, game.spread);
        game.state = GameState::Settled;
        game.outcome = Some(outcome);
        game.final_score = Some(score);
        let external_id = game.external_id;
        self.active.remove(&external_id);
        Ok(outcome)
    }
}
