//! Escrow and settlement engine
//!
//! `Bookie` owns the game registry, the wager book, the reservoir and the
//! outbox, and talks to the value ledger and both oracles through traits.
//! Every mutating operation follows the same shape: plan against current
//! state, move value on the ledger, then commit. A failure before the commit
//! leaves the engine untouched, and nothing after the ledger call can fail.

use crate::admin::AdminCap;
use crate::common::traits::{EventConsumer, OddsLine, OddsOracle, ScoreOracle, ValueLedger};
use crate::common::types::{AccountId, Amount, GameId, Outcome, Side, WagerId};
use crate::config::{BookieConfig, EngineConfig};
use crate::errors::{BookieError, BookieResult};
use crate::escrow::{HouseRelease, TotalWagers};
use crate::events::{BookEvent, Outbox, SequencedEvent};
use crate::payout::{self, Odds};
use crate::registry::{self, Game, GameRegistry, NewGame};
use crate::reservoir::Reservoir;
use crate::settlement::{self, ClaimPlan};
use crate::wager_book::{Wager, WagerBook, WagerTicket};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Serializable engine state, everything except the collaborators
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookState {
    pub registry: GameRegistry,
    pub wagers: WagerBook,
    pub reservoir: Reservoir,
    pub outbox: Outbox,
}

pub struct Bookie<L, S, O> {
    id: u64,
    administrator: AccountId,
    config: EngineConfig,
    state: BookState,
    ledger: L,
    scores: S,
    lines: O,
}

impl<L, S, O> Bookie<L, S, O>
where
    L: ValueLedger,
    S: ScoreOracle,
    O: OddsOracle,
{
    pub fn new(config: &BookieConfig, ledger: L, scores: S, lines: O) -> BookieResult<Self> {
        Self::with_state(config, BookState::default(), ledger, scores, lines)
    }

    /// Resumes an engine from a previously saved state
    pub fn with_state(
        config: &BookieConfig,
        state: BookState,
        ledger: L,
        scores: S,
        lines: O,
    ) -> BookieResult<Self> {
        config.validate()?;
        let id = rand::random::<u64>();
        tracing::debug!(
            engine = id,
            administrator = %config.engine.administrator,
            games = state.registry.len(),
            wagers = state.wagers.len(),
            "Bookie engine ready"
        );
        Ok(Self {
            id,
            administrator: AccountId::new(config.engine.administrator.clone()),
            config: config.engine.clone(),
            state,
            ledger,
            scores,
            lines,
        })
    }

    pub fn into_parts(self) -> (BookState, L, S, O) {
        (self.state, self.ledger, self.scores, self.lines)
    }

    pub fn state(&self) -> &BookState {
        &self.state
    }

    pub fn administrator(&self) -> &AccountId {
        &self.administrator
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn scores(&self) -> &S {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut S {
        &mut self.scores
    }

    pub fn lines(&self) -> &O {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut O {
        &mut self.lines
    }

    // ----- authorization -----

    /// Mints an admin capability for `caller` if it is the administrator
    pub fn authorize(&self, caller: &AccountId) -> BookieResult<AdminCap> {
        if *caller != self.administrator {
            tracing::warn!(caller = %caller, "Rejected admin authorization");
            return Err(BookieError::NotAdministrator(caller.clone()));
        }
        Ok(AdminCap::mint(self.id, caller.clone()))
    }

    fn check_cap(&self, cap: &AdminCap) -> BookieResult<()> {
        cap.check(self.id).inspect_err(|_| {
            tracing::warn!(holder = %cap.account(), "Rejected foreign admin capability");
        })
    }

    // ----- administrator surface -----

    pub fn make_game(&mut self, cap: &AdminCap, params: NewGame) -> BookieResult<GameId> {
        self.check_cap(cap)?;
        let (external_id, spread, label) = (params.external_id, params.spread, params.label.clone());
        let id = self.state.registry.create(params).inspect_err(|e| {
            tracing::warn!(error = %e, "Game creation rejected");
        })?;
        self.state.outbox.push(BookEvent::GameCreated {
            game: id,
            external_id,
            spread,
            label,
        });
        tracing::info!(game = %id, external_id = %external_id, spread, "Game created");
        Ok(id)
    }

    pub fn toggle_wagers(&mut self, cap: &AdminCap, game: GameId, open: bool) -> BookieResult<()> {
        self.check_cap(cap)?;
        if self.state.registry.set_wagers_open(game, open)? {
            self.state.outbox.push(BookEvent::WagersToggled { game, open });
            tracing::info!(game = %game, open, "Wagering toggled");
        } else {
            tracing::debug!(game = %game, open, "Wagering already in requested state");
        }
        Ok(())
    }

    /// Deposits administrator collateral dedicated to one game
    pub fn fund_vault(&mut self, cap: &AdminCap, game: GameId, amount: Amount) -> BookieResult<()> {
        self.check_cap(cap)?;
        let current = self.state.registry.get(game)?;
        if current.is_settled() {
            return Err(BookieError::GameSettled(game));
        }
        let mut next = current.escrow().clone();
        next.fund(amount)?;

        self.ledger.transfer_in(&self.administrator, amount)?;

        let funded_collateral = next.funded_collateral();
        self.state.registry.get_mut(game)?.escrow = next;
        self.state.outbox.push(BookEvent::VaultFunded {
            game,
            amount,
            funded_collateral,
        });
        tracing::info!(game = %game, amount, funded_collateral, "Game vault funded");
        Ok(())
    }

    pub fn fund_reservoir(&mut self, cap: &AdminCap, amount: Amount) -> BookieResult<()> {
        self.check_cap(cap)?;
        let mut next = self.state.reservoir.clone();
        let funds = next.fund(amount)?;

        self.ledger.transfer_in(&self.administrator, amount)?;

        self.state.reservoir = next;
        self.state.outbox.push(BookEvent::ReservoirFunded { amount, funds });
        tracing::info!(amount, funds, "Reservoir funded");
        Ok(())
    }

    /// Releases a settled game's surplus to the administrator
    ///
    /// Finalization has already returned what the game drew from the
    /// reservoir, so the release normally goes to the house alone. Unclaimed
    /// winnings stay in the game.
    pub fn claim_lost_wagers(&mut self, cap: &AdminCap, game: GameId) -> BookieResult<HouseRelease> {
        self.check_cap(cap)?;
        let outcome = self.finalize_game(game)?;
        let release = self.state.registry.get(game)?.escrow().plan_house_release(outcome)?;
        if release.is_empty() {
            tracing::debug!(game = %game, "Nothing left to release");
            return Ok(release);
        }

        if release.to_house > 0 {
            self.ledger.transfer_out(&self.administrator, release.to_house)?;
        }

        let escrow = &mut self.state.registry.get_mut(game)?.escrow;
        escrow.apply_house_release(release, &mut self.state.reservoir)?;
        self.state.outbox.push(BookEvent::HouseReleased { game, release });
        tracing::info!(
            game = %game,
            to_reservoir = release.to_reservoir,
            to_house = release.to_house,
            "Released settled game surplus"
        );
        Ok(release)
    }

    // ----- settlement -----

    /// Settles a game from the score oracle; a settled game returns its
    /// recorded outcome without consulting the oracle again
    ///
    /// Reservoir draws the outcome leaves uncommitted go back to the
    /// reservoir as part of the settlement.
    pub fn finalize_game(&mut self, game: GameId) -> BookieResult<Outcome> {
        let current = self.state.registry.get(game)?;
        if let Some(outcome) = current.outcome() {
            return Ok(outcome);
        }
        let external_id = current.external_id;

        let score = self
            .scores
            .final_score(external_id)
            .map_err(BookieError::Oracle)?
            .filter(|score| score.finalized)
            .ok_or(BookieError::ScoreNotFinal(external_id))?;

        let expected = registry::outcome_against_spread(&score, current.spread);
        let reclaim = current.escrow().plan_reservoir_return(expected)?;

        let outcome = self.state.registry.settle(game, score)?;
        let escrow = &mut self.state.registry.get_mut(game)?.escrow;
        escrow.apply_house_release(reclaim, &mut self.state.reservoir)?;

        self.state.outbox.push(BookEvent::GameSettled { game, outcome, score });
        tracing::info!(
            game = %game,
            home = score.home,
            away = score.away,
            outcome = %outcome,
            "Game settled"
        );
        if !reclaim.is_empty() {
            let funds = self.state.reservoir.funds();
            self.state.outbox.push(BookEvent::ReservoirReclaimed {
                game,
                amount: reclaim.to_reservoir,
                funds,
            });
            tracing::info!(
                game = %game,
                amount = reclaim.to_reservoir,
                funds,
                "Reservoir draw returned on settlement"
            );
        }
        Ok(outcome)
    }

    /// Pays every unclaimed wager of `bettor` on a settled game
    ///
    /// Games whose final score is available are settled on the way. Wagers on
    /// games still in play are left for a later call.
    pub fn claim_wagers(&mut self, bettor: &AccountId) -> BookieResult<ClaimPlan> {
        let pending: BTreeSet<GameId> = self
            .state
            .wagers
            .unclaimed_of(bettor)
            .map(|w| w.game)
            .collect();
        for game in pending {
            if self.state.registry.get(game)?.is_settled() {
                continue;
            }
            match self.finalize_game(game) {
                Ok(_) => {}
                Err(BookieError::ScoreNotFinal(_)) => {
                    tracing::debug!(game = %game, "Game not final, claims deferred");
                }
                Err(e) => {
                    tracing::warn!(game = %game, error = %e, "Could not settle game during claim");
                }
            }
        }

        let plan = settlement::plan_claims(&self.state.registry, &self.state.wagers, bettor)?;
        if plan.is_empty() {
            tracing::debug!(bettor = %bettor, skipped = plan.skipped, "No claimable wagers");
            return Ok(plan);
        }

        if plan.total > 0 {
            self.ledger.transfer_out(bettor, plan.total)?;
        }

        for (game, outcome, amount) in plan.per_game() {
            self.state
                .registry
                .get_mut(game)?
                .escrow
                .record_bettor_payment(outcome, amount)?;
        }
        for line in &plan.lines {
            self.state.wagers.mark_claimed(line.wager)?;
            self.state.outbox.push(BookEvent::WagerClaimed {
                wager: line.wager,
                game: line.game,
                bettor: bettor.clone(),
                stake: line.stake,
                result: line.result,
                amount: line.amount,
            });
        }
        tracing::info!(
            bettor = %bettor,
            wagers = plan.lines.len(),
            amount = plan.total,
            skipped = plan.skipped,
            "Wagers claimed"
        );
        Ok(plan)
    }

    // ----- bettor surface -----

    /// Places a wager at `odds`, or at the posted line when `odds` is `None`
    pub fn make_wager(
        &mut self,
        bettor: &AccountId,
        game: GameId,
        stake: Amount,
        side: Side,
        odds: Option<i32>,
    ) -> BookieResult<WagerId> {
        let current = self.state.registry.get(game)?;
        if current.is_settled() {
            return Err(BookieError::GameSettled(game));
        }
        if !current.wagers_open() {
            return Err(BookieError::WagersClosed(game));
        }
        if stake < self.config.min_stake {
            return Err(BookieError::StakeTooSmall {
                stake,
                min: self.config.min_stake,
            });
        }

        let odds = self.resolve_odds(current, side, odds)?;
        let payout = payout::payout(stake, odds)?;
        let spread_at_placement = current.spread;
        let quote = current
            .escrow()
            .quote_wager(side, stake, payout, self.state.reservoir.funds())
            .inspect_err(|e| {
                tracing::warn!(
                    game = %game,
                    bettor = %bettor,
                    stake,
                    odds = %odds,
                    error = %e,
                    "Wager rejected"
                );
            })?;

        self.ledger.transfer_in(bettor, stake)?;

        let escrow = &mut self.state.registry.get_mut(game)?.escrow;
        escrow.accept(quote, &mut self.state.reservoir)?;
        let wager = self.state.wagers.record(WagerTicket {
            game,
            bettor: bettor.clone(),
            stake,
            side,
            odds,
            spread_at_placement,
            payout,
        });
        self.state.outbox.push(BookEvent::WagerPlaced {
            wager,
            game,
            bettor: bettor.clone(),
            side,
            stake,
            odds,
            reservoir_draw: quote.shortfall,
        });
        tracing::info!(
            wager = %wager,
            game = %game,
            bettor = %bettor,
            side = %side,
            amount = stake,
            odds = %odds,
            shortfall = quote.shortfall,
            "Wager accepted"
        );
        Ok(wager)
    }

    fn resolve_odds(&self, game: &Game, side: Side, offered: Option<i32>) -> BookieResult<Odds> {
        let posted = self
            .lines
            .line_for(game.odds_ref)
            .map_err(BookieError::Oracle)?
            .map(|line| posted_for(&line, side));

        let chosen = match (offered, posted) {
            (Some(offered), Some(posted)) => {
                if self.config.enforce_posted_line && offered != posted.value() {
                    return Err(BookieError::OddsMismatch {
                        offered,
                        posted: posted.value(),
                    });
                }
                offered
            }
            (Some(offered), None) if !self.config.enforce_posted_line => offered,
            (None, Some(posted)) => posted.value(),
            (_, None) => return Err(BookieError::NoOddsLine(game.id)),
        };
        self.odds(chosen)
    }

    fn odds(&self, value: i32) -> BookieResult<Odds> {
        Odds::bounded(value, self.config.max_odds_magnitude)
    }

    // ----- read surface -----

    pub fn game(&self, game: GameId) -> BookieResult<&Game> {
        self.state.registry.get(game)
    }

    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.state.registry.iter()
    }

    pub fn wager(&self, wager: WagerId) -> BookieResult<&Wager> {
        self.state.wagers.get(wager)
    }

    pub fn wagers_of<'a>(&'a self, bettor: &AccountId) -> impl Iterator<Item = &'a Wager> + 'a {
        self.state.wagers.wagers_of(bettor)
    }

    /// Every wager placed on `game`, oldest first
    pub fn wagers_on(&self, game: GameId) -> impl Iterator<Item = &Wager> {
        self.state.wagers.wagers_on(game)
    }

    pub fn total_wagers(&self, game: GameId) -> BookieResult<TotalWagers> {
        Ok(self.game(game)?.total_wagers())
    }

    pub fn total_at_risk(&self, game: GameId) -> BookieResult<Amount> {
        Ok(self.game(game)?.escrow().total_at_risk())
    }

    pub fn spare_escrow_amount(&self, game: GameId) -> BookieResult<Amount> {
        Ok(self.game(game)?.escrow().spare_escrow_amount())
    }

    /// Largest stake on `side` at `odds` the game can currently collateralize
    pub fn max_bet(&self, game: GameId, side: Side, odds: i32) -> BookieResult<Amount> {
        let odds = self.odds(odds)?;
        Ok(self
            .game(game)?
            .escrow()
            .max_bet(side, odds, self.state.reservoir.funds()))
    }

    /// Custody attributable to one game
    pub fn game_balance(&self, game: GameId) -> BookieResult<Amount> {
        Ok(self.game(game)?.escrow().balance())
    }

    pub fn reservoir_funds(&self) -> Amount {
        self.state.reservoir.funds()
    }

    pub fn calculate_payout(&self, stake: Amount, odds: i32) -> BookieResult<Amount> {
        payout::payout(stake, self.odds(odds)?)
    }

    pub fn calculate_inverse_payout(&self, payout: Amount, odds: i32) -> BookieResult<Amount> {
        payout::inverse_payout(payout, self.odds(odds)?)
    }

    /// Reservoir plus every game balance; matches the ledger's custody
    /// balance when the engine is the custody account's only user
    pub fn accounted_custody(&self) -> u128 {
        self.state.reservoir.funds() as u128
            + self
                .state
                .registry
                .iter()
                .map(|g| g.escrow().balance() as u128)
                .sum::<u128>()
    }

    // ----- outbox -----

    pub fn pending_events(&self) -> usize {
        self.state.outbox.len()
    }

    /// Removes and returns every pending event, for consumers outside the engine
    pub fn drain_events(&mut self) -> Vec<SequencedEvent> {
        self.state.outbox.drain()
    }

    /// Hands every pending event to `consumers`; returns the failure count
    pub fn dispatch_events(&mut self, consumers: &mut [&mut dyn EventConsumer]) -> usize {
        let pending = self.state.outbox.len();
        let failures = self.state.outbox.dispatch(consumers);
        if pending > 0 {
            tracing::debug!(events = pending, failures, "Dispatched outbox");
        }
        failures
    }
}

fn posted_for(line: &OddsLine, side: Side) -> Odds {
    match side {
        Side::HomeOrUnder => line.home,
        Side::AwayOrOver => line.away,
    }
}
