//! Bookie command-line interface
//!
//! Each invocation loads the JSON snapshot, runs one operation as the
//! `--as` account, dispatches the resulting events to the receipt issuer and
//! rewards minter, saves the snapshot and prints the result as JSON.

use bookie::{
    common::config::{generate_sample_config, ConfigLoader},
    config::BookieConfig,
    consumers::{ReceiptIssuer, RewardsMinter},
    engine::Bookie,
    errors::{BookieError, BookieResult, StorageError},
    memory::{LineBoard, MemoryLedger, ScoreBoard},
    storage::{Snapshot, SnapshotStore, SNAPSHOT_VERSION},
    AccountId, Amount, EventConsumer, ExternalId, FinalScore, GameId, NewGame, OddsRef, ScoreRef,
    Side, WagerId,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bookie escrow engine CLI
#[derive(Parser)]
#[command(name = "bookie")]
#[command(about = "Fixed-odds sports-wagering escrow and settlement engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "bookie.toml")]
    config: PathBuf,

    /// Snapshot file, overrides storage.state_file
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Account performing the operation (defaults to the administrator)
    #[arg(long = "as", global = true)]
    actor: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Home,
    Away,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        Side::from_home_flag(matches!(side, SideArg::Home))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum WagerToggle {
    Open,
    Close,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty snapshot (and a default config if none exists)
    Init {
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },

    /// Credit an account on the in-memory value ledger
    Mint { account: String, amount: Amount },

    /// Post the odds line for an odds reference
    PostLine {
        odds_ref: u64,
        #[arg(allow_negative_numbers = true)]
        home: i32,
        #[arg(allow_negative_numbers = true)]
        away: i32,
    },

    /// Report a score for an external event
    ReportScore {
        external_id: u64,
        home: u32,
        away: u32,
        /// Score is not final yet
        #[arg(long)]
        pending: bool,
    },

    /// Create a game for an external event
    MakeGame {
        external_id: u64,
        odds_ref: u64,
        /// Spread in tenths of a point applied to the home side (-75 is -7.5)
        #[arg(allow_negative_numbers = true)]
        spread: i32,
        label: String,
        /// Score feed handle (defaults to the external id)
        #[arg(long)]
        score_ref: Option<u64>,
    },

    /// Open or close wagering on a game
    ToggleWagers {
        game: u64,
        #[arg(value_enum)]
        to: WagerToggle,
    },

    /// Add administrator collateral to one game
    FundVault { game: u64, amount: Amount },

    /// Add collateral to the shared reservoir
    FundReservoir { amount: Amount },

    /// Place a wager
    MakeWager {
        game: u64,
        stake: Amount,
        #[arg(value_enum)]
        side: SideArg,
        /// Explicit odds, defaults to the posted line
        #[arg(long, allow_negative_numbers = true)]
        odds: Option<i32>,
    },

    /// Settle a game from the reported score
    Finalize { game: u64 },

    /// Collect every claimable wager of the acting account
    ClaimWagers,

    /// Release a settled game's surplus to the reservoir and administrator
    ClaimLostWagers { game: u64 },

    /// Show a game with its escrow figures
    Game { game: u64 },

    /// Largest stake the game can currently collateralize
    MaxBet {
        game: u64,
        #[arg(value_enum)]
        side: SideArg,
        #[arg(allow_negative_numbers = true)]
        odds: i32,
    },

    /// Winnings for a stake at American odds
    Payout {
        stake: Amount,
        #[arg(allow_negative_numbers = true)]
        odds: i32,
    },

    /// Smallest stake that wins at least the given payout
    InversePayout {
        payout: Amount,
        #[arg(allow_negative_numbers = true)]
        odds: i32,
    },

    /// Show reservoir funds
    Reservoir,

    /// Show an account's ledger balance, receipts and reward points
    Balance { account: Option<String> },

    /// Show a single wager
    Wager { wager: u64 },
}

type MemoryBookie = Bookie<MemoryLedger, ScoreBoard, LineBoard>;

fn main() {
    let cli = Cli::parse();
    let config = match ConfigLoader::new().with_path(&cli.config).load() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    let default_filter = if cli.verbose {
        "bookie=debug".to_string()
    } else {
        config.logging.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default()),
        Err(e) => exit_with(&e),
    }
}

fn exit_with(error: &BookieError) -> ! {
    let body = json!({ "error": error.kind().to_string(), "message": error.to_string() });
    eprintln!("{}", body);
    std::process::exit(1)
}

fn run(cli: Cli, config: BookieConfig) -> BookieResult<Value> {
    let store = match cli.state {
        Some(ref path) => SnapshotStore::new(path),
        None => SnapshotStore::from_config(&config.storage),
    };
    let actor = AccountId::new(
        cli.actor
            .clone()
            .unwrap_or_else(|| config.engine.administrator.clone()),
    );

    if let Commands::Init { force } = cli.command {
        if store.exists() && !force {
            return Err(StorageError::WriteFailed(format!(
                "{} already exists, pass --force to overwrite",
                store.path().display()
            ))
            .into());
        }
        if !cli.config.exists() {
            generate_sample_config(&cli.config.to_string_lossy())?;
            tracing::info!(path = %cli.config.display(), "Wrote default configuration");
        }
        store.save(&Snapshot::empty(config.rewards.basis_points))?;
        tracing::info!(path = %store.path().display(), "Initialized empty book");
        return Ok(json!({ "state_file": store.path().display().to_string() }));
    }

    let mut snapshot = store
        .load()?
        .unwrap_or_else(|| Snapshot::empty(config.rewards.basis_points));
    snapshot.apply_config(&config);
    let Snapshot {
        state,
        ledger,
        lines,
        scores,
        mut receipts,
        mut rewards,
        ..
    } = snapshot;
    let mut bookie = Bookie::with_state(&config, state, ledger, scores, lines)?;

    let output = execute(&mut bookie, &actor, cli.command, &receipts, &rewards);

    // Events committed before a failure are still dispatched and saved
    bookie.dispatch_events(&mut [&mut receipts as &mut dyn EventConsumer, &mut rewards]);
    let (state, ledger, scores, lines) = bookie.into_parts();
    store.save(&Snapshot {
        version: SNAPSHOT_VERSION,
        state,
        ledger,
        lines,
        scores,
        receipts,
        rewards,
    })?;

    output
}

fn to_json<T: serde::Serialize>(value: &T) -> BookieResult<Value> {
    Ok(serde_json::to_value(value).map_err(StorageError::from)?)
}

fn execute(
    bookie: &mut MemoryBookie,
    actor: &AccountId,
    command: Commands,
    receipts: &ReceiptIssuer,
    rewards: &RewardsMinter,
) -> BookieResult<Value> {
    match command {
        Commands::Init { .. } => Ok(Value::Null),
        Commands::Mint { account, amount } => {
            bookie.authorize(actor)?;
            let account = AccountId::new(account);
            let balance = bookie.ledger_mut().mint(&account, amount)?;
            Ok(json!({ "account": account, "balance": balance }))
        }
        Commands::PostLine { odds_ref, home, away } => {
            bookie.authorize(actor)?;
            let line = bookie.lines_mut().post(OddsRef(odds_ref), home, away)?;
            Ok(json!({ "odds_ref": odds_ref, "line": line }))
        }
        Commands::ReportScore {
            external_id,
            home,
            away,
            pending,
        } => {
            bookie.authorize(actor)?;
            let score = FinalScore {
                home,
                away,
                finalized: !pending,
            };
            bookie.scores_mut().report(ExternalId(external_id), score);
            Ok(json!({ "external_id": external_id, "score": score }))
        }
        Commands::MakeGame {
            external_id,
            odds_ref,
            spread,
            label,
            score_ref,
        } => {
            let cap = bookie.authorize(actor)?;
            let game = bookie.make_game(
                &cap,
                NewGame {
                    external_id: ExternalId(external_id),
                    odds_ref: OddsRef(odds_ref),
                    score_ref: ScoreRef(score_ref.unwrap_or(external_id)),
                    spread,
                    label,
                },
            )?;
            Ok(json!({ "game": game }))
        }
        Commands::ToggleWagers { game, to } => {
            let cap = bookie.authorize(actor)?;
            let open = matches!(to, WagerToggle::Open);
            bookie.toggle_wagers(&cap, GameId(game), open)?;
            Ok(json!({ "game": game, "wagers_open": open }))
        }
        Commands::FundVault { game, amount } => {
            let cap = bookie.authorize(actor)?;
            bookie.fund_vault(&cap, GameId(game), amount)?;
            game_view(bookie, GameId(game))
        }
        Commands::FundReservoir { amount } => {
            let cap = bookie.authorize(actor)?;
            bookie.fund_reservoir(&cap, amount)?;
            Ok(json!({ "reservoir": bookie.reservoir_funds() }))
        }
        Commands::MakeWager {
            game,
            stake,
            side,
            odds,
        } => {
            let wager = bookie.make_wager(actor, GameId(game), stake, side.into(), odds)?;
            to_json(bookie.wager(wager)?)
        }
        Commands::Finalize { game } => {
            let outcome = bookie.finalize_game(GameId(game))?;
            Ok(json!({ "game": game, "outcome": outcome }))
        }
        Commands::ClaimWagers => to_json(&bookie.claim_wagers(actor)?),
        Commands::ClaimLostWagers { game } => {
            let cap = bookie.authorize(actor)?;
            let release = bookie.claim_lost_wagers(&cap, GameId(game))?;
            Ok(json!({
                "game": game,
                "release": release,
                "game_balance": bookie.game_balance(GameId(game))?,
            }))
        }
        Commands::Game { game } => game_view(bookie, GameId(game)),
        Commands::MaxBet { game, side, odds } => {
            let max_bet = bookie.max_bet(GameId(game), side.into(), odds)?;
            Ok(json!({ "game": game, "odds": odds, "max_bet": max_bet }))
        }
        Commands::Payout { stake, odds } => {
            Ok(json!({ "stake": stake, "odds": odds, "payout": bookie.calculate_payout(stake, odds)? }))
        }
        Commands::InversePayout { payout, odds } => Ok(json!({
            "payout": payout,
            "odds": odds,
            "stake": bookie.calculate_inverse_payout(payout, odds)?,
        })),
        Commands::Reservoir => Ok(json!({ "reservoir": bookie.reservoir_funds() })),
        Commands::Balance { account } => {
            let account = account.map(AccountId::new).unwrap_or_else(|| actor.clone());
            let wagers: Vec<WagerId> = bookie.wagers_of(&account).map(|w| w.id).collect();
            Ok(json!({
                "account": account,
                "balance": bookie.ledger().balance_of(&account),
                "wagers": wagers,
                "receipts": receipts.receipts_of(&account).len(),
                "reward_points": rewards.points_of(&account),
            }))
        }
        Commands::Wager { wager } => to_json(bookie.wager(WagerId(wager))?),
    }
}

fn game_view(bookie: &MemoryBookie, id: GameId) -> BookieResult<Value> {
    let game = bookie.game(id)?;
    let escrow = game.escrow();
    Ok(json!({
        "game": game.id,
        "external_id": game.external_id,
        "label": game.label,
        "score_ref": game.score_ref,
        "spread": game.spread,
        "state": game.state(),
        "outcome": game.outcome(),
        "final_score": game.final_score(),
        "total_wagers": game.total_wagers(),
        "wager_count": bookie.wagers_on(id).count(),
        "funded_collateral": escrow.funded_collateral(),
        "reservoir_drawn": escrow.reservoir_drawn(),
        "total_at_risk": escrow.total_at_risk(),
        "spare_escrow_amount": escrow.spare_escrow_amount(),
        "game_balance": escrow.balance(),
    }))
}
