//! Serialized engine service
//!
//! Runs one `Bookie` on a tokio task. Any number of `BookHandle` clones
//! submit operations over an mpsc channel; the task runs them one at a time
//! in arrival order and answers each over a oneshot channel.

use crate::common::traits::{EventConsumer, OddsOracle, ScoreOracle, ValueLedger};
use crate::common::types::{AccountId, Amount, GameId, Side, WagerId};
use crate::engine::Bookie;
use crate::errors::{BookieError, BookieResult};
use crate::events::{self, SequencedEvent};
use crate::settlement::ClaimPlan;
use tokio::sync::{mpsc, oneshot};

/// Submission queue depth
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

type Job<B> = Box<dyn FnOnce(&mut B) + Send>;

enum Command<B> {
    Run(Job<B>),
    Shutdown(oneshot::Sender<B>),
}

pub struct BookService;

impl BookService {
    /// Moves `bookie` onto a background task and returns a handle to it
    pub fn spawn<L, S, O>(bookie: Bookie<L, S, O>) -> BookHandle<L, S, O>
    where
        L: ValueLedger + Send + 'static,
        S: ScoreOracle + Send + 'static,
        O: OddsOracle + Send + 'static,
    {
        Self::spawn_with_depth(bookie, DEFAULT_QUEUE_DEPTH)
    }

    pub fn spawn_with_depth<L, S, O>(mut bookie: Bookie<L, S, O>, depth: usize) -> BookHandle<L, S, O>
    where
        L: ValueLedger + Send + 'static,
        S: ScoreOracle + Send + 'static,
        O: OddsOracle + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command<Bookie<L, S, O>>>(depth.max(1));

        tokio::spawn(async move {
            tracing::debug!("Book service started");
            let mut processed: u64 = 0;
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Run(job) => {
                        job(&mut bookie);
                        processed += 1;
                    }
                    Command::Shutdown(reply) => {
                        tracing::info!(processed, "Book service stopping");
                        // Receiver dropped means nobody wants the engine back
                        let _ = reply.send(bookie);
                        return;
                    }
                }
            }
            tracing::debug!(processed, "All book handles dropped, service exiting");
        });

        BookHandle { tx }
    }
}

pub struct BookHandle<L, S, O> {
    tx: mpsc::Sender<Command<Bookie<L, S, O>>>,
}

impl<L, S, O> Clone for BookHandle<L, S, O> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<L, S, O> BookHandle<L, S, O>
where
    L: ValueLedger + Send + 'static,
    S: ScoreOracle + Send + 'static,
    O: OddsOracle + Send + 'static,
{
    /// Runs `f` against the engine once every earlier submission has finished
    pub async fn call<R, F>(&self, f: F) -> BookieResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Bookie<L, S, O>) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<Bookie<L, S, O>> = Box::new(move |bookie| {
            let _ = reply_tx.send(f(bookie));
        });
        self.tx
            .send(Command::Run(job))
            .await
            .map_err(|_| BookieError::ServiceStopped)?;
        reply_rx.await.map_err(|_| BookieError::ServiceStopped)
    }

    pub async fn make_wager(
        &self,
        bettor: AccountId,
        game: GameId,
        stake: Amount,
        side: Side,
        odds: Option<i32>,
    ) -> BookieResult<WagerId> {
        self.call(move |b| b.make_wager(&bettor, game, stake, side, odds))
            .await?
    }

    pub async fn claim_wagers(&self, bettor: AccountId) -> BookieResult<ClaimPlan> {
        self.call(move |b| b.claim_wagers(&bettor)).await?
    }

    pub async fn spare_escrow_amount(&self, game: GameId) -> BookieResult<Amount> {
        self.call(move |b| b.spare_escrow_amount(game)).await?
    }

    pub async fn drain_events(&self) -> BookieResult<Vec<SequencedEvent>> {
        self.call(|b| b.drain_events()).await
    }

    /// Drains the engine's outbox and runs the events through `consumers`
    /// on the caller's side; returns how many handler calls failed
    pub async fn dispatch_events(&self, consumers: &mut [&mut dyn EventConsumer]) -> BookieResult<usize> {
        let drained = self.drain_events().await?;
        let failures = events::deliver(&drained, consumers);
        tracing::debug!(events = drained.len(), failures, "Dispatched outbox through handle");
        Ok(failures)
    }

    /// Stops the service after queued work and hands the engine back
    pub async fn shutdown(self) -> BookieResult<Bookie<L, S, O>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(reply_tx))
            .await
            .map_err(|_| BookieError::ServiceStopped)?;
        reply_rx.await.map_err(|_| BookieError::ServiceStopped)
    }
}
