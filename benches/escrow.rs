//! Throughput of the escrow hot paths: payout math, wager acceptance and a
//! full settlement pass

use bookie::{
    memory::{LineBoard, MemoryLedger, ScoreBoard},
    payout, AccountId, Bookie, BookieConfig, ExternalId, FinalScore, GameId, NewGame, Odds,
    OddsRef, ScoreRef, Side,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

type BenchBookie = Bookie<MemoryLedger, ScoreBoard, LineBoard>;

fn open_book(wagers: usize) -> (BenchBookie, GameId) {
    let admin = AccountId::new("house");
    let mut ledger = MemoryLedger::new();
    ledger.mint(&admin, u32::MAX as u64).unwrap();
    ledger.mint(&AccountId::new("alice"), u32::MAX as u64).unwrap();
    ledger.mint(&AccountId::new("bob"), u32::MAX as u64).unwrap();

    let mut bookie = Bookie::new(&BookieConfig::ephemeral("house"), ledger, ScoreBoard::new(), LineBoard::new()).unwrap();
    let cap = bookie.authorize(&admin).unwrap();
    let game = bookie
        .make_game(
            &cap,
            NewGame {
                external_id: ExternalId(1),
                odds_ref: OddsRef(1),
                score_ref: ScoreRef(1),
                spread: -75,
                label: "BENCH".to_string(),
            },
        )
        .unwrap();
    bookie.toggle_wagers(&cap, game, true).unwrap();
    bookie.fund_vault(&cap, game, 1_000_000_000).unwrap();

    for i in 0..wagers {
        let (bettor, side, odds) = if i % 2 == 0 {
            ("alice", Side::HomeOrUnder, -115)
        } else {
            ("bob", Side::AwayOrOver, -110)
        };
        bookie
            .make_wager(&AccountId::new(bettor), game, 10_000, side, Some(odds))
            .unwrap();
    }
    (bookie, game)
}

fn bench_payout(c: &mut Criterion) {
    let odds = Odds::new(-115).unwrap();
    c.bench_function("payout_and_inverse", |b| {
        b.iter(|| {
            let p = payout::payout(black_box(1_234_567), odds).unwrap();
            payout::inverse_payout(black_box(p), odds).unwrap()
        })
    });
}

fn bench_make_wager(c: &mut Criterion) {
    let alice = AccountId::new("alice");
    c.bench_function("make_wager_100", |b| {
        b.iter_batched(
            || open_book(0),
            |(mut bookie, game)| {
                for _ in 0..100 {
                    bookie
                        .make_wager(&alice, game, 10_000, Side::HomeOrUnder, Some(-115))
                        .unwrap();
                }
                bookie
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_settlement(c: &mut Criterion) {
    c.bench_function("settle_1000_wagers", |b| {
        b.iter_batched(
            || {
                let (mut bookie, game) = open_book(1_000);
                bookie.scores_mut().report(ExternalId(1), FinalScore::final_result(22, 14));
                (bookie, game)
            },
            |(mut bookie, game)| {
                let cap = bookie.authorize(&AccountId::new("house")).unwrap();
                bookie.claim_wagers(&AccountId::new("alice")).unwrap();
                bookie.claim_wagers(&AccountId::new("bob")).unwrap();
                bookie.claim_lost_wagers(&cap, game).unwrap();
                bookie
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_payout, bench_make_wager, bench_settlement);
criterion_main!(benches);
