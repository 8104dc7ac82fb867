//! End-to-end settlement scenarios
//! Wager acceptance, finalization, bettor claims and house release against
//! the in-memory ledger and oracles.

use bookie::{
    consumers::{ReceiptIssuer, RewardsMinter},
    memory::{LineBoard, MemoryLedger, ScoreBoard},
    AccountId, AdminCap, Amount, Bookie, BookieConfig, BookieError, ErrorKind, EventConsumer,
    ExternalId, FinalScore, GameId, NewGame, OddsRef, Outcome, ScoreRef, Side, ValueLedger,
};

type TestBookie = Bookie<MemoryLedger, ScoreBoard, LineBoard>;

const START: Amount = 100_000 * 1_000_000;
const EVENT: ExternalId = ExternalId(12345);

fn alice() -> AccountId {
    AccountId::new("alice")
}

fn bob() -> AccountId {
    AccountId::new("bob")
}

fn owner() -> AccountId {
    AccountId::new("owner")
}

/// Engine with funded accounts, one open game at -7.5 and 1_000_000 collateral
fn open_book(spread: i32) -> (TestBookie, AdminCap, GameId) {
    let mut ledger = MemoryLedger::new();
    for account in [owner(), alice(), bob(), AccountId::new("charlie")] {
        ledger.mint(&account, START).unwrap();
    }
    let mut lines = LineBoard::new();
    lines.post(OddsRef(0), -115, -110).unwrap();

    let mut bookie = Bookie::new(&BookieConfig::ephemeral("owner"), ledger, ScoreBoard::new(), lines).unwrap();
    let cap = bookie.authorize(&owner()).unwrap();
    let game = bookie
        .make_game(
            &cap,
            NewGame {
                external_id: EVENT,
                odds_ref: OddsRef(0),
                score_ref: ScoreRef(0),
                spread,
                label: "HOME vs AWAY".to_string(),
            },
        )
        .unwrap();
    bookie.toggle_wagers(&cap, game, true).unwrap();
    bookie.fund_vault(&cap, game, 1_000_000).unwrap();
    (bookie, cap, game)
}

fn report_final(bookie: &mut TestBookie, home: u32, away: u32) {
    bookie.scores_mut().report(EVENT, FinalScore::final_result(home, away));
}

fn assert_custody_matches(bookie: &TestBookie) {
    assert_eq!(
        bookie.ledger().custody_balance() as u128,
        bookie.accounted_custody()
    );
}

#[test]
fn test_two_sided_book_and_exact_capacity() {
    let (mut bookie, _cap, game) = open_book(-75);

    bookie.make_wager(&alice(), game, 1_000_000, Side::HomeOrUnder, Some(-115)).unwrap();
    assert_eq!(bookie.total_at_risk(game).unwrap(), 1_000_000 + 869_565);
    assert_eq!(bookie.spare_escrow_amount(game).unwrap(), 1_000_000 - 869_565);

    bookie.make_wager(&bob(), game, 1_000_000, Side::AwayOrOver, Some(-110)).unwrap();
    let at_risk = 1_000_000 + 909_090;
    assert_eq!(bookie.total_at_risk(game).unwrap(), at_risk);
    assert_eq!(bookie.spare_escrow_amount(game).unwrap(), 3_000_000 - at_risk);
    assert_eq!(bookie.ledger().custody_balance(), 3_000_000);

    let totals = bookie.total_wagers(game).unwrap();
    assert_eq!(totals.home_or_under_wagered, 1_000_000);
    assert_eq!(totals.away_or_over_wagered, 1_000_000);

    bookie.make_wager(&alice(), game, 1_300_001, Side::HomeOrUnder, Some(-115)).unwrap();
    assert_eq!(bookie.spare_escrow_amount(game).unwrap(), 0);

    let err = bookie
        .make_wager(&alice(), game, 100_000, Side::HomeOrUnder, Some(-115))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientEscrow);
    assert!(err.to_string().starts_with("not sufficient escrow"));

    report_final(&mut bookie, 22, 14);
    assert_eq!(bookie.ledger().balance_of(&alice()), 99_997_699_999);
    bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(bookie.ledger().balance_of(&alice()), 100_002_000_000);

    assert_eq!(bookie.ledger().balance_of(&bob()), 99_999_000_000);
    let plan = bookie.claim_wagers(&bob()).unwrap();
    assert_eq!(plan.total, 0);
    assert_eq!(bookie.ledger().balance_of(&bob()), 99_999_000_000);
    assert_custody_matches(&bookie);
}

#[test]
fn test_claim_lost_wagers_drains_game() {
    let (mut bookie, cap, game) = open_book(-75);
    for _ in 0..50 {
        bookie.make_wager(&alice(), game, 10_000, Side::HomeOrUnder, Some(-115)).unwrap();
    }
    bookie.make_wager(&bob(), game, 100_000, Side::AwayOrOver, Some(-110)).unwrap();
    report_final(&mut bookie, 22, 14);

    let owed = 50 * (10_000 + 8_695);
    let balance = bookie.game_balance(game).unwrap();
    assert_eq!(balance, 1_600_000);

    let owner_before = bookie.ledger().balance_of(&owner());
    let release = bookie.claim_lost_wagers(&cap, game).unwrap();
    assert_eq!(release.to_house, balance - owed);
    assert_eq!(release.to_reservoir, 0);
    let expected = owner_before + balance - owed;
    assert_eq!(bookie.ledger().balance_of(&owner()), expected);

    assert!(bookie.claim_lost_wagers(&cap, game).unwrap().is_empty());
    assert_eq!(bookie.ledger().balance_of(&owner()), expected);

    let bob_before = bookie.ledger().balance_of(&bob());
    bookie.claim_wagers(&bob()).unwrap();
    bookie.claim_wagers(&bob()).unwrap();
    assert_eq!(bookie.ledger().balance_of(&bob()), bob_before);

    let alice_before = bookie.ledger().balance_of(&alice());
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.lines.len(), 50);
    assert_eq!(bookie.ledger().balance_of(&alice()), alice_before + owed);
    let again = bookie.claim_wagers(&alice()).unwrap();
    assert!(again.is_empty());
    assert_eq!(bookie.ledger().balance_of(&alice()), alice_before + owed);

    assert_eq!(bookie.game_balance(game).unwrap(), 0);
    assert_eq!(bookie.ledger().custody_balance(), 0);
}

#[test]
fn test_winners_first_then_house_empties_custody() {
    let (mut bookie, cap, game) = open_book(-75);
    for _ in 0..30 {
        bookie.make_wager(&alice(), game, 10_000, Side::HomeOrUnder, Some(-115)).unwrap();
    }
    bookie.make_wager(&bob(), game, 100_000, Side::AwayOrOver, Some(-110)).unwrap();
    report_final(&mut bookie, 22, 14);

    // home obligation 560_850 against 1_400_000 collateral
    assert_eq!(bookie.max_bet(game, Side::HomeOrUnder, -115).unwrap(), 965_023);

    let alice_before = bookie.ledger().balance_of(&alice());
    bookie.claim_wagers(&bob()).unwrap();
    bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(bookie.ledger().balance_of(&alice()), alice_before + 30 * 18_695);

    let balance = bookie.game_balance(game).unwrap();
    let owner_before = bookie.ledger().balance_of(&owner());
    bookie.claim_lost_wagers(&cap, game).unwrap();
    bookie.claim_lost_wagers(&cap, game).unwrap();
    assert_eq!(bookie.ledger().balance_of(&owner()), owner_before + balance);
    assert_eq!(bookie.game_balance(game).unwrap(), 0);
    assert_eq!(bookie.ledger().custody_balance(), 0);
}

#[test]
fn test_reservoir_covers_shortfall_and_is_repaid_first() {
    let (mut bookie, cap, game) = open_book(-75);
    let stake = bookie.calculate_inverse_payout(100_000_000, -115).unwrap();
    assert_eq!(stake, 115_000_000);

    bookie.fund_reservoir(&cap, 99_000_000).unwrap();
    bookie.make_wager(&alice(), game, stake, Side::HomeOrUnder, Some(-115)).unwrap();
    assert_eq!(bookie.spare_escrow_amount(game).unwrap(), 0);
    assert_eq!(bookie.reservoir_funds(), 0);
    assert_eq!(bookie.game(game).unwrap().escrow().reservoir_drawn(), 99_000_000);

    let err = bookie.make_wager(&alice(), game, 100, Side::HomeOrUnder, Some(-115)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientEscrow);

    // 0 - 7.5 < 0: away covers, alice loses
    report_final(&mut bookie, 0, 0);
    assert_eq!(bookie.finalize_game(game).unwrap(), Outcome::Away);
    assert_eq!(bookie.reservoir_funds(), 99_000_000);
    assert_eq!(bookie.game(game).unwrap().escrow().returned_to_reservoir(), 99_000_000);
    assert_eq!(bookie.game_balance(game).unwrap(), 116_000_000);
    assert_custody_matches(&bookie);

    let owner_before = bookie.ledger().balance_of(&owner());
    let release = bookie.claim_lost_wagers(&cap, game).unwrap();
    assert_eq!(release.to_reservoir, 0);
    assert_eq!(release.to_house, 116_000_000);
    assert_eq!(bookie.reservoir_funds(), 99_000_000);
    assert_eq!(bookie.ledger().balance_of(&owner()) - owner_before, 116_000_000);
    assert_eq!(bookie.game_balance(game).unwrap(), 0);
    assert_custody_matches(&bookie);
}

#[test]
fn test_push_returns_stakes_only() {
    // 22 - 8.0 == 14
    let (mut bookie, cap, game) = open_book(-80);
    bookie.make_wager(&alice(), game, 1_000_000, Side::HomeOrUnder, Some(-115)).unwrap();
    bookie.make_wager(&bob(), game, 500_000, Side::AwayOrOver, Some(-110)).unwrap();
    report_final(&mut bookie, 22, 14);

    assert_eq!(bookie.finalize_game(game).unwrap(), Outcome::Push);
    bookie.claim_wagers(&alice()).unwrap();
    bookie.claim_wagers(&bob()).unwrap();
    assert_eq!(bookie.ledger().balance_of(&alice()), START);
    assert_eq!(bookie.ledger().balance_of(&bob()), START);

    let release = bookie.claim_lost_wagers(&cap, game).unwrap();
    assert_eq!(release.to_house, 1_000_000);
    assert_eq!(bookie.ledger().balance_of(&owner()), START);
    assert_eq!(bookie.game_balance(game).unwrap(), 0);
}

#[test]
fn test_claim_order_cannot_cause_shortfall() {
    let charlie = AccountId::new("charlie");
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];

    for order in orders {
        let (mut bookie, cap, game) = open_book(-75);
        // fill the home side to exactly zero spare, from three winners
        bookie.make_wager(&alice(), game, 400_000, Side::HomeOrUnder, Some(-115)).unwrap();
        bookie.make_wager(&charlie, game, 300_000, Side::HomeOrUnder, Some(-115)).unwrap();
        bookie.make_wager(&bob(), game, 250_000, Side::AwayOrOver, Some(-110)).unwrap();
        let max = bookie.max_bet(game, Side::HomeOrUnder, -115).unwrap();
        bookie.make_wager(&bob(), game, max, Side::HomeOrUnder, Some(-115)).unwrap();
        report_final(&mut bookie, 22, 14);

        for step in order {
            match step {
                0 => assert_eq!(bookie.claim_wagers(&alice()).unwrap().total, 400_000 + 347_826),
                1 => assert_eq!(bookie.claim_wagers(&charlie).unwrap().total, 300_000 + 260_869),
                2 => assert_eq!(bookie.claim_wagers(&bob()).unwrap().total, 737_501 + 641_305),
                _ => assert!(bookie.claim_lost_wagers(&cap, game).unwrap().is_empty()),
            }
            assert_custody_matches(&bookie);
        }
        bookie.claim_lost_wagers(&cap, game).unwrap();
        assert_eq!(bookie.game_balance(game).unwrap(), 0, "order {:?}", order);
        assert_eq!(bookie.ledger().custody_balance(), 0);
    }
}

#[test]
fn test_claims_skip_games_still_in_play() {
    let (mut bookie, cap, first) = open_book(-75);
    let second = bookie
        .make_game(
            &cap,
            NewGame {
                external_id: ExternalId(999),
                odds_ref: OddsRef(0),
                score_ref: ScoreRef(999),
                spread: 30,
                label: "LATE GAME".to_string(),
            },
        )
        .unwrap();
    bookie.toggle_wagers(&cap, second, true).unwrap();
    bookie.fund_vault(&cap, second, 1_000_000).unwrap();

    bookie.make_wager(&alice(), first, 10_000, Side::HomeOrUnder, None).unwrap();
    bookie.make_wager(&alice(), second, 10_000, Side::AwayOrOver, None).unwrap();
    report_final(&mut bookie, 22, 14);

    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.lines.len(), 1);
    assert_eq!(plan.skipped, 1);
    assert_eq!(plan.total, 18_695);

    // 10 + 3.0 < 17: away wins at -110
    bookie.scores_mut().report(ExternalId(999), FinalScore::final_result(10, 17));
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.total, 10_000 + 9_090);
    assert_eq!(plan.skipped, 0);
}

#[test]
fn test_reclaimed_reservoir_backs_the_next_game() {
    let (mut bookie, cap, first) = open_book(-75);
    bookie.fund_reservoir(&cap, 99_000_000).unwrap();
    bookie.make_wager(&alice(), first, 115_000_000, Side::HomeOrUnder, Some(-115)).unwrap();
    assert_eq!(bookie.reservoir_funds(), 0);

    let second = bookie
        .make_game(
            &cap,
            NewGame {
                external_id: ExternalId(777),
                odds_ref: OddsRef(0),
                score_ref: ScoreRef(777),
                spread: 0,
                label: "NEXT".to_string(),
            },
        )
        .unwrap();
    bookie.toggle_wagers(&cap, second, true).unwrap();
    // a unit stake at -110 wins nothing, so it needs no collateral
    assert_eq!(bookie.max_bet(second, Side::AwayOrOver, -110).unwrap(), 1);

    // claims settle the first game without any admin call
    report_final(&mut bookie, 0, 0);
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.total, 0);
    assert_eq!(bookie.reservoir_funds(), 99_000_000);

    // payout(108_900_001, -110) == 99_000_000
    assert_eq!(bookie.max_bet(second, Side::AwayOrOver, -110).unwrap(), 108_900_001);
    bookie.make_wager(&bob(), second, 108_900_001, Side::AwayOrOver, Some(-110)).unwrap();
    assert_eq!(bookie.reservoir_funds(), 0);
    assert_custody_matches(&bookie);
}

#[test]
fn test_claims_skip_games_while_score_feed_is_down() {
    let (mut bookie, _cap, game) = open_book(-75);
    bookie.make_wager(&alice(), game, 10_000, Side::HomeOrUnder, None).unwrap();
    report_final(&mut bookie, 22, 14);

    bookie.scores_mut().set_offline(true);
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert!(plan.lines.is_empty());
    assert_eq!(plan.skipped, 1);
    assert!(!bookie.game(game).unwrap().is_settled());
    assert!(!bookie.wagers_of(&alice()).any(|w| w.claimed()));

    bookie.scores_mut().set_offline(false);
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.total, 18_695);
    assert!(bookie.game(game).unwrap().is_settled());
}

#[test]
fn test_settled_game_rejects_wagers_and_funding() {
    let (mut bookie, cap, game) = open_book(-75);
    report_final(&mut bookie, 22, 14);
    bookie.finalize_game(game).unwrap();

    let err = bookie.make_wager(&alice(), game, 100, Side::HomeOrUnder, None).unwrap_err();
    assert!(matches!(err, BookieError::GameSettled(_)));
    assert!(matches!(bookie.fund_vault(&cap, game, 1), Err(BookieError::GameSettled(_))));
    assert!(matches!(
        bookie.toggle_wagers(&cap, game, true),
        Err(BookieError::GameSettled(_))
    ));

    // the external id is free again
    let next = bookie
        .make_game(
            &cap,
            NewGame {
                external_id: EVENT,
                odds_ref: OddsRef(0),
                score_ref: ScoreRef(0),
                spread: -75,
                label: "REMATCH".to_string(),
            },
        )
        .unwrap();
    assert_ne!(next, game);
}

#[test]
fn test_claim_lost_requires_final_score() {
    let (mut bookie, cap, game) = open_book(-75);
    let err = bookie.claim_lost_wagers(&cap, game).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(bookie.game_balance(game).unwrap(), 1_000_000);
}

#[test]
fn test_failed_payout_transfer_keeps_wagers_claimable() {
    let (mut bookie, _cap, game) = open_book(-75);
    bookie.make_wager(&alice(), game, 10_000, Side::HomeOrUnder, None).unwrap();
    report_final(&mut bookie, 22, 14);

    bookie.ledger_mut().freeze(&alice());
    let err = bookie.claim_wagers(&alice()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert!(!bookie.wagers_of(&alice()).any(|w| w.claimed()));

    bookie.ledger_mut().unfreeze(&alice());
    let plan = bookie.claim_wagers(&alice()).unwrap();
    assert_eq!(plan.total, 18_695);
    assert!(bookie.wagers_of(&alice()).all(|w| w.claimed()));
}

#[test]
fn test_unauthorized_admin_operations() {
    let (mut bookie, _cap, game) = open_book(-75);
    assert_eq!(bookie.authorize(&alice()).unwrap_err().kind(), ErrorKind::Unauthorized);

    let (other, _, _) = open_book(-75);
    let foreign = other.authorize(&owner()).unwrap();
    for result in [
        bookie.toggle_wagers(&foreign, game, false),
        bookie.fund_vault(&foreign, game, 10),
        bookie.fund_reservoir(&foreign, 10),
    ] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
    }
    assert_eq!(
        bookie.claim_lost_wagers(&foreign, game).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

#[test]
fn test_receipts_and_rewards_follow_events() {
    let (mut bookie, _cap, game) = open_book(-75);
    bookie.make_wager(&alice(), game, 10_000, Side::HomeOrUnder, None).unwrap();
    bookie.make_wager(&alice(), game, 20_000, Side::HomeOrUnder, None).unwrap();
    bookie.make_wager(&bob(), game, 50_000, Side::AwayOrOver, None).unwrap();

    let mut receipts = ReceiptIssuer::new();
    let mut rewards = RewardsMinter::new(100);
    let failures = bookie.dispatch_events(&mut [&mut receipts as &mut dyn EventConsumer, &mut rewards]);
    assert_eq!(failures, 0);
    assert_eq!(receipts.receipts_of(&alice()).len(), 2);
    assert_eq!(receipts.receipts_of(&bob()).len(), 1);
    assert_eq!(bookie.pending_events(), 0);

    report_final(&mut bookie, 22, 14);
    bookie.claim_wagers(&alice()).unwrap();
    bookie.claim_wagers(&bob()).unwrap();
    bookie.dispatch_events(&mut [&mut receipts as &mut dyn EventConsumer, &mut rewards]);
    assert_eq!(rewards.points_of(&alice()), 300);
    assert_eq!(rewards.points_of(&bob()), 500);
}
