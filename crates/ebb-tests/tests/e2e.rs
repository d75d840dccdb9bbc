//! End-to-end campaign scenarios.

use ebb_campaign::StepOutcome;
use ebb_core::constants::{RATE_PRECISION, UNIT};
use ebb_core::error::CampaignError;
use ebb_core::types::PeriodStatus;
use ebb_tests::helpers::*;

fn as_f64(rate: u128) -> f64 {
    rate as f64 / RATE_PRECISION as f64
}

fn assert_close(actual: f64, expected: f64) {
    let rel = ((actual - expected) / expected).abs();
    assert!(rel < 1e-12, "{actual} vs {expected} (relative error {rel})");
}

// ---------------------------------------------------------------------------
// Curve scenario: initial 100, decay 99/100, batch 20
// ---------------------------------------------------------------------------

#[test]
fn reference_curve_rate_at_seven() {
    let (c, _, _) = campaign();
    assert_close(as_f64(c.rate_at(7).unwrap()), 100.0 * 0.99f64.powi(7));
}

#[test]
fn reference_curve_average_31_to_85() {
    let (c, _, _) = campaign();
    let avg = c.average_rate(units(31), units(85)).unwrap();
    let expected = 100.0
        * (9.0 * 0.99 + 20.0 * 0.99f64.powi(2) + 20.0 * 0.99f64.powi(3) + 5.0 * 0.99f64.powi(4))
        / 54.0;
    assert_close(as_f64(avg), expected);
}

// ---------------------------------------------------------------------------
// Contribution scenarios
// ---------------------------------------------------------------------------

#[test]
fn four_contributions_with_capped_second() {
    let (mut c, router, issuer) = campaign();
    let (alice, bob, carol, dave) = (acct(1), acct(2), acct(3), acct(4));

    c.contribute(&ctx(alice, 1), units(15)).unwrap();
    let capped = c
        .contribute_for(&ctx(bob, 2), bob, units(4), Some(units(17)))
        .unwrap();
    c.contribute(&ctx(carol, 3), units(12)).unwrap();
    c.contribute(&ctx(dave, 4), units(11)).unwrap();

    assert_eq!(capped.contribution.accepted, units(2));
    assert_eq!(capped.contribution.refunded, units(2));
    assert_eq!(router.refunded_to(&bob), units(2));

    assert_eq!(c.contribution_count(), 4);
    assert_eq!(c.total_accepted(), units(15 + 2 + 12 + 11));
    assert_eq!(c.total_received(), units(15 + 4 + 12 + 11));
    assert_eq!(router.payout_balance(), c.total_accepted());

    let entries = c.period(0).unwrap().entries();
    let starts: Vec<_> = entries.iter().map(|e| e.volume_start).collect();
    assert_eq!(starts, vec![0, units(15), units(17), units(29)]);

    c.tick(10).unwrap();
    let avg = settle(&mut c, 0);
    for (who, amount) in [(alice, 15), (bob, 2), (carol, 12), (dave, 11)] {
        let tokens = c.collect(who, 0).unwrap();
        // One whole unit earns exactly `avg` base units of tokens.
        assert_eq!(tokens, amount * avg);
        assert_eq!(issuer.balance_of(&who), tokens);
    }
    assert_eq!(issuer.total_supply(), c.total_issued());
}

#[test]
fn beneficiary_owns_entry_sender_gets_refund() {
    let (mut c, router, issuer) = campaign();
    let (payer, owner) = (acct(1), acct(2));
    c.contribute(&ctx(payer, 1), units(18)).unwrap();
    c.contribute_for(&ctx(payer, 2), owner, units(5), Some(units(20)))
        .unwrap();

    assert_eq!(router.refunded_to(&payer), units(3));
    assert_eq!(router.forwarded_from(&payer), units(20));

    c.tick(10).unwrap();
    settle(&mut c, 0);
    c.collect(owner, 0).unwrap();
    // Batch 0 only: exactly 100 tokens per unit.
    assert_eq!(issuer.balance_of(&owner), units(200));
}

#[test]
fn min_rate_contribution_spans_periods() {
    let (mut c, router, _) = campaign();
    let floor = 98 * RATE_PRECISION;
    // Batches 0..=2 are priced at 100, 99 and 98.01; batch 3 drops below 98.
    let r = c
        .contribute_with_min_rate(&ctx(acct(1), 1), acct(1), units(70), floor)
        .unwrap();
    assert_eq!(r.contribution.accepted, units(60));

    let r = c
        .contribute_with_min_rate(&ctx(acct(2), 12), acct(2), units(1), floor)
        .unwrap();
    assert_eq!(r.period, 1);
    assert_eq!(r.closed, Some(0));
    assert_eq!(r.contribution.accepted, 0);
    assert_eq!(router.refunded_to(&acct(1)), units(10));
    assert_eq!(router.refunded_to(&acct(2)), units(1));
}

// ---------------------------------------------------------------------------
// Verification scenarios
// ---------------------------------------------------------------------------

#[test]
fn reject_then_resubmit_without_blocking_admission() {
    let (mut c, _, _) = campaign();
    for (i, amount) in [15u128, 4, 12, 11].into_iter().enumerate() {
        c.contribute(&ctx(acct(i as u8 + 1), 1 + i as u64), units(amount))
            .unwrap();
    }
    c.contribute(&ctx(acct(9), 10), units(3)).unwrap();
    let avg = true_average(&c, 0);

    // Five batch slices: the 12-unit entry crosses the 20-unit boundary.
    c.submit_average(0, avg + 7).unwrap();
    let out = run_verification(&mut c, 0, 2);
    assert_eq!(
        out,
        StepOutcome::Rejected { processed: 1, submitted: avg + 7, computed: avg }
    );
    assert_eq!(c.period(0).unwrap().status(), PeriodStatus::Rejected);

    // Later periods keep admitting contributions.
    c.contribute(&ctx(acct(9), 11), units(2)).unwrap();
    assert_eq!(c.period(1).unwrap().entries().len(), 2);

    c.tick(20).unwrap();
    let avg1 = true_average(&c, 1);
    assert_eq!(
        c.submit_average(1, avg1),
        Err(CampaignError::PreviousPeriodUnverified(1))
    );

    c.submit_average(0, avg).unwrap();
    assert!(matches!(
        c.verify_step(0, 3).unwrap(),
        StepOutcome::Pending { processed: 3, cursor: 2, remaining: 2 }
    ));
    assert_eq!(
        c.verify_step(0, 3).unwrap(),
        StepOutcome::Verified { processed: 2, average: avg }
    );
    assert_eq!(c.period(0).unwrap().verified_average(), Some(avg));
    settle(&mut c, 1);
}

#[test]
fn submit_and_verify_resolves_small_periods_in_one_call() {
    let (mut c, _, _) = campaign();
    c.contribute(&ctx(acct(1), 1), units(30)).unwrap();
    c.tick(10).unwrap();
    let avg = true_average(&c, 0);
    assert_eq!(
        c.submit_and_verify(0, avg, 16).unwrap(),
        StepOutcome::Verified { processed: 2, average: avg }
    );
}

#[test]
fn single_large_contribution_verifies_in_bounded_calls() {
    let (mut c, _, _) = campaign_with(|cfg| {
        cfg.rate.decay_numerator = 999_999;
        cfg.rate.decay_denominator = 1_000_000;
        cfg.rate.batch_size = UNIT;
        cfg.max_verify_steps = 500;
    });
    c.contribute(&ctx(acct(1), 1), units(3_000)).unwrap();
    c.tick(10).unwrap();
    let avg = true_average(&c, 0);
    c.submit_average(0, avg).unwrap();

    let mut calls = 0;
    let out = loop {
        calls += 1;
        let out = c.verify_step(0, usize::MAX).unwrap();
        if let StepOutcome::Pending { processed, .. } = out {
            assert_eq!(processed, 500);
        } else {
            break out;
        }
    };
    assert_eq!(calls, 6);
    assert_eq!(out, StepOutcome::Verified { processed: 500, average: avg });
    assert_eq!(c.period(0).unwrap().verification_cursor(), 1);
}

#[test]
fn empty_period_verifies_at_spot_rate() {
    let (mut c, _, issuer) = campaign();
    c.contribute(&ctx(acct(1), 1), units(25)).unwrap();
    c.tick(10).unwrap();
    c.tick(20).unwrap();
    settle(&mut c, 0);

    let spot = c.curve().spot_rate(units(25)).unwrap();
    assert_eq!(spot, 99 * RATE_PRECISION);
    assert_eq!(settle(&mut c, 1), spot);
    assert!(matches!(
        c.collect(acct(1), 1),
        Err(CampaignError::NothingToCollect { .. })
    ));
    assert_eq!(issuer.balance_of(&acct(1)), 0);
}

// ---------------------------------------------------------------------------
// Admin and collection
// ---------------------------------------------------------------------------

#[test]
fn halt_resume_leaves_totals_untouched() {
    let (mut c, router, _) = campaign();
    c.contribute(&ctx(acct(1), 1), units(5)).unwrap();
    let before = *c.totals();

    c.halt(&ctx(admin(), 2)).unwrap();
    for block in 2..6 {
        assert_eq!(
            c.contribute(&ctx(acct(2), block), units(50)),
            Err(CampaignError::GateHalted)
        );
    }
    assert_eq!(c.totals(), &before);
    assert_eq!(router.payout_balance(), units(5));

    assert_eq!(
        c.resume(&ctx(acct(2), 6)),
        Err(CampaignError::Unauthorized(acct(2)))
    );
    c.resume(&ctx(admin(), 6)).unwrap();
    c.contribute(&ctx(acct(2), 7), units(5)).unwrap();
    assert_eq!(c.contribution_count(), 2);
}

#[test]
fn collection_is_once_per_period_and_contributor() {
    let (mut c, _, issuer) = campaign();
    c.contribute(&ctx(acct(1), 1), units(10)).unwrap();
    c.contribute(&ctx(acct(1), 10), units(20)).unwrap();
    c.tick(20).unwrap();

    assert_eq!(c.collect(acct(1), 0), Err(CampaignError::PeriodNotVerified(0)));
    settle(&mut c, 0);
    settle(&mut c, 1);

    let first = c.collect(acct(1), 0).unwrap();
    let second = c.collect(acct(1), 1).unwrap();
    assert_eq!(first, units(1_000));
    // Half of the second contribution falls into the 99-rate batch.
    assert_eq!(second, units(1_990));
    for period in [0, 1] {
        assert!(c.has_collected(&acct(1), period));
        assert!(matches!(
            c.collect(acct(1), period),
            Err(CampaignError::NothingToCollect { .. })
        ));
    }
    assert_eq!(issuer.balance_of(&acct(1)), first + second);
}

#[test]
fn periods_chain_over_long_campaign() {
    let (mut c, router, _) = campaign_with(|cfg| cfg.period_duration_blocks = 3);
    for block in 0..40u64 {
        let who = acct((block % 5) as u8 + 1);
        c.contribute(&ctx(who, block), units(1 + (block as u128 % 7)))
            .unwrap();
    }
    c.tick(100).unwrap();

    let periods = c.periods();
    for pair in periods.windows(2) {
        assert_eq!(pair[0].end_volume(), Some(pair[1].start_volume()));
    }
    let recorded: u128 = periods
        .iter()
        .flat_map(|p| p.entries())
        .map(|e| e.amount)
        .sum();
    assert_eq!(recorded, c.total_accepted());
    assert_eq!(router.payout_balance(), c.total_accepted());

    for index in 0..c.current_period_index() {
        settle(&mut c, index);
    }
    assert_eq!(c.total_accepted() % UNIT, 0);
}
