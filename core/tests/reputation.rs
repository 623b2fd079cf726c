//! Reputation band tests.
//!
//! Tests cover: band boundaries, the empty history, waived cancellations,
//! and standing labels.

use rust_decimal::Decimal;
use shiftdesk_core::{
    cancellation::{ActorRole, CancellationRecord, CancellationStatus},
    config::ReputationThresholds,
    reputation::{band_for, cancellation_rate, ReputationBand, ReputationSummary},
};

fn band(completed: u64, cancellations: u64) -> ReputationBand {
    band_for(&ReputationThresholds::standard(), completed, cancellations)
}

/// A rate of exactly 2% is the first rate that is no longer excellent.
#[test]
fn two_percent_is_good_not_excellent() {
    assert_eq!(cancellation_rate(98, 2), Decimal::new(2, 2));
    assert_eq!(band(98, 2), ReputationBand::Good);
    assert_eq!(band(99, 1), ReputationBand::Excellent);
}

#[test]
fn band_boundaries() {
    assert_eq!(band(95, 5), ReputationBand::Fair);
    assert_eq!(band(96, 4), ReputationBand::Good);
    assert_eq!(band(90, 10), ReputationBand::Poor);
    assert_eq!(band(91, 9), ReputationBand::Fair);
    // 15% exactly is still poor; anything above goes to review.
    assert_eq!(band(85, 15), ReputationBand::Poor);
    assert_eq!(band(84, 16), ReputationBand::Review);
    assert_eq!(band(0, 3), ReputationBand::Review);
}

#[test]
fn no_history_is_excellent() {
    assert_eq!(cancellation_rate(0, 0), Decimal::ZERO);
    assert_eq!(band(0, 0), ReputationBand::Excellent);
}

#[test]
fn bands_worsen_as_cancellations_grow() {
    let mut previous = ReputationBand::Excellent;
    for cancellations in 0..=100 {
        let current = band(100 - cancellations, cancellations);
        assert!(current >= previous, "band improved at {cancellations} cancellations");
        previous = current;
    }
    assert_eq!(previous, ReputationBand::Review);
}

#[test]
fn waived_cancellations_do_not_count() {
    let record = |status| CancellationRecord {
        actor_role:     ActorRole::Pharmacist,
        policy_version: "2024-01".into(),
        notice_hours:   10,
        penalty_total:  Decimal::from(300),
        counterparty_compensation: Decimal::from(200),
        platform_fee:   Decimal::from(100),
        status,
    };
    let records = vec![
        record(CancellationStatus::Charged),
        record(CancellationStatus::Waived),
        record(CancellationStatus::Waived),
        record(CancellationStatus::Pending),
    ];
    let summary = ReputationSummary::from_records(&ReputationThresholds::standard(), 38, &records);
    assert_eq!(summary.cancellations, 2);
    assert_eq!(summary.rate, Decimal::new(5, 2));
    assert_eq!(summary.band, ReputationBand::Fair);
}

#[test]
fn standing_labels() {
    assert_eq!(ReputationBand::Excellent.standing_label(), "Excellent standing");
    assert_eq!(ReputationBand::Review.standing_label(), "Under review");
}
