//! Urgency pricing tests.
//!
//! Tests cover: tier boundaries, the fixed ends of the rate card, schedule
//! validation, idempotence and total pay rounding.

use chrono::{TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use shiftdesk_core::{
    config::PolicyVersion,
    error::DeskError,
    pricing::{compute_rate, rate_for_days, total_pay, UrgencyTier},
    types::Timestamp,
};

fn posted() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn dollars(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[test]
fn same_day_shift_is_emergency_at_90() {
    let policy = PolicyVersion::standard();
    let quote = compute_rate(&policy, posted(), posted() + TimeDelta::hours(6)).unwrap();
    assert_eq!(quote.tier, UrgencyTier::Emergency);
    assert_eq!(quote.days_ahead, 0);
    assert_eq!(quote.hourly_rate, dollars(9000));
}

#[test]
fn starting_at_the_posting_instant_is_allowed() {
    let policy = PolicyVersion::standard();
    let quote = compute_rate(&policy, posted(), posted()).unwrap();
    assert_eq!(quote.tier, UrgencyTier::Emergency);
}

#[test]
fn partial_days_round_down() {
    let policy = PolicyVersion::standard();
    // 1 day 23 hours ahead is still "1 day ahead".
    let quote = compute_rate(&policy, posted(), posted() + TimeDelta::hours(47)).unwrap();
    assert_eq!(quote.days_ahead, 1);
    assert_eq!(quote.tier, UrgencyTier::VeryUrgent);
    assert_eq!(quote.hourly_rate, dollars(6500));
}

#[test]
fn fixed_tiers_match_the_rate_card() {
    let policy = PolicyVersion::standard();
    let expected = [
        (0, UrgencyTier::Emergency, 9000),
        (1, UrgencyTier::VeryUrgent, 6500),
        (2, UrgencyTier::Urgent, 6000),
        (3, UrgencyTier::ShortNotice, 6000),
        (4, UrgencyTier::ShortNotice, 5900),
        (5, UrgencyTier::Moderate, 5900),
        (10, UrgencyTier::Moderate, 5600),
        (11, UrgencyTier::Reasonable, 5500),
        (14, UrgencyTier::Reasonable, 5300),
        (15, UrgencyTier::Planned, 5000),
    ];
    for (days, tier, cents) in expected {
        let (got_tier, rate) = rate_for_days(&policy, days).unwrap();
        assert_eq!(got_tier, tier, "tier for {days} days");
        assert_eq!(rate, dollars(cents), "rate for {days} days");
    }
}

#[test]
fn anything_fifteen_days_out_is_planned_at_50() {
    let policy = PolicyVersion::standard();
    for days in [15, 16, 30, 90, 365, 3650] {
        let quote = compute_rate(&policy, posted(), posted() + TimeDelta::days(days)).unwrap();
        assert_eq!(quote.tier, UrgencyTier::Planned, "{days} days");
        assert_eq!(quote.hourly_rate, dollars(5000), "{days} days");
    }
}

#[test]
fn shift_before_posting_is_an_invalid_schedule() {
    let policy = PolicyVersion::standard();
    let err = compute_rate(&policy, posted(), posted() - TimeDelta::minutes(1)).unwrap_err();
    assert!(matches!(err, DeskError::InvalidSchedule { .. }), "got {err}");
}

#[test]
fn computing_twice_gives_the_same_quote() {
    let policy = PolicyVersion::standard();
    let start = posted() + TimeDelta::days(12) + TimeDelta::hours(3);
    let a = compute_rate(&policy, posted(), start).unwrap();
    let b = compute_rate(&policy, posted(), start).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.policy_version, policy.version);
}

#[test]
fn eight_hour_emergency_shift_pays_720() {
    let policy = PolicyVersion::standard();
    let quote = compute_rate(&policy, posted(), posted() + TimeDelta::hours(5)).unwrap();
    assert_eq!(quote.total_pay(Decimal::from(8)).unwrap(), dollars(72000));
}

#[test]
fn total_pay_uses_bankers_rounding() {
    // 50.00 * 7.125 = 356.25 exactly, no rounding needed
    assert_eq!(total_pay(dollars(5000), Decimal::new(7125, 3)).unwrap(), dollars(35625));
    // 54.33 * 0.5 = 27.165 -> 27.16 (round half to even)
    assert_eq!(total_pay(dollars(5433), Decimal::new(5, 1)).unwrap(), dollars(2716));
    // 58.40 * 0.3125 = 18.25 exactly
    assert_eq!(total_pay(dollars(5840), Decimal::new(3125, 4)).unwrap(), dollars(1825));
}
