//! Policy catalog tests.
//!
//! Tests cover: loading the shipped data/ catalog, boundary validation of
//! malformed tables, and version lookup.

use rust_decimal::Decimal;
use shiftdesk_core::{
    config::{Interpolation, PenaltyRule, PolicyCatalog, PolicyVersion, STANDARD_POLICY_VERSION},
    error::DeskError,
    pricing::{rate_for_days, UrgencyTier},
};

fn data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn shipped_catalog_loads_and_current_is_standard() {
    let catalog = PolicyCatalog::load(&data_dir()).expect("load data/ catalog");
    assert_eq!(catalog.current().version, STANDARD_POLICY_VERSION);
    assert_eq!(catalog.current(), &PolicyVersion::standard());
    assert!(catalog.versions().count() >= 2);
}

#[test]
fn legacy_version_stays_resolvable() {
    let catalog = PolicyCatalog::load(&data_dir()).unwrap();
    let legacy = catalog.get("2023-09").unwrap();
    assert_eq!(legacy.interpolation, Interpolation::LowerEndpoint);
    let (tier, rate) = rate_for_days(legacy, 3).unwrap();
    assert_eq!(tier, UrgencyTier::ShortNotice);
    assert_eq!(rate, Decimal::new(5700, 2));
}

#[test]
fn unknown_version_is_an_error() {
    let catalog = PolicyCatalog::standard();
    let err = catalog.get("1999-01").unwrap_err();
    assert!(matches!(err, DeskError::UnknownPolicyVersion { .. }));
}

#[test]
fn missing_data_dir_fails_to_load() {
    assert!(PolicyCatalog::load("/nonexistent/shiftdesk").is_err());
}

#[test]
fn rates_that_rise_with_lead_time_are_rejected() {
    let mut policy = PolicyVersion::standard();
    policy.version = "bad-rates".into();
    // planned pays more than reasonable
    policy.tiers[6].high_rate = Decimal::from(70);
    policy.tiers[6].low_rate = Decimal::from(70);
    let err = PolicyCatalog::from_versions("bad-rates", vec![policy]).unwrap_err();
    assert!(matches!(err, DeskError::InvalidPolicy { .. }), "got {err}");
}

#[test]
fn open_ended_tier_must_be_last() {
    let mut policy = PolicyVersion::standard();
    policy.tiers[5].max_days = None;
    assert!(policy.validate().is_err());
}

#[test]
fn penalty_bands_must_end_at_zero_hours() {
    let mut policy = PolicyVersion::standard();
    policy.employer_penalties.bands.pop();
    assert!(policy.validate().is_err());
}

#[test]
fn penalty_bands_must_descend() {
    let mut policy = PolicyVersion::standard();
    policy.pharmacist_penalties.bands.swap(1, 2);
    assert!(policy.validate().is_err());
}

#[test]
fn compensation_share_above_one_is_rejected() {
    let mut policy = PolicyVersion::standard();
    policy.employer_penalties.bands[2].rule = PenaltyRule::ShareOfPay {
        rate:               Decimal::new(50, 2),
        flat_fee:           Decimal::ZERO,
        compensation_share: Decimal::new(11, 1),
    };
    assert!(policy.validate().is_err());
}

#[test]
fn reputation_thresholds_must_ascend() {
    let mut policy = PolicyVersion::standard();
    policy.reputation.good_below = Decimal::new(1, 2);
    assert!(policy.validate().is_err());
}

#[test]
fn duplicate_versions_are_rejected() {
    let err = PolicyCatalog::from_versions(
        STANDARD_POLICY_VERSION,
        vec![PolicyVersion::standard(), PolicyVersion::standard()],
    )
    .unwrap_err();
    assert!(matches!(err, DeskError::InvalidPolicy { .. }));
}

#[test]
fn catalog_json_missing_fields_fails() {
    let err = PolicyCatalog::from_json(r#"{"current": "x", "versions": [{"version": "x"}]}"#)
        .unwrap_err();
    assert!(matches!(err, DeskError::Serialization(_)), "got {err}");
}
