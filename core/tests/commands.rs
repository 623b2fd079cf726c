//! JSON command tests.
//!
//! Tests cover: parsing the runner's command lines, executing them against
//! an engine, and the shape of the replies written back.

use rust_decimal::Decimal;
use serde_json::json;
use shiftdesk_core::{
    command::{DeskCommand, DeskReply},
    engine::DeskEngine,
    error::DeskError,
    pricing::UrgencyTier,
    reputation::ReputationBand,
};

fn run(engine: &DeskEngine, line: serde_json::Value) -> Result<DeskReply, DeskError> {
    let cmd: DeskCommand = serde_json::from_value(line).expect("command parses");
    cmd.execute(engine)
}

#[test]
fn quote_with_hours_reports_total_pay() {
    let engine = DeskEngine::build_test().unwrap();
    let reply = run(&engine, json!({
        "cmd": "quote",
        "posted_at": "2024-03-01T08:00:00Z",
        "shift_start": "2024-03-01T18:00:00Z",
        "total_hours": "8"
    }))
    .unwrap();

    match reply {
        DeskReply::Quote { quote, total_pay } => {
            assert_eq!(quote.tier, UrgencyTier::Emergency);
            assert_eq!(total_pay, Some(Decimal::from(720)));
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn quote_reply_serializes_with_tag() {
    let engine = DeskEngine::build_test().unwrap();
    let reply = run(&engine, json!({
        "cmd": "quote",
        "posted_at": "2024-03-01T09:00:00Z",
        "shift_start": "2024-03-21T09:00:00Z"
    }))
    .unwrap();

    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["reply"], "quote");
    assert_eq!(value["quote"]["tier"], "planned");
    assert_eq!(value["quote"]["days_ahead"], 20);
    assert!(value["total_pay"].is_null());
}

#[test]
fn penalty_command_prices_without_storing() {
    let engine = DeskEngine::build_test().unwrap();
    let reply = run(&engine, json!({
        "cmd": "penalty",
        "actor_role": "pharmacist",
        "hours_before": 30
    }))
    .unwrap();

    match reply {
        DeskReply::Penalty { record } => {
            assert_eq!(record.penalty_total, Decimal::from(150));
            assert_eq!(record.platform_fee, Decimal::from(70));
        }
        other => panic!("unexpected reply {other:?}"),
    }
    assert_eq!(engine.store().event_count().unwrap(), 0);
}

#[test]
fn employer_penalty_without_pay_is_an_error() {
    let engine = DeskEngine::build_test().unwrap();
    let err = run(&engine, json!({
        "cmd": "penalty",
        "actor_role": "employer",
        "hours_before": 30
    }))
    .unwrap_err();
    assert!(matches!(err, DeskError::InvalidShiftPay { .. }), "got {err}");
}

#[test]
fn out_of_range_notice_is_an_error_not_a_crash() {
    let engine = DeskEngine::build_test().unwrap();
    for hours_before in [i64::MAX, i64::MIN] {
        let err = run(&engine, json!({
            "cmd": "penalty",
            "actor_role": "pharmacist",
            "hours_before": hours_before
        }))
        .unwrap_err();
        assert!(matches!(err, DeskError::InvalidNotice { .. }), "got {err}");
    }
}

#[test]
fn oversized_pay_is_an_error_not_a_crash() {
    let engine = DeskEngine::build_test().unwrap();
    let err = run(&engine, json!({
        "cmd": "quote",
        "posted_at": "2024-03-01T08:00:00Z",
        "shift_start": "2024-03-01T18:00:00Z",
        "total_hours": "79000000000000000000000000000"
    }))
    .unwrap_err();
    assert!(matches!(err, DeskError::InvalidShiftHours { .. }), "got {err}");

    let err = run(&engine, json!({
        "cmd": "penalty",
        "actor_role": "employer",
        "hours_before": 5,
        "shift_pay": "79228162514264337593543950335"
    }))
    .unwrap_err();
    assert!(matches!(err, DeskError::InvalidShiftPay { .. }), "got {err}");
}

#[test]
fn band_command_includes_the_label() {
    let engine = DeskEngine::build_test().unwrap();
    let reply = run(&engine, json!({ "cmd": "band", "completed": 98, "cancellations": 2 })).unwrap();
    match reply {
        DeskReply::Band { rate, band, label } => {
            assert_eq!(rate, Decimal::new(2, 2));
            assert_eq!(band, ReputationBand::Good);
            assert_eq!(label, band.standing_label());
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn stored_workflow_through_commands() {
    let engine = DeskEngine::build_test().unwrap();
    run(&engine, json!({
        "cmd": "post_shift",
        "shift_id": "s-1",
        "employer_id": "emp-1",
        "posted_at": "2024-03-01T09:00:00Z",
        "shift_start": "2024-03-21T09:00:00Z",
        "total_hours": "8"
    }))
    .unwrap();
    run(&engine, json!({ "cmd": "assign_pharmacist", "shift_id": "s-1", "pharmacist_id": "rph-1" }))
        .unwrap();

    let reply = run(&engine, json!({
        "cmd": "cancel_shift",
        "request_id": "req-1",
        "shift_id": "s-1",
        "actor_id": "rph-1",
        "cancelled_at": "2024-03-20T03:00:00Z"
    }))
    .unwrap();
    let cancellation_id = match reply {
        DeskReply::Cancellation { cancellation } => {
            assert_eq!(cancellation.record.penalty_total, Decimal::from(150));
            cancellation.cancellation_id
        }
        other => panic!("unexpected reply {other:?}"),
    };

    let reply = run(&engine, json!({ "cmd": "waive_cancellation", "cancellation_id": cancellation_id }))
        .unwrap();
    match reply {
        DeskReply::Cancellation { cancellation } => {
            assert_eq!(cancellation.record.penalty_total, Decimal::ZERO);
        }
        other => panic!("unexpected reply {other:?}"),
    }

    match run(&engine, json!({ "cmd": "reputation", "user_id": "rph-1" })).unwrap() {
        DeskReply::Reputation { summary } => {
            assert_eq!(summary.cancellations, 0);
            assert_eq!(summary.band, ReputationBand::Excellent);
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn unknown_command_does_not_parse() {
    let parsed = serde_json::from_value::<DeskCommand>(json!({ "cmd": "refund", "shift_id": "s-1" }));
    assert!(parsed.is_err());
}
