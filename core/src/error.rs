use crate::types::{Money, Timestamp};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Invalid schedule: shift starts at {shift_start} but was posted at {posted_at}")]
    InvalidSchedule {
        posted_at:   Timestamp,
        shift_start: Timestamp,
    },

    #[error("Cannot cancel a shift that already started ({minutes_late} min ago)")]
    AlreadyStarted { minutes_late: i64 },

    #[error("Shift pay must be positive and payable for a pay-based penalty, got ${shift_pay}")]
    InvalidShiftPay { shift_pay: Money },

    #[error("Shift hours must be positive and payable, got {total_hours}")]
    InvalidShiftHours { total_hours: Decimal },

    #[error("Notice of {hours_before}h is out of range")]
    InvalidNotice { hours_before: i64 },

    #[error("Invalid policy '{version}': {reason}")]
    InvalidPolicy { version: String, reason: String },

    #[error("Policy version '{version}' not found")]
    UnknownPolicyVersion { version: String },

    #[error("Shift '{shift_id}' not found")]
    ShiftNotFound { shift_id: String },

    #[error("Cancellation '{cancellation_id}' not found")]
    CancellationNotFound { cancellation_id: String },

    #[error("'{entity_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        entity_id: String,
        from:      String,
        to:        String,
    },

    #[error("'{actor_id}' is not a party to shift '{shift_id}'")]
    NotAParty { shift_id: String, actor_id: String },

    #[error("Request '{request_id}' was already used for another cancellation")]
    RequestConflict { request_id: String },

    #[error("Cancellation '{cancellation_id}' was charged ({reference}) while {status}")]
    ChargeConflict {
        cancellation_id: String,
        status:          String,
        reference:       String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DeskResult<T> = Result<T, DeskError>;
