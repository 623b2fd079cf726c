use crate::{
    cancellation::{compute_penalty, ActorRole, CancellationRecord},
    engine::{CancelRequest, DeskEngine, NewShift},
    error::{DeskError, DeskResult},
    pricing::RateQuote,
    reputation::{band_for, cancellation_rate, ReputationBand, ReputationSummary},
    store::{ShiftRecord, StoredCancellation},
    types::{EntityId, Money, ShiftId, Timestamp, UserId},
};
use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commands accepted by the runner's JSON-lines interface.
/// Variants are only ever appended. Never remove or reorder them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DeskCommand {
    // ── Pure calculations ─────────────────────────
    Quote {
        posted_at:   Timestamp,
        shift_start: Timestamp,
        #[serde(default)]
        total_hours: Option<Decimal>,
    },
    Penalty {
        actor_role:   ActorRole,
        hours_before: i64,
        #[serde(default)]
        shift_pay:    Money,
    },
    Band {
        completed:     u64,
        cancellations: u64,
    },

    // ── Stored workflows ──────────────────────────
    PostShift(NewShift),
    AssignPharmacist {
        shift_id:      ShiftId,
        pharmacist_id: UserId,
    },
    CompleteShift {
        shift_id: ShiftId,
    },
    CancelShift(CancelRequest),
    WaiveCancellation {
        cancellation_id: EntityId,
    },
    Reputation {
        user_id: UserId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum DeskReply {
    Quote {
        quote:     RateQuote,
        total_pay: Option<Money>,
    },
    Penalty {
        record: CancellationRecord,
    },
    Band {
        rate:  Decimal,
        band:  ReputationBand,
        label: String,
    },
    Shift {
        shift: ShiftRecord,
    },
    Cancellation {
        cancellation: StoredCancellation,
    },
    Reputation {
        summary: ReputationSummary,
    },
}

impl DeskCommand {
    pub fn execute(self, engine: &DeskEngine) -> DeskResult<DeskReply> {
        let policy = engine.catalog().current();
        let reply = match self {
            DeskCommand::Quote { posted_at, shift_start, total_hours } => {
                let quote = engine.quote(posted_at, shift_start)?;
                let total_pay = total_hours.map(|h| quote.total_pay(h)).transpose()?;
                DeskReply::Quote { quote, total_pay }
            }
            DeskCommand::Penalty { actor_role, hours_before, shift_pay } => {
                let notice = TimeDelta::try_hours(hours_before)
                    .ok_or(DeskError::InvalidNotice { hours_before })?;
                DeskReply::Penalty {
                    record: compute_penalty(policy, actor_role, notice, shift_pay)?,
                }
            }
            DeskCommand::Band { completed, cancellations } => {
                let band = band_for(&policy.reputation, completed, cancellations);
                DeskReply::Band {
                    rate: cancellation_rate(completed, cancellations),
                    band,
                    label: band.standing_label().to_string(),
                }
            }
            DeskCommand::PostShift(new) => DeskReply::Shift { shift: engine.post_shift(new)? },
            DeskCommand::AssignPharmacist { shift_id, pharmacist_id } => DeskReply::Shift {
                shift: engine.assign_pharmacist(&shift_id, &pharmacist_id)?,
            },
            DeskCommand::CompleteShift { shift_id } => DeskReply::Shift {
                shift: engine.complete_shift(&shift_id)?,
            },
            DeskCommand::CancelShift(req) => DeskReply::Cancellation {
                cancellation: engine.cancel_shift(req)?,
            },
            DeskCommand::WaiveCancellation { cancellation_id } => DeskReply::Cancellation {
                cancellation: engine.waive_cancellation(&cancellation_id)?,
            },
            DeskCommand::Reputation { user_id } => DeskReply::Reputation {
                summary: engine.reputation(&user_id)?,
            },
        };
        Ok(reply)
    }
}
