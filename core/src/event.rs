//! The desk event log.
//!
//! RULE: Every state change the engine makes is appended here, in the same
//! transaction as the change itself. Entries are never updated or removed.

use crate::{
    cancellation::ActorRole,
    pricing::UrgencyTier,
    types::{EntityId, Money, ShiftId, Timestamp, UserId},
};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended. Never remove or reorder them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    // ── Shift lifecycle ────────────────────────────
    ShiftPosted {
        shift_id:       ShiftId,
        employer_id:    UserId,
        tier:           UrgencyTier,
        hourly_rate:    Money,
        total_pay:      Money,
        policy_version: String,
    },
    PharmacistAssigned {
        shift_id:      ShiftId,
        pharmacist_id: UserId,
    },
    ShiftCompleted {
        shift_id: ShiftId,
    },

    // ── Cancellations ──────────────────────────────
    ShiftCancelled {
        shift_id:        ShiftId,
        cancellation_id: EntityId,
        actor_role:      ActorRole,
        penalty_total:   Money,
    },
    CancellationWaived {
        cancellation_id: EntityId,
    },
    CancellationCharged {
        cancellation_id: EntityId,
        amount:          Money,
        reference:       String,
    },
    SettlementDeferred {
        cancellation_id: EntityId,
        reason:          String,
    },
}

impl DeskEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            DeskEvent::ShiftPosted { .. }         => "shift_posted",
            DeskEvent::PharmacistAssigned { .. }  => "pharmacist_assigned",
            DeskEvent::ShiftCompleted { .. }      => "shift_completed",
            DeskEvent::ShiftCancelled { .. }      => "shift_cancelled",
            DeskEvent::CancellationWaived { .. }  => "cancellation_waived",
            DeskEvent::CancellationCharged { .. } => "cancellation_charged",
            DeskEvent::SettlementDeferred { .. }  => "settlement_deferred",
        }
    }

    /// The shift or cancellation the event is about.
    pub fn subject_id(&self) -> &str {
        match self {
            DeskEvent::ShiftPosted { shift_id, .. }
            | DeskEvent::PharmacistAssigned { shift_id, .. }
            | DeskEvent::ShiftCompleted { shift_id }
            | DeskEvent::ShiftCancelled { shift_id, .. } => shift_id,
            DeskEvent::CancellationWaived { cancellation_id }
            | DeskEvent::CancellationCharged { cancellation_id, .. }
            | DeskEvent::SettlementDeferred { cancellation_id, .. } => cancellation_id,
        }
    }
}

/// A persisted event log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:          Option<i64>,
    pub subject_id:  EntityId,
    pub event_type:  String,
    pub payload:     String,
    pub recorded_at: Timestamp,
}

impl EventLogEntry {
    pub fn from_event(event: &DeskEvent, recorded_at: Timestamp) -> serde_json::Result<Self> {
        Ok(Self {
            id:          None,
            subject_id:  event.subject_id().to_string(),
            event_type:  event.type_name().to_string(),
            payload:     serde_json::to_string(event)?,
            recorded_at,
        })
    }

    pub fn decode(&self) -> serde_json::Result<DeskEvent> {
        serde_json::from_str(&self.payload)
    }
}
