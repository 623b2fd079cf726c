//! The desk engine: posting, staffing, cancelling and settling shifts.
//!
//! RULES:
//!   - A shift's rate is computed once, when it is first posted, and locked.
//!   - A cancellation is priced under the policy version its shift was
//!     locked with, never the catalog's current one.
//!   - Calculators never touch the store. The engine persists their results.
//!   - Every state change and its event are written in one transaction.
//!     A failed operation leaves nothing behind.

use crate::{
    cancellation::{ActorRole, CancellationInput, CancellationRecord, CancellationStatus},
    config::PolicyCatalog,
    error::{DeskError, DeskResult},
    event::{DeskEvent, EventLogEntry},
    payment::{ChargeOutcome, PaymentGateway, SettlementOutcome},
    pricing::{compute_rate, RateQuote},
    reputation::ReputationSummary,
    store::{DeskStore, ShiftRecord, ShiftStatus, StoredCancellation},
    types::{ShiftId, Timestamp, UserId},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShift {
    /// Supplied by callers that need posting to be retry-safe.
    #[serde(default)]
    pub shift_id:    Option<ShiftId>,
    pub employer_id: UserId,
    pub posted_at:   Timestamp,
    pub shift_start: Timestamp,
    pub total_hours: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Idempotency key. Retries must reuse it.
    pub request_id:   String,
    pub shift_id:     ShiftId,
    pub actor_id:     UserId,
    pub cancelled_at: Timestamp,
}

pub struct DeskEngine {
    catalog: PolicyCatalog,
    store:   DeskStore,
}

impl DeskEngine {
    /// `store` must already be migrated.
    pub fn new(catalog: PolicyCatalog, store: DeskStore) -> Self {
        Self { catalog, store }
    }

    /// Engine over a fresh in-memory store and the built-in policy.
    pub fn build_test() -> DeskResult<Self> {
        let store = DeskStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(PolicyCatalog::standard(), store))
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &DeskStore {
        &self.store
    }

    /// Price a prospective shift under the current policy without storing it.
    pub fn quote(&self, posted_at: Timestamp, shift_start: Timestamp) -> DeskResult<RateQuote> {
        compute_rate(self.catalog.current(), posted_at, shift_start)
    }

    // ── Shift lifecycle ────────────────────────────────────────

    /// Post a shift and lock its rate. Posting an id that already exists
    /// returns the stored shift unchanged.
    pub fn post_shift(&self, new: NewShift) -> DeskResult<ShiftRecord> {
        if new.total_hours <= Decimal::ZERO {
            return Err(DeskError::InvalidShiftHours { total_hours: new.total_hours });
        }
        if let Some(id) = &new.shift_id {
            if let Some(existing) = self.store.get_shift(id)? {
                log::info!("shift {id}: already posted, keeping locked rate ${}", existing.hourly_rate);
                return Ok(existing);
            }
        }

        let quote = self.quote(new.posted_at, new.shift_start)?;
        let shift = ShiftRecord {
            shift_id:       new.shift_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            employer_id:    new.employer_id,
            pharmacist_id:  None,
            posted_at:      new.posted_at,
            shift_start:    new.shift_start,
            total_hours:    new.total_hours,
            hourly_rate:    quote.hourly_rate,
            tier:           quote.tier,
            total_pay:      quote.total_pay(new.total_hours)?,
            policy_version: quote.policy_version.clone(),
            status:         ShiftStatus::Open,
        };

        let inserted = self.store.in_transaction(|store| {
            let inserted = store.insert_shift_if_absent(&shift)?;
            if inserted {
                record_event(store, &DeskEvent::ShiftPosted {
                    shift_id:       shift.shift_id.clone(),
                    employer_id:    shift.employer_id.clone(),
                    tier:           shift.tier,
                    hourly_rate:    shift.hourly_rate,
                    total_pay:      shift.total_pay,
                    policy_version: shift.policy_version.clone(),
                })?;
            }
            Ok(inserted)
        })?;

        if !inserted {
            log::warn!("shift {}: concurrent post won, using its rate", shift.shift_id);
            return self.require_shift(&shift.shift_id);
        }

        log::info!(
            "shift {}: posted {} days ahead, {} ${}/h, total ${}",
            shift.shift_id,
            quote.days_ahead,
            shift.tier,
            shift.hourly_rate,
            shift.total_pay
        );
        Ok(shift)
    }

    pub fn assign_pharmacist(&self, shift_id: &str, pharmacist_id: &str) -> DeskResult<ShiftRecord> {
        let shift = self.require_shift(shift_id)?;
        check_transition(&shift, ShiftStatus::Assigned)?;

        self.store.in_transaction(|store| {
            if !store.assign_shift(shift_id, pharmacist_id)? {
                return Err(stale_transition(&shift, ShiftStatus::Assigned));
            }
            record_event(store, &DeskEvent::PharmacistAssigned {
                shift_id:      shift_id.to_string(),
                pharmacist_id: pharmacist_id.to_string(),
            })
        })?;

        log::info!("shift {shift_id}: assigned to {pharmacist_id}");
        self.require_shift(shift_id)
    }

    pub fn complete_shift(&self, shift_id: &str) -> DeskResult<ShiftRecord> {
        let shift = self.require_shift(shift_id)?;
        check_transition(&shift, ShiftStatus::Completed)?;

        self.store.in_transaction(|store| {
            if !store.update_shift_status(shift_id, shift.status, ShiftStatus::Completed)? {
                return Err(stale_transition(&shift, ShiftStatus::Completed));
            }
            record_event(store, &DeskEvent::ShiftCompleted { shift_id: shift_id.to_string() })
        })?;

        log::info!("shift {shift_id}: completed");
        self.require_shift(shift_id)
    }

    // ── Cancellations ──────────────────────────────────────────

    /// Cancel a shift and record the penalty. Retrying with the same
    /// `request_id` returns the original record without charging again.
    /// An employer withdrawing a shift no pharmacist has taken owes nothing.
    pub fn cancel_shift(&self, req: CancelRequest) -> DeskResult<StoredCancellation> {
        if let Some(existing) = self.store.cancellation_by_request(&req.request_id)? {
            if existing.shift_id != req.shift_id || existing.actor_id != req.actor_id {
                log::warn!(
                    "cancellation request {}: reused for shift {} by {}",
                    req.request_id,
                    req.shift_id,
                    req.actor_id
                );
                return Err(DeskError::RequestConflict { request_id: req.request_id });
            }
            log::info!(
                "cancellation request {}: already recorded as {}",
                req.request_id,
                existing.cancellation_id
            );
            return Ok(existing);
        }

        let shift = self.require_shift(&req.shift_id)?;
        let actor_role = role_of(&shift, &req.actor_id)?;
        check_transition(&shift, ShiftStatus::Cancelled)?;

        let policy = self.catalog.get(&shift.policy_version)?;
        let mut record = CancellationInput {
            actor_role,
            shift_start:  shift.shift_start,
            cancelled_at: req.cancelled_at,
            shift_pay:    shift.total_pay,
        }
        .compute(policy)
        .inspect_err(|e| log::warn!("shift {}: cancellation rejected: {e}", shift.shift_id))?;
        if shift.pharmacist_id.is_none() {
            log::info!("shift {}: withdrawn before anyone took it, no penalty", shift.shift_id);
            record.clear_amounts();
        }

        let candidate = StoredCancellation {
            cancellation_id: Uuid::new_v4().to_string(),
            request_id:      req.request_id,
            shift_id:        shift.shift_id.clone(),
            actor_id:        req.actor_id,
            cancelled_at:    req.cancelled_at,
            record,
        };

        let stored = self.store.in_transaction(|store| {
            let (stored, inserted) = store.insert_cancellation_if_absent(&candidate)?;
            if !inserted && stored.request_id != candidate.request_id {
                return Err(stale_transition(&shift, ShiftStatus::Cancelled));
            }
            if !inserted && stored.shift_id != candidate.shift_id {
                return Err(DeskError::RequestConflict { request_id: candidate.request_id.clone() });
            }
            if inserted {
                if !store.update_shift_status(&shift.shift_id, shift.status, ShiftStatus::Cancelled)? {
                    return Err(stale_transition(&shift, ShiftStatus::Cancelled));
                }
                record_event(store, &DeskEvent::ShiftCancelled {
                    shift_id:        shift.shift_id.clone(),
                    cancellation_id: stored.cancellation_id.clone(),
                    actor_role,
                    penalty_total:   stored.record.penalty_total,
                })?;
            }
            Ok(stored)
        })?;

        log::info!(
            "shift {}: cancelled by {actor_role} {} with {}h notice, penalty ${}",
            shift.shift_id,
            stored.actor_id,
            stored.record.notice_hours,
            stored.record.penalty_total
        );
        Ok(stored)
    }

    /// Apply an approved waiver. Waiving twice is a no-op.
    pub fn waive_cancellation(&self, cancellation_id: &str) -> DeskResult<StoredCancellation> {
        let existing = self.require_cancellation(cancellation_id)?;
        match existing.record.status {
            CancellationStatus::Waived => return Ok(existing),
            CancellationStatus::Charged => {
                return Err(DeskError::InvalidTransition {
                    entity_id: cancellation_id.to_string(),
                    from:      CancellationStatus::Charged.as_str().into(),
                    to:        CancellationStatus::Waived.as_str().into(),
                })
            }
            CancellationStatus::Pending => {}
        }

        self.store.in_transaction(|store| {
            if !store.waive_cancellation(cancellation_id)? {
                return Err(DeskError::InvalidTransition {
                    entity_id: cancellation_id.to_string(),
                    from:      "a settled state".into(),
                    to:        CancellationStatus::Waived.as_str().into(),
                });
            }
            record_event(store, &DeskEvent::CancellationWaived {
                cancellation_id: cancellation_id.to_string(),
            })
        })?;

        log::info!(
            "cancellation {cancellation_id}: waived ${} penalty",
            existing.record.penalty_total
        );
        self.require_cancellation(cancellation_id)
    }

    /// Collect a pending penalty from the cancelling party through `gateway`.
    /// Without a valid payment method on file nothing is charged and the
    /// record stays pending.
    pub fn settle_cancellation(
        &self,
        cancellation_id: &str,
        gateway: &mut dyn PaymentGateway,
    ) -> DeskResult<SettlementOutcome> {
        let c = self.require_cancellation(cancellation_id)?;
        if !c.record.is_due() {
            return Ok(SettlementOutcome::NothingDue);
        }

        if !gateway.has_valid_method(&c.actor_id) {
            log::warn!(
                "cancellation {cancellation_id}: {} has no valid payment method, penalty left pending",
                c.actor_id
            );
            self.defer_settlement(cancellation_id, "missing payment method")?;
            return Ok(SettlementOutcome::MissingPaymentMethod { payer_id: c.actor_id });
        }

        let amount = c.record.penalty_total;
        match gateway.charge(&c.actor_id, amount, &c.cancellation_id)? {
            ChargeOutcome::Approved { reference } => {
                // An approved charge is always logged, pending or not.
                let marked = self.store.in_transaction(|store| {
                    let marked = store.mark_cancellation_charged(cancellation_id)?;
                    record_event(store, &DeskEvent::CancellationCharged {
                        cancellation_id: cancellation_id.to_string(),
                        amount,
                        reference: reference.clone(),
                    })?;
                    Ok(marked)
                })?;
                if !marked {
                    let now = self.require_cancellation(cancellation_id)?;
                    log::warn!(
                        "cancellation {cancellation_id}: charged ${amount} ({reference}) but it is {}",
                        now.record.status.as_str()
                    );
                    return Err(DeskError::ChargeConflict {
                        cancellation_id: cancellation_id.to_string(),
                        status:          now.record.status.as_str().into(),
                        reference,
                    });
                }
                log::info!("cancellation {cancellation_id}: charged ${amount} ({reference})");
                Ok(SettlementOutcome::Charged { amount, reference })
            }
            ChargeOutcome::Declined { reason } => {
                log::warn!("cancellation {cancellation_id}: charge declined: {reason}");
                self.defer_settlement(cancellation_id, &reason)?;
                Ok(SettlementOutcome::Declined { reason })
            }
        }
    }

    fn defer_settlement(&self, cancellation_id: &str, reason: &str) -> DeskResult<()> {
        self.store.in_transaction(|store| {
            record_event(store, &DeskEvent::SettlementDeferred {
                cancellation_id: cancellation_id.to_string(),
                reason:          reason.to_string(),
            })
        })
    }

    // ── Reads ──────────────────────────────────────────────────

    /// Reputation under the current policy's thresholds.
    pub fn reputation(&self, user_id: &str) -> DeskResult<ReputationSummary> {
        let completed = self.store.completed_shift_count(user_id)?;
        let records: Vec<CancellationRecord> = self
            .store
            .cancellations_by_actor(user_id)?
            .into_iter()
            .map(|c| c.record)
            .collect();
        Ok(ReputationSummary::from_records(
            &self.catalog.current().reputation,
            completed,
            &records,
        ))
    }

    /// Decoded event history of a shift or cancellation, oldest first.
    pub fn events_for(&self, subject_id: &str) -> DeskResult<Vec<DeskEvent>> {
        self.store
            .events_for_subject(subject_id)?
            .iter()
            .map(|e| e.decode().map_err(DeskError::from))
            .collect()
    }

    pub fn require_shift(&self, shift_id: &str) -> DeskResult<ShiftRecord> {
        self.store
            .get_shift(shift_id)?
            .ok_or_else(|| DeskError::ShiftNotFound { shift_id: shift_id.to_string() })
    }

    pub fn require_cancellation(&self, cancellation_id: &str) -> DeskResult<StoredCancellation> {
        self.store
            .get_cancellation(cancellation_id)?
            .ok_or_else(|| DeskError::CancellationNotFound {
                cancellation_id: cancellation_id.to_string(),
            })
    }
}

fn record_event(store: &DeskStore, event: &DeskEvent) -> DeskResult<()> {
    let entry = EventLogEntry::from_event(event, Utc::now())?;
    store.append_event(&entry)
}

fn role_of(shift: &ShiftRecord, actor_id: &str) -> DeskResult<ActorRole> {
    if shift.employer_id == actor_id {
        Ok(ActorRole::Employer)
    } else if shift.pharmacist_id.as_deref() == Some(actor_id) {
        Ok(ActorRole::Pharmacist)
    } else {
        Err(DeskError::NotAParty {
            shift_id: shift.shift_id.clone(),
            actor_id: actor_id.to_string(),
        })
    }
}

fn check_transition(shift: &ShiftRecord, to: ShiftStatus) -> DeskResult<()> {
    if shift.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(stale_transition(shift, to))
    }
}

fn stale_transition(shift: &ShiftRecord, to: ShiftStatus) -> DeskError {
    DeskError::InvalidTransition {
        entity_id: shift.shift_id.clone(),
        from:      shift.status.to_string(),
        to:        to.to_string(),
    }
}
