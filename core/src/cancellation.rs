//! Cancellation penalties.
//!
//! A cancellation is priced by who cancelled and how much notice they gave.
//! The notice falls into the band with the highest threshold it meets, so a
//! value sitting exactly on a threshold gets the cheaper band.
//!
//! This module only computes amounts. Charging the payer and waiving a
//! penalty happen later, against the stored record.

use crate::{
    config::{PenaltyRule, PolicyVersion},
    error::{DeskError, DeskResult},
    types::{Money, Timestamp},
};
use chrono::TimeDelta;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Pharmacist,
    Employer,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Pharmacist => "pharmacist",
            ActorRole::Employer   => "employer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pharmacist" => Some(ActorRole::Pharmacist),
            "employer"   => Some(ActorRole::Employer),
            _            => None,
        }
    }

    /// The party compensated when this role cancels.
    pub fn counterparty(&self) -> ActorRole {
        match self {
            ActorRole::Pharmacist => ActorRole::Employer,
            ActorRole::Employer   => ActorRole::Pharmacist,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    #[default]
    Pending,
    Charged,
    Waived,
}

impl CancellationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationStatus::Pending => "pending",
            CancellationStatus::Charged => "charged",
            CancellationStatus::Waived  => "waived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CancellationStatus::Pending),
            "charged" => Some(CancellationStatus::Charged),
            "waived"  => Some(CancellationStatus::Waived),
            _         => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationInput {
    pub actor_role:   ActorRole,
    pub shift_start:  Timestamp,
    pub cancelled_at: Timestamp,
    /// Total scheduled pay for the shift.
    pub shift_pay:    Money,
}

impl CancellationInput {
    /// Notice given, negative when the shift had already started.
    pub fn notice(&self) -> TimeDelta {
        self.shift_start - self.cancelled_at
    }

    pub fn compute(&self, policy: &PolicyVersion) -> DeskResult<CancellationRecord> {
        compute_penalty(policy, self.actor_role, self.notice(), self.shift_pay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub actor_role:     ActorRole,
    pub policy_version: String,
    /// Whole hours of notice, rounded down.
    pub notice_hours:   i64,
    /// Charged to the cancelling party.
    pub penalty_total:  Money,
    /// Credited to the other party.
    pub counterparty_compensation: Money,
    /// Retained by the platform: `penalty_total - counterparty_compensation`.
    pub platform_fee:   Money,
    pub status:         CancellationStatus,
}

impl CancellationRecord {
    /// Whether there is still money to collect.
    pub fn is_due(&self) -> bool {
        self.status == CancellationStatus::Pending && self.penalty_total > Decimal::ZERO
    }

    /// Apply an approved waiver. Nothing is owed or credited afterwards.
    pub fn waive(&mut self) {
        self.status = CancellationStatus::Waived;
        self.clear_amounts();
    }

    /// Zero every amount, leaving the status alone. Used when there is no
    /// counterparty to compensate.
    pub fn clear_amounts(&mut self) {
        self.penalty_total = Decimal::ZERO;
        self.counterparty_compensation = Decimal::ZERO;
        self.platform_fee = Decimal::ZERO;
    }
}

fn to_cents(amount: Decimal) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Price a cancellation made `notice` before the shift starts.
pub fn compute_penalty(
    policy:     &PolicyVersion,
    actor_role: ActorRole,
    notice:     TimeDelta,
    shift_pay:  Money,
) -> DeskResult<CancellationRecord> {
    if notice < TimeDelta::zero() {
        return Err(DeskError::AlreadyStarted {
            minutes_late: (-notice).num_minutes(),
        });
    }

    let schedule = policy.schedule_for(actor_role);
    if schedule.uses_shift_pay() && shift_pay <= Decimal::ZERO {
        return Err(DeskError::InvalidShiftPay { shift_pay });
    }

    let band = schedule
        .bands
        .iter()
        .find(|b| TimeDelta::try_hours(b.min_notice_hours).is_some_and(|min| notice >= min))
        .ok_or_else(|| DeskError::InvalidPolicy {
            version: policy.version.clone(),
            reason:  format!("no {actor_role} penalty band covers {}h notice", notice.num_hours()),
        })?;

    let (penalty_total, counterparty_compensation) = match &band.rule {
        PenaltyRule::Flat { penalty, compensation } => (*penalty, *compensation),
        PenaltyRule::ShareOfPay { rate, flat_fee, compensation_share } => {
            let too_large = || DeskError::InvalidShiftPay { shift_pay };
            let pay_part = to_cents(shift_pay.checked_mul(*rate).ok_or_else(too_large)?);
            let penalty = pay_part.checked_add(*flat_fee).ok_or_else(too_large)?;
            let compensation = pay_part.checked_mul(*compensation_share).ok_or_else(too_large)?;
            (penalty, to_cents(compensation))
        }
    };

    let record = CancellationRecord {
        actor_role,
        policy_version: policy.version.clone(),
        notice_hours: notice.num_hours(),
        penalty_total,
        counterparty_compensation,
        platform_fee: penalty_total - counterparty_compensation,
        status: CancellationStatus::Pending,
    };

    log::debug!(
        "cancellation: {actor_role} gave {}h notice -> penalty ${} ({} band), {} gets ${}, fee ${}",
        record.notice_hours,
        record.penalty_total,
        band.min_notice_hours,
        actor_role.counterparty(),
        record.counterparty_compensation,
        record.platform_fee,
    );

    Ok(record)
}
