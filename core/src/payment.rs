//! Payment collaborator seam.
//!
//! The desk never talks to a card processor itself. Settlement hands the
//! amount and payer to a `PaymentGateway` and records what came back.

use crate::types::{EntityId, Money};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChargeOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

/// Card-on-file charging, implemented outside this crate.
pub trait PaymentGateway {
    /// Whether the payer has a usable payment method on file.
    fn has_valid_method(&self, payer_id: &str) -> bool;

    /// Charge `amount` to the payer. `idempotency_key` is stable across
    /// retries of the same settlement.
    fn charge(
        &mut self,
        payer_id:        &str,
        amount:          Money,
        idempotency_key: &str,
    ) -> anyhow::Result<ChargeOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "settlement", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Zero penalty, already charged, or waived.
    NothingDue,
    /// No valid card on file. The record stays pending.
    MissingPaymentMethod { payer_id: EntityId },
    /// The processor refused. The record stays pending.
    Declined { reason: String },
    Charged { amount: Money, reference: String },
}
