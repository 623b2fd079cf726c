//! Reputation bands, derived from the share of shifts a user cancelled.
//!
//! Nothing here is stored. The band is recomputed from counts on every read.

use crate::{
    cancellation::{CancellationRecord, CancellationStatus},
    config::ReputationThresholds,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReputationBand {
    Excellent,
    Good,
    Fair,
    Poor,
    Review,
}

impl ReputationBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationBand::Excellent => "excellent",
            ReputationBand::Good      => "good",
            ReputationBand::Fair      => "fair",
            ReputationBand::Poor      => "poor",
            ReputationBand::Review    => "review",
        }
    }

    /// Account-standing label shown next to a profile.
    pub fn standing_label(&self) -> &'static str {
        match self {
            ReputationBand::Excellent => "Excellent standing",
            ReputationBand::Good      => "Good standing",
            ReputationBand::Fair      => "Fair standing",
            ReputationBand::Poor      => "Poor standing",
            ReputationBand::Review    => "Under review",
        }
    }
}

impl fmt::Display for ReputationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn denominator(completed: u64, cancellations: u64) -> Decimal {
    Decimal::from(completed.saturating_add(cancellations).max(1))
}

/// `cancellations / max(1, completed + cancellations)`.
pub fn cancellation_rate(completed: u64, cancellations: u64) -> Decimal {
    Decimal::from(cancellations) / denominator(completed, cancellations)
}

/// Band for a user with the given history.
///
/// Comparisons are done as `cancellations < threshold × total` so that
/// boundary rates such as exactly 2% are never subject to division error.
pub fn band_for(thresholds: &ReputationThresholds, completed: u64, cancellations: u64) -> ReputationBand {
    let total = denominator(completed, cancellations);
    let cancelled = Decimal::from(cancellations);

    if cancelled < thresholds.excellent_below * total {
        ReputationBand::Excellent
    } else if cancelled < thresholds.good_below * total {
        ReputationBand::Good
    } else if cancelled < thresholds.fair_below * total {
        ReputationBand::Fair
    } else if cancelled <= thresholds.poor_up_to * total {
        ReputationBand::Poor
    } else {
        ReputationBand::Review
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationSummary {
    pub completed:     u64,
    pub cancellations: u64,
    pub rate:          Decimal,
    pub band:          ReputationBand,
}

impl ReputationSummary {
    pub fn compute(thresholds: &ReputationThresholds, completed: u64, cancellations: u64) -> Self {
        Self {
            completed,
            cancellations,
            rate: cancellation_rate(completed, cancellations),
            band: band_for(thresholds, completed, cancellations),
        }
    }

    /// Count a user's cancellation records. Waived ones do not count
    /// against them.
    pub fn from_records(
        thresholds: &ReputationThresholds,
        completed:  u64,
        records:    &[CancellationRecord],
    ) -> Self {
        let cancellations = records
            .iter()
            .filter(|r| r.status != CancellationStatus::Waived)
            .count() as u64;
        Self::compute(thresholds, completed, cancellations)
    }
}
