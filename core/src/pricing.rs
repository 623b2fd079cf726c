//! Urgency pricing. The hourly rate a shift is locked at when posted.
//!
//! The rate depends only on how many whole days separate posting from
//! the shift's start. Fewer days means a higher rate, never a lower one.

use crate::{
    config::{Interpolation, PolicyVersion, TierRate},
    error::{DeskError, DeskResult},
    types::{Money, Timestamp},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered from most to least urgent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Emergency,
    VeryUrgent,
    Urgent,
    ShortNotice,
    Moderate,
    Reasonable,
    Planned,
}

impl UrgencyTier {
    pub const ALL: [UrgencyTier; 7] = [
        UrgencyTier::Emergency,
        UrgencyTier::VeryUrgent,
        UrgencyTier::Urgent,
        UrgencyTier::ShortNotice,
        UrgencyTier::Moderate,
        UrgencyTier::Reasonable,
        UrgencyTier::Planned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Emergency   => "emergency",
            UrgencyTier::VeryUrgent  => "very_urgent",
            UrgencyTier::Urgent      => "urgent",
            UrgencyTier::ShortNotice => "short_notice",
            UrgencyTier::Moderate    => "moderate",
            UrgencyTier::Reasonable  => "reasonable",
            UrgencyTier::Planned     => "planned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPricingInput {
    pub posted_at:   Timestamp,
    pub shift_start: Timestamp,
}

impl ShiftPricingInput {
    /// Whole days between posting and start, rounded down.
    pub fn days_ahead(&self) -> DeskResult<i64> {
        if self.shift_start < self.posted_at {
            return Err(DeskError::InvalidSchedule {
                posted_at:   self.posted_at,
                shift_start: self.shift_start,
            });
        }
        Ok((self.shift_start - self.posted_at).num_days().max(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub tier:           UrgencyTier,
    pub days_ahead:     i64,
    pub hourly_rate:    Money,
    pub policy_version: String,
}

impl RateQuote {
    pub fn total_pay(&self, total_hours: Decimal) -> DeskResult<Money> {
        total_pay(self.hourly_rate, total_hours)
    }
}

/// Price a shift posted at `posted_at` that starts at `shift_start`.
pub fn compute_rate(
    policy:      &PolicyVersion,
    posted_at:   Timestamp,
    shift_start: Timestamp,
) -> DeskResult<RateQuote> {
    let days_ahead = ShiftPricingInput { posted_at, shift_start }.days_ahead()?;
    let (tier, hourly_rate) = rate_for_days(policy, days_ahead)?;

    log::debug!(
        "pricing: {days_ahead} days ahead -> {tier} ${hourly_rate}/h (policy {})",
        policy.version
    );

    Ok(RateQuote {
        tier,
        days_ahead,
        hourly_rate,
        policy_version: policy.version.clone(),
    })
}

/// Tier and hourly rate for a given lead time. Negative leads count as 0.
pub fn rate_for_days(policy: &PolicyVersion, days_ahead: i64) -> DeskResult<(UrgencyTier, Money)> {
    let days_ahead = days_ahead.max(0);
    let tier = policy
        .tier_for_days(days_ahead)
        .ok_or_else(|| DeskError::InvalidPolicy {
            version: policy.version.clone(),
            reason:  format!("no tier covers {days_ahead} days ahead"),
        })?;
    Ok((tier.tier, interpolate(tier, days_ahead, policy.interpolation)))
}

fn interpolate(tier: &TierRate, days_ahead: i64, mode: Interpolation) -> Money {
    if !tier.is_ranged() {
        return tier.high_rate;
    }
    let Some(max_days) = tier.max_days else {
        return tier.low_rate;
    };

    match mode {
        Interpolation::LowerEndpoint => tier.low_rate,
        Interpolation::LinearFloor => {
            let span = Decimal::from(max_days - tier.min_days);
            let step = Decimal::from(days_ahead - tier.min_days);
            let drop = (tier.high_rate - tier.low_rate) * step / span;
            (tier.high_rate - drop)
                .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity)
                .max(tier.low_rate)
        }
    }
}

/// `hourly_rate × total_hours`, banker's-rounded to the cent.
/// Hours must be positive and small enough to multiply out.
pub fn total_pay(hourly_rate: Money, total_hours: Decimal) -> DeskResult<Money> {
    if total_hours <= Decimal::ZERO {
        return Err(DeskError::InvalidShiftHours { total_hours });
    }
    let pay = hourly_rate
        .checked_mul(total_hours)
        .ok_or(DeskError::InvalidShiftHours { total_hours })?;
    Ok(pay.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(days: i64) -> Money {
        rate_for_days(&PolicyVersion::standard(), days).unwrap().1
    }

    #[test]
    fn ranged_tiers_step_down_linearly() {
        assert_eq!(rate(3), Decimal::new(6000, 2));
        assert_eq!(rate(4), Decimal::new(5900, 2));
        assert_eq!(rate(5), Decimal::new(5900, 2));
        assert_eq!(rate(6), Decimal::new(5840, 2));
        assert_eq!(rate(10), Decimal::new(5600, 2));
        assert_eq!(rate(12), Decimal::new(5433, 2));
        // 53.666.. floors, it does not round up
        assert_eq!(rate(13), Decimal::new(5366, 2));
        assert_eq!(rate(14), Decimal::new(5300, 2));
    }

    #[test]
    fn lower_endpoint_pays_the_floor_of_the_range() {
        let mut policy = PolicyVersion::standard();
        policy.interpolation = Interpolation::LowerEndpoint;
        let (tier, r) = rate_for_days(&policy, 5).unwrap();
        assert_eq!(tier, UrgencyTier::Moderate);
        assert_eq!(r, Decimal::new(5600, 2));
    }

    #[test]
    fn total_pay_rounds_half_to_even() {
        // 54.33 * 2.5 = 135.825 -> 135.82
        assert_eq!(total_pay(Decimal::new(5433, 2), Decimal::new(25, 1)).unwrap(), Decimal::new(13582, 2));
        // 53.66 * 1.25 = 67.075 -> 67.08
        assert_eq!(total_pay(Decimal::new(5366, 2), Decimal::new(125, 2)).unwrap(), Decimal::new(6708, 2));
    }

    #[test]
    fn unpayable_hours_are_rejected() {
        let err = total_pay(Decimal::new(9000, 2), Decimal::MAX).unwrap_err();
        assert!(matches!(err, DeskError::InvalidShiftHours { .. }), "{err}");
        assert!(total_pay(Decimal::new(9000, 2), Decimal::ZERO).is_err());
    }

    #[test]
    fn tier_names_round_trip_through_parse() {
        for tier in UrgencyTier::ALL {
            assert_eq!(UrgencyTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(UrgencyTier::parse("whenever"), None);
    }
}
