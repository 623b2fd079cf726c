//! Policy configuration: versioned rate, penalty and reputation tables.
//!
//! Every calculator takes a `&PolicyVersion` explicitly. There is no
//! process-wide "current policy": the catalog names the version new shifts
//! are priced under, and older versions stay resolvable so a shift keeps
//! the terms it was locked with.

use crate::{
    cancellation::ActorRole,
    error::{DeskError, DeskResult},
    pricing::UrgencyTier,
    types::Money,
};
use chrono::TimeDelta;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STANDARD_POLICY_VERSION: &str = "2024-01";

// ── Pricing tiers ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierRate {
    pub tier: UrgencyTier,
    pub min_days: i64,
    /// Inclusive. `None` only on the last, open-ended tier.
    #[serde(default)]
    pub max_days: Option<i64>,
    /// Rate paid on `min_days`, the most urgent day of the tier.
    pub high_rate: Money,
    /// Rate paid on `max_days`. Equal to `high_rate` for flat tiers.
    pub low_rate: Money,
}

impl TierRate {
    pub fn contains(&self, days_ahead: i64) -> bool {
        days_ahead >= self.min_days && self.max_days.map_or(true, |max| days_ahead <= max)
    }

    pub fn is_ranged(&self) -> bool {
        self.high_rate != self.low_rate
    }
}

/// How a ranged tier spreads its rate across the days it covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight line from `high_rate` to `low_rate`, rounded down to the cent.
    #[default]
    LinearFloor,
    /// Every day of the tier pays `low_rate`.
    LowerEndpoint,
}

// ── Cancellation penalties ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltyRule {
    /// Fixed dollar penalty, part of which is credited to the counterparty.
    Flat {
        penalty:      Money,
        compensation: Money,
    },
    /// `rate` of the shift's total pay plus `flat_fee`. The counterparty
    /// receives `compensation_share` of the pay-based part only; the flat
    /// fee is always retained by the platform.
    ShareOfPay {
        rate:               Decimal,
        #[serde(default)]
        flat_fee:           Money,
        compensation_share: Decimal,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PenaltyBand {
    /// Inclusive lower bound of the notice period, in hours.
    pub min_notice_hours: i64,
    pub rule: PenaltyRule,
}

/// Bands ordered by descending `min_notice_hours`, the last one at 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PenaltySchedule {
    pub bands: Vec<PenaltyBand>,
}

impl PenaltySchedule {
    /// Whether any band prices off the shift's pay.
    pub fn uses_shift_pay(&self) -> bool {
        self.bands
            .iter()
            .any(|b| matches!(b.rule, PenaltyRule::ShareOfPay { .. }))
    }
}

// ── Reputation bands ──────────────────────────────────────────────

/// Cancellation-rate cut-offs, as fractions of all finished shifts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationThresholds {
    pub excellent_below: Decimal,
    pub good_below:      Decimal,
    pub fair_below:      Decimal,
    /// Inclusive: a rate of exactly this value is still `poor`.
    pub poor_up_to:      Decimal,
}

impl ReputationThresholds {
    pub fn standard() -> Self {
        Self {
            excellent_below: Decimal::new(2, 2),
            good_below:      Decimal::new(5, 2),
            fair_below:      Decimal::new(10, 2),
            poor_up_to:      Decimal::new(15, 2),
        }
    }
}

// ── Policy version ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyVersion {
    pub version: String,
    #[serde(default)]
    pub interpolation: Interpolation,
    pub tiers: Vec<TierRate>,
    pub pharmacist_penalties: PenaltySchedule,
    pub employer_penalties: PenaltySchedule,
    pub reputation: ReputationThresholds,
}

fn dollars(amount: i64) -> Money {
    Decimal::new(amount * 100, 2)
}

fn percent(p: i64) -> Decimal {
    Decimal::new(p, 2)
}

fn flat(min_notice_hours: i64, penalty: i64, compensation: i64) -> PenaltyBand {
    PenaltyBand {
        min_notice_hours,
        rule: PenaltyRule::Flat {
            penalty:      dollars(penalty),
            compensation: dollars(compensation),
        },
    }
}

fn share(min_notice_hours: i64, rate_pct: i64, flat_fee: i64) -> PenaltyBand {
    PenaltyBand {
        min_notice_hours,
        rule: PenaltyRule::ShareOfPay {
            rate:               percent(rate_pct),
            flat_fee:           dollars(flat_fee),
            compensation_share: Decimal::ONE,
        },
    }
}

fn tier(tier: UrgencyTier, min_days: i64, max_days: Option<i64>, high: i64, low: i64) -> TierRate {
    TierRate {
        tier,
        min_days,
        max_days,
        high_rate: dollars(high),
        low_rate:  dollars(low),
    }
}

impl PolicyVersion {
    /// The built-in policy the marketplace launched with.
    pub fn standard() -> Self {
        Self {
            version: STANDARD_POLICY_VERSION.into(),
            interpolation: Interpolation::LinearFloor,
            tiers: vec![
                tier(UrgencyTier::Emergency,   0,  Some(0),  90, 90),
                tier(UrgencyTier::VeryUrgent,  1,  Some(1),  65, 65),
                tier(UrgencyTier::Urgent,      2,  Some(2),  60, 60),
                tier(UrgencyTier::ShortNotice, 3,  Some(4),  60, 59),
                tier(UrgencyTier::Moderate,    5,  Some(10), 59, 56),
                tier(UrgencyTier::Reasonable,  11, Some(14), 55, 53),
                tier(UrgencyTier::Planned,     15, None,     50, 50),
            ],
            pharmacist_penalties: PenaltySchedule {
                bands: vec![
                    flat(120, 0,   0),
                    flat(72,  50,  0),
                    flat(48,  100, 50),
                    flat(24,  150, 80),
                    flat(0,   300, 200),
                ],
            },
            employer_penalties: PenaltySchedule {
                bands: vec![
                    share(168, 0,   0),
                    share(96,  25,  0),
                    share(48,  50,  0),
                    share(24,  75,  0),
                    share(0,   100, 100),
                ],
            },
            reputation: ReputationThresholds::standard(),
        }
    }

    pub fn schedule_for(&self, role: ActorRole) -> &PenaltySchedule {
        match role {
            ActorRole::Pharmacist => &self.pharmacist_penalties,
            ActorRole::Employer   => &self.employer_penalties,
        }
    }

    pub fn tier_for_days(&self, days_ahead: i64) -> Option<&TierRate> {
        self.tiers.iter().find(|t| t.contains(days_ahead))
    }

    /// Check the tables are complete and internally consistent.
    pub fn validate(&self) -> DeskResult<()> {
        let invalid = |reason: String| DeskError::InvalidPolicy {
            version: self.version.clone(),
            reason,
        };

        if self.version.trim().is_empty() {
            return Err(invalid("version id is empty".into()));
        }

        self.validate_tiers().map_err(invalid)?;
        for (role, schedule) in [
            (ActorRole::Pharmacist, &self.pharmacist_penalties),
            (ActorRole::Employer, &self.employer_penalties),
        ] {
            validate_schedule(schedule).map_err(|r| invalid(format!("{role} penalties: {r}")))?;
        }

        let r = &self.reputation;
        let ascending = Decimal::ZERO < r.excellent_below
            && r.excellent_below < r.good_below
            && r.good_below < r.fair_below
            && r.fair_below < r.poor_up_to
            && r.poor_up_to < Decimal::ONE;
        if !ascending {
            return Err(invalid("reputation thresholds must ascend strictly within (0, 1)".into()));
        }

        Ok(())
    }

    fn validate_tiers(&self) -> Result<(), String> {
        let first = self.tiers.first().ok_or("no pricing tiers")?;
        if first.min_days != 0 {
            return Err(format!("first tier starts at day {}, not 0", first.min_days));
        }

        for (i, t) in self.tiers.iter().enumerate() {
            let last = i + 1 == self.tiers.len();
            match t.max_days {
                None if !last => return Err(format!("{} is open-ended but not last", t.tier)),
                Some(_) if last => return Err(format!("last tier {} must be open-ended", t.tier)),
                Some(max) if max < t.min_days => {
                    return Err(format!("{} ends before it starts", t.tier))
                }
                _ => {}
            }
            if t.low_rate <= Decimal::ZERO || t.high_rate < t.low_rate {
                return Err(format!("{} rates must satisfy high >= low > 0", t.tier));
            }
            let single_day = t.max_days.map_or(true, |max| max == t.min_days);
            if single_day && t.is_ranged() {
                return Err(format!("{} covers no day span but has a rate range", t.tier));
            }
            if let Some(next) = self.tiers.get(i + 1) {
                if Some(next.min_days - 1) != t.max_days {
                    return Err(format!("gap or overlap between {} and {}", t.tier, next.tier));
                }
                if next.high_rate > t.low_rate {
                    return Err(format!("{} pays more than the more urgent {}", next.tier, t.tier));
                }
            }
        }
        Ok(())
    }
}

fn validate_schedule(schedule: &PenaltySchedule) -> Result<(), String> {
    let last = schedule.bands.last().ok_or("no bands")?;
    if last.min_notice_hours != 0 {
        return Err("last band must start at 0 hours".into());
    }
    let unrepresentable = schedule
        .bands
        .iter()
        .find(|b| TimeDelta::try_hours(b.min_notice_hours).is_none());
    if let Some(band) = unrepresentable {
        return Err(format!("band threshold {}h is out of range", band.min_notice_hours));
    }
    for pair in schedule.bands.windows(2) {
        if pair[0].min_notice_hours <= pair[1].min_notice_hours {
            return Err("band thresholds must strictly descend".into());
        }
    }
    for band in &schedule.bands {
        let ok = match &band.rule {
            PenaltyRule::Flat { penalty, compensation } => {
                *compensation >= Decimal::ZERO && compensation <= penalty
            }
            PenaltyRule::ShareOfPay { rate, flat_fee, compensation_share } => {
                *rate >= Decimal::ZERO
                    && *flat_fee >= Decimal::ZERO
                    && *compensation_share >= Decimal::ZERO
                    && *compensation_share <= Decimal::ONE
            }
        };
        if !ok {
            return Err(format!(
                "band at {}h would credit more than it charges",
                band.min_notice_hours
            ));
        }
    }
    Ok(())
}

// ── Catalog ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct PolicyCatalogFile {
    current:  String,
    versions: Vec<PolicyVersion>,
}

#[derive(Debug, Clone)]
pub struct PolicyCatalog {
    current:  String,
    versions: BTreeMap<String, PolicyVersion>,
}

impl PolicyCatalog {
    /// Catalog holding only the built-in policy.
    pub fn standard() -> Self {
        let policy = PolicyVersion::standard();
        Self {
            current:  policy.version.clone(),
            versions: [(policy.version.clone(), policy)].into(),
        }
    }

    /// Load from the data/ directory.
    /// In tests, use PolicyCatalog::standard().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/policies/policy_versions.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let catalog = Self::from_json(&content)?;
        log::info!(
            "loaded {} policy versions from {path}, current={}",
            catalog.versions.len(),
            catalog.current
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> DeskResult<Self> {
        let file: PolicyCatalogFile = serde_json::from_str(content)?;
        Self::from_versions(&file.current, file.versions)
    }

    pub fn from_versions(current: &str, versions: Vec<PolicyVersion>) -> DeskResult<Self> {
        let mut by_id = BTreeMap::new();
        for policy in versions {
            policy.validate()?;
            let id = policy.version.clone();
            if by_id.insert(id.clone(), policy).is_some() {
                return Err(DeskError::InvalidPolicy {
                    version: id,
                    reason:  "defined more than once".into(),
                });
            }
        }
        if !by_id.contains_key(current) {
            return Err(DeskError::UnknownPolicyVersion { version: current.into() });
        }
        Ok(Self {
            current:  current.into(),
            versions: by_id,
        })
    }

    /// The version new shifts are priced under.
    pub fn current(&self) -> &PolicyVersion {
        &self.versions[&self.current]
    }

    pub fn get(&self, version: &str) -> DeskResult<&PolicyVersion> {
        self.versions
            .get(version)
            .ok_or_else(|| DeskError::UnknownPolicyVersion { version: version.into() })
    }

    pub fn versions(&self) -> impl Iterator<Item = &PolicyVersion> {
        self.versions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_policy_is_valid() {
        PolicyVersion::standard().validate().unwrap();
    }

    #[test]
    fn gap_between_tiers_is_rejected() {
        let mut policy = PolicyVersion::standard();
        policy.tiers[3].min_days = 4;
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, DeskError::InvalidPolicy { .. }), "{err}");
    }

    #[test]
    fn compensation_above_penalty_is_rejected() {
        let mut policy = PolicyVersion::standard();
        policy.pharmacist_penalties.bands[1].rule = PenaltyRule::Flat {
            penalty:      dollars(50),
            compensation: dollars(60),
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn current_must_exist() {
        let err = PolicyCatalog::from_versions("2030-01", vec![PolicyVersion::standard()])
            .unwrap_err();
        assert!(matches!(err, DeskError::UnknownPolicyVersion { .. }));
    }
}
