//! Store methods for shifts and their locked rates.

use crate::{
    error::DeskResult,
    pricing::UrgencyTier,
    types::{Money, ShiftId, Timestamp, UserId},
};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{decimal_at, enum_at, DeskStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Assigned,
    Completed,
    Cancelled,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open      => "open",
            ShiftStatus::Assigned  => "assigned",
            ShiftStatus::Completed => "completed",
            ShiftStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open"      => Some(ShiftStatus::Open),
            "assigned"  => Some(ShiftStatus::Assigned),
            "completed" => Some(ShiftStatus::Completed),
            "cancelled" => Some(ShiftStatus::Cancelled),
            _           => None,
        }
    }

    pub fn can_transition_to(&self, next: ShiftStatus) -> bool {
        matches!(
            (self, next),
            (ShiftStatus::Open, ShiftStatus::Assigned)
                | (ShiftStatus::Assigned, ShiftStatus::Completed)
                | (ShiftStatus::Open, ShiftStatus::Cancelled)
                | (ShiftStatus::Assigned, ShiftStatus::Cancelled)
        )
    }
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub shift_id:       ShiftId,
    pub employer_id:    UserId,
    pub pharmacist_id:  Option<UserId>,
    pub posted_at:      Timestamp,
    pub shift_start:    Timestamp,
    pub total_hours:    Decimal,
    pub hourly_rate:    Money,
    pub tier:           UrgencyTier,
    pub total_pay:      Money,
    pub policy_version: String,
    pub status:         ShiftStatus,
}

const SHIFT_COLUMNS: &str = "shift_id, employer_id, pharmacist_id, posted_at, shift_start,
    total_hours, hourly_rate, tier, total_pay, policy_version, status";

fn shift_from_row(row: &Row<'_>) -> rusqlite::Result<ShiftRecord> {
    Ok(ShiftRecord {
        shift_id:       row.get(0)?,
        employer_id:    row.get(1)?,
        pharmacist_id:  row.get(2)?,
        posted_at:      row.get(3)?,
        shift_start:    row.get(4)?,
        total_hours:    decimal_at(row, 5)?,
        hourly_rate:    decimal_at(row, 6)?,
        tier:           enum_at(row, 7, "tier", UrgencyTier::parse)?,
        total_pay:      decimal_at(row, 8)?,
        policy_version: row.get(9)?,
        status:         enum_at(row, 10, "shift status", ShiftStatus::parse)?,
    })
}

impl DeskStore {
    /// Insert a shift with its locked rate. If the shift already exists
    /// nothing is written and `false` is returned; the stored rate wins.
    pub fn insert_shift_if_absent(&self, shift: &ShiftRecord) -> DeskResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO shift (shift_id, employer_id, pharmacist_id, posted_at, shift_start,
                                total_hours, hourly_rate, tier, total_pay, policy_version, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (shift_id) DO NOTHING",
            params![
                shift.shift_id,
                shift.employer_id,
                shift.pharmacist_id,
                shift.posted_at,
                shift.shift_start,
                shift.total_hours.to_string(),
                shift.hourly_rate.to_string(),
                shift.tier.as_str(),
                shift.total_pay.to_string(),
                shift.policy_version,
                shift.status.as_str(),
            ],
        )?;
        Ok(inserted == 1)
    }

    pub fn get_shift(&self, shift_id: &str) -> DeskResult<Option<ShiftRecord>> {
        let shift = self
            .conn
            .query_row(
                &format!("SELECT {SHIFT_COLUMNS} FROM shift WHERE shift_id = ?1"),
                params![shift_id],
                shift_from_row,
            )
            .optional()?;
        Ok(shift)
    }

    /// Move a shift to `status`, only if it is still in `from`.
    /// Returns `false` when another writer got there first.
    pub fn update_shift_status(
        &self,
        shift_id: &str,
        from:     ShiftStatus,
        status:   ShiftStatus,
    ) -> DeskResult<bool> {
        let updated = self.conn.execute(
            "UPDATE shift SET status = ?3 WHERE shift_id = ?1 AND status = ?2",
            params![shift_id, from.as_str(), status.as_str()],
        )?;
        Ok(updated == 1)
    }

    /// Assign an open shift to a pharmacist.
    pub fn assign_shift(&self, shift_id: &str, pharmacist_id: &str) -> DeskResult<bool> {
        let updated = self.conn.execute(
            "UPDATE shift SET pharmacist_id = ?2, status = 'assigned'
             WHERE shift_id = ?1 AND status = 'open'",
            params![shift_id, pharmacist_id],
        )?;
        Ok(updated == 1)
    }

    /// Completed shifts the user worked or posted.
    pub fn completed_shift_count(&self, user_id: &str) -> DeskResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shift
             WHERE status = 'completed' AND (employer_id = ?1 OR pharmacist_id = ?1)",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
