//! Store methods for cancellation records.

use crate::{
    cancellation::{ActorRole, CancellationRecord, CancellationStatus},
    error::DeskResult,
    types::{EntityId, ShiftId, Timestamp, UserId},
};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{decimal_at, enum_at, DeskStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCancellation {
    pub cancellation_id: EntityId,
    /// Caller-supplied idempotency key.
    pub request_id:      String,
    pub shift_id:        ShiftId,
    pub actor_id:        UserId,
    pub cancelled_at:    Timestamp,
    pub record:          CancellationRecord,
}

const CANCELLATION_COLUMNS: &str = "cancellation_id, request_id, shift_id, actor_id, cancelled_at,
    actor_role, policy_version, notice_hours, penalty_total, counterparty_compensation,
    platform_fee, status";

fn cancellation_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCancellation> {
    Ok(StoredCancellation {
        cancellation_id: row.get(0)?,
        request_id:      row.get(1)?,
        shift_id:        row.get(2)?,
        actor_id:        row.get(3)?,
        cancelled_at:    row.get(4)?,
        record: CancellationRecord {
            actor_role:     enum_at(row, 5, "actor role", ActorRole::parse)?,
            policy_version: row.get(6)?,
            notice_hours:   row.get(7)?,
            penalty_total:  decimal_at(row, 8)?,
            counterparty_compensation: decimal_at(row, 9)?,
            platform_fee:   decimal_at(row, 10)?,
            status:         enum_at(row, 11, "cancellation status", CancellationStatus::parse)?,
        },
    })
}

impl DeskStore {
    /// Record a cancellation once. A retry with the same request id, or a
    /// second cancellation of the same shift, writes nothing and returns the
    /// row that is already there.
    pub fn insert_cancellation_if_absent(
        &self,
        c: &StoredCancellation,
    ) -> DeskResult<(StoredCancellation, bool)> {
        let r = &c.record;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO cancellation (
                 cancellation_id, request_id, shift_id, actor_id, cancelled_at,
                 actor_role, policy_version, notice_hours, penalty_total,
                 counterparty_compensation, platform_fee, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                c.cancellation_id,
                c.request_id,
                c.shift_id,
                c.actor_id,
                c.cancelled_at,
                r.actor_role.as_str(),
                r.policy_version,
                r.notice_hours,
                r.penalty_total.to_string(),
                r.counterparty_compensation.to_string(),
                r.platform_fee.to_string(),
                r.status.as_str(),
            ],
        )? == 1;

        let stored = match self.cancellation_by_request(&c.request_id)? {
            Some(existing) => existing,
            None => self
                .cancellation_for_shift(&c.shift_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?,
        };
        Ok((stored, inserted))
    }

    pub fn get_cancellation(&self, cancellation_id: &str) -> DeskResult<Option<StoredCancellation>> {
        self.query_cancellation("cancellation_id", cancellation_id)
    }

    pub fn cancellation_by_request(&self, request_id: &str) -> DeskResult<Option<StoredCancellation>> {
        self.query_cancellation("request_id", request_id)
    }

    pub fn cancellation_for_shift(&self, shift_id: &str) -> DeskResult<Option<StoredCancellation>> {
        self.query_cancellation("shift_id", shift_id)
    }

    fn query_cancellation(
        &self,
        key_column: &'static str,
        key:        &str,
    ) -> DeskResult<Option<StoredCancellation>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {CANCELLATION_COLUMNS} FROM cancellation WHERE {key_column} = ?1"),
                params![key],
                cancellation_from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Waive a pending cancellation. Returns `false` if it was not pending.
    pub fn waive_cancellation(&self, cancellation_id: &str) -> DeskResult<bool> {
        let updated = self.conn.execute(
            "UPDATE cancellation
             SET status = 'waived', penalty_total = '0', counterparty_compensation = '0',
                 platform_fee = '0'
             WHERE cancellation_id = ?1 AND status = 'pending'",
            params![cancellation_id],
        )?;
        Ok(updated == 1)
    }

    /// Mark a pending cancellation as charged. Returns `false` if it was not
    /// pending.
    pub fn mark_cancellation_charged(&self, cancellation_id: &str) -> DeskResult<bool> {
        let updated = self.conn.execute(
            "UPDATE cancellation SET status = 'charged'
             WHERE cancellation_id = ?1 AND status = 'pending'",
            params![cancellation_id],
        )?;
        Ok(updated == 1)
    }

    /// Every cancellation the user made, oldest first.
    pub fn cancellations_by_actor(&self, actor_id: &str) -> DeskResult<Vec<StoredCancellation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CANCELLATION_COLUMNS} FROM cancellation
             WHERE actor_id = ?1 ORDER BY cancelled_at ASC, cancellation_id ASC"
        ))?;
        let rows = stmt
            .query_map(params![actor_id], cancellation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
