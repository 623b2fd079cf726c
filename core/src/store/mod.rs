//! SQLite persistence layer.
//!
//! RULE: Only store/ talks to the database.
//! The engine calls store methods and never executes SQL directly.

use crate::{error::DeskResult, event::EventLogEntry};
use rusqlite::{params, types::Type, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

mod cancellation;
mod shift;

pub use cancellation::StoredCancellation;
pub use shift::{ShiftRecord, ShiftStatus};

pub struct DeskStore {
    conn: Connection,
}

impl DeskStore {
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only matters for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_shifts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_cancellations.sql"))?;
        Ok(())
    }

    /// Run `f` inside a transaction. Any error rolls every write back.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> DeskResult<T>) -> DeskResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (subject_id, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.subject_id,
                entry.event_type,
                entry.payload,
                entry.recorded_at,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_subject(&self, subject_id: &str) -> DeskResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject_id, event_type, payload, recorded_at
             FROM event_log WHERE subject_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![subject_id], |row| {
                Ok(EventLogEntry {
                    id:          Some(row.get(0)?),
                    subject_id:  row.get(1)?,
                    event_type:  row.get(2)?,
                    payload:     row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Total number of logged events (for tests).
    pub fn event_count(&self) -> DeskResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
struct UnknownVariant {
    kind:  &'static str,
    value: String,
}

/// Amounts are stored as decimal text so no precision is lost.
fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a text column through one of the domain `parse` functions.
fn enum_at<T>(
    row:   &Row<'_>,
    idx:   usize,
    kind:  &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let value: String = row.get(idx)?;
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(UnknownVariant { kind, value }),
        )
    })
}
