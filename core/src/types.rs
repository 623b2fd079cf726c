//! Shared primitive types used across the desk.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A stable, unique identifier for any stored entity.
pub type EntityId = String;

pub type ShiftId = EntityId;

/// An employer (pharmacy) or pharmacist account.
pub type UserId = EntityId;

/// Dollar amounts, always carried to the cent.
pub type Money = Decimal;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;
