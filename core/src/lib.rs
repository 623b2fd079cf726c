//! Shift Desk policy core.
//!
//! Urgency-tiered shift pricing, notice-based cancellation penalties and
//! cancellation-rate reputation bands for a pharmacy staffing marketplace,
//! plus the SQLite store and workflows that lock rates and record
//! penalties exactly once.

pub mod cancellation;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod payment;
pub mod pricing;
pub mod reputation;
pub mod store;
pub mod types;
