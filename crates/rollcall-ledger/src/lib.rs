//! rollcall-ledger — Append-only attendance ledger.
//!
//! Delimited text storage with a header line, at most one record per
//! identity per calendar day, and a bounded retry when another process
//! transiently holds the file.

mod record;
mod store;

pub use record::{AttendanceRecord, DATE_FORMAT};
pub use store::{AttendanceLedger, LedgerError, RecordOutcome, RetryPolicy};
