//! Ledger line format: `identity,MM/DD/YYYY,HH:MM:SS`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// chrono format string for the ledger's date field.
pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const FIELD_DELIMITER: char = ',';
pub(crate) const HEADER_LINE: &str = "Name,Date,Time";

/// One attendance event. Append-only; never updated or deleted.
///
/// Invariant: `date == timestamp.date()`. The date is carried separately
/// because it is the uniqueness key for the once-per-day rule.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub identity: String,
    pub date: NaiveDate,
    pub timestamp: NaiveDateTime,
}

impl AttendanceRecord {
    pub(crate) fn to_line(&self) -> String {
        format!(
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.identity,
            self.timestamp.format(DATE_FORMAT),
            self.timestamp.format(TIME_FORMAT)
        )
    }

    /// Parse one ledger line.
    ///
    /// Lenient where it can afford to be: the time field may be missing
    /// (midnight assumed). Anything less than an identity plus a valid
    /// date is rejected with `None`. The identity field is taken verbatim,
    /// never trimmed: writes persist it verbatim, and a read-side trim
    /// would make a padded identity miss its own record in the
    /// uniqueness check.
    pub(crate) fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split(FIELD_DELIMITER);

        let identity = fields.next()?;
        if identity.is_empty() {
            return None;
        }

        let date = NaiveDate::parse_from_str(fields.next()?.trim(), DATE_FORMAT).ok()?;
        let time = fields
            .next()
            .and_then(|t| NaiveTime::parse_from_str(t.trim(), TIME_FORMAT).ok())
            .unwrap_or(NaiveTime::MIN);

        Some(Self {
            identity: identity.to_owned(),
            date,
            timestamp: NaiveDateTime::new(date, time),
        })
    }
}
