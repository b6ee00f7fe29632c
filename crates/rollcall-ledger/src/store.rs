//! File-backed attendance store with a once-per-identity-per-day rule.

use crate::record::{AttendanceRecord, FIELD_DELIMITER, HEADER_LINE};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
/// Initial try plus one retry.
const RETRY_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("identity {0:?} contains a delimiter or line break")]
    InvalidIdentity(String),
    #[error("cannot access ledger {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome of a write attempt.
#[derive(Debug, Clone, Copy)]
pub struct RecordOutcome {
    /// False when the identity already had a record for that date.
    pub recorded: bool,
}

/// Bounded retry for transient file contention.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RETRY_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }
}

/// Append-only attendance ledger.
///
/// Storage is a delimited text file with a header line; each write attempt
/// re-reads the whole file to enforce the uniqueness rule. Single-writer:
/// another process writing the same file can race past the read-check
/// window, and no file locking is attempted.
pub struct AttendanceLedger {
    path: PathBuf,
    retry: RetryPolicy,
}

impl AttendanceLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_retry(path, RetryPolicy::default())
    }

    pub fn with_retry(path: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            path: path.into(),
            retry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an attendance event unless one already exists for this
    /// identity on the timestamp's calendar date.
    ///
    /// A transiently locked file (permission denied / would-block) gets the
    /// whole read-check-append sequence retried after a short backoff,
    /// bounded by the retry policy. Other I/O failures surface immediately.
    pub fn record_if_absent(
        &self,
        identity: &str,
        timestamp: NaiveDateTime,
    ) -> Result<RecordOutcome, LedgerError> {
        // A delimiter inside an identity would corrupt the line and void
        // the uniqueness check on later reads. Reject before any I/O.
        if identity.contains([FIELD_DELIMITER, '\n', '\r']) {
            return Err(LedgerError::InvalidIdentity(identity.to_owned()));
        }

        with_retry(self.retry, || self.try_record(identity, timestamp)).map_err(|e| {
            LedgerError::Io {
                path: self.path.clone(),
                source: e,
            }
        })
    }

    /// All well-formed records currently on disk. A missing file is an
    /// empty ledger.
    pub fn records(&self) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let contents = self.read_contents().map_err(|e| LedgerError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(parse_records(&contents))
    }

    /// One read-check-append pass.
    fn try_record(
        &self,
        identity: &str,
        timestamp: NaiveDateTime,
    ) -> Result<RecordOutcome, std::io::Error> {
        let contents = self.read_contents()?;
        let date = timestamp.date();

        for record in parse_records(&contents) {
            if record.identity == identity && record.date == date {
                return Ok(RecordOutcome { recorded: false });
            }
        }

        let record = AttendanceRecord {
            identity: identity.to_owned(),
            date,
            timestamp,
        };

        let mut line = String::new();
        if contents.is_empty() {
            // Brand-new (or zero-length) file: the header goes first so
            // readers can always skip line one.
            line.push_str(HEADER_LINE);
            line.push('\n');
        }
        line.push_str(&record.to_line());
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        Ok(RecordOutcome { recorded: true })
    }

    fn read_contents(&self) -> Result<String, std::io::Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

/// Run `op`, retrying contention failures after a fixed backoff, bounded by
/// the policy's attempt count. Non-transient errors surface immediately.
fn with_retry<T>(
    policy: RetryPolicy,
    mut op: impl FnMut() -> Result<T, std::io::Error>,
) -> Result<T, std::io::Error> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && is_contention(&e) => {
                tracing::debug!(attempt, error = %e, "ledger contended, retrying");
                std::thread::sleep(policy.backoff);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Transient failures worth a retry: another process holding the file.
fn is_contention(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::WouldBlock
    )
}

/// Parse ledger contents. The first line is the header and never a record;
/// blank and malformed lines are skipped.
fn parse_records(contents: &str) -> Vec<AttendanceRecord> {
    let mut records = Vec::new();

    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match AttendanceRecord::parse_line(line) {
            Some(record) => records.push(record),
            None => tracing::debug!(line, "skipping malformed ledger line"),
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn ledger_in(dir: &tempfile::TempDir) -> AttendanceLedger {
        AttendanceLedger::new(dir.path().join("attendance.csv"))
    }

    #[test]
    fn test_first_record_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let outcome = ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap();
        assert!(outcome.recorded);

        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["Name,Date,Time", "Ana,08/25/2026,09:00:00"]);
    }

    #[test]
    fn test_same_day_duplicate_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        assert!(ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap().recorded);
        // Later the same day, different time.
        assert!(!ledger.record_if_absent("Ana", ts(2026, 8, 25, 17, 45, 3)).unwrap().recorded);

        assert_eq!(ledger.records().unwrap().len(), 1);
    }

    #[test]
    fn test_next_day_records_again() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        assert!(ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap().recorded);
        assert!(ledger.record_if_absent("Ana", ts(2026, 8, 26, 9, 0, 0)).unwrap().recorded);

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.identity == "Ana"));
    }

    #[test]
    fn test_distinct_identities_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        assert!(ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap().recorded);
        assert!(ledger.record_if_absent("Ben", ts(2026, 8, 25, 9, 0, 5)).unwrap().recorded);

        assert_eq!(ledger.records().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        assert!(ledger.records().unwrap().is_empty());
    }

    #[test]
    fn test_header_line_never_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "Name,Date,Time\nAna,08/25/2026,09:00:00\n").unwrap();

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "Ana");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(
            ledger.path(),
            "Name,Date,Time\ngarbage\n\nAna,08/25/2026,09:00:00\nBen,not-a-date,10:00:00\n",
        )
        .unwrap();

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "Ana");
    }

    #[test]
    fn test_uniqueness_survives_malformed_neighbors() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "Name,Date,Time\ngarbage\nAna,08/25/2026,09:00:00\n").unwrap();

        // Ana's record is still seen despite the junk before it.
        assert!(!ledger.record_if_absent("Ana", ts(2026, 8, 25, 12, 0, 0)).unwrap().recorded);
    }

    #[test]
    fn test_identity_with_delimiter_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        let err = ledger
            .record_if_absent("Ana,Ben", ts(2026, 8, 25, 9, 0, 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidIdentity(_)));
        // Rejected before any I/O.
        assert!(!ledger.path().exists());
    }

    #[test]
    fn test_identity_persisted_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        ledger.record_if_absent("Mia Lowe", ts(2026, 8, 25, 9, 0, 0)).unwrap();
        let records = ledger.records().unwrap();
        assert_eq!(records[0].identity, "Mia Lowe");
    }

    #[test]
    fn test_unwritable_path_surfaces_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // The ledger path is a directory, so reading it fails with a
        // non-transient error: no retry, immediate surface.
        let ledger = AttendanceLedger::new(dir.path());

        let err = ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }

    #[test]
    fn test_whitespace_padded_identity_recorded_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);

        // A file-stem label can carry stray padding; it must still hit the
        // once-per-day rule on the second sighting.
        assert!(ledger.record_if_absent("Ana ", ts(2026, 8, 25, 9, 0, 0)).unwrap().recorded);
        assert!(!ledger.record_if_absent("Ana ", ts(2026, 8, 25, 10, 0, 0)).unwrap().recorded);

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "Ana ");
    }

    #[test]
    fn test_retry_recovers_after_transient_failure() {
        let policy = RetryPolicy {
            attempts: 2,
            backoff: Duration::from_millis(1),
        };
        let mut calls = 0;

        let value = with_retry(policy, || {
            calls += 1;
            if calls == 1 {
                Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "busy"))
            } else {
                Ok("written")
            }
        })
        .unwrap();

        assert_eq!(value, "written");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_retry_gives_up_after_bounded_attempts() {
        let policy = RetryPolicy {
            attempts: 2,
            backoff: Duration::from_millis(1),
        };
        let mut calls = 0;

        let result: Result<(), _> = with_retry(policy, || {
            calls += 1;
            Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "busy"))
        });

        assert_eq!(calls, 2);
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_retry_skipped_for_non_transient_error() {
        let mut calls = 0;

        let result: Result<(), _> = with_retry(RetryPolicy::default(), || {
            calls += 1;
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        });

        assert_eq!(calls, 1);
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_is_contention_classification() {
        let locked = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let busy = std::io::Error::new(std::io::ErrorKind::WouldBlock, "busy");
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");

        assert!(is_contention(&locked));
        assert!(is_contention(&busy));
        assert!(!is_contention(&missing));
    }

    #[test]
    fn test_zero_length_file_gets_header_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "").unwrap();

        ledger.record_if_absent("Ana", ts(2026, 8, 25, 9, 0, 0)).unwrap();
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(contents.starts_with("Name,Date,Time\n"));
    }
}
