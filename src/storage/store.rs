//! Deduplicating record store.

use std::collections::{HashSet, VecDeque};

use crate::error::Result;
use crate::models::Record;
use crate::storage::RecordLog;

/// Counts from one flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushSummary {
    /// Rows written to the log
    pub appended: usize,
    /// Rows whose fingerprint was already known
    pub duplicates: usize,
}

/// Record log plus the in-memory set of persisted fingerprints.
///
/// The set is the only dedup signal. It is updated strictly after a row has
/// been written, so a failed write never marks a row as persisted and a
/// successful one is never written twice.
pub struct RecordStore<L: RecordLog> {
    log: L,
    known: HashSet<String>,
    resume_page: u32,
}

impl<L: RecordLog> RecordStore<L> {
    /// Open the log, creating it with a header when it does not exist yet or
    /// is empty, and index every persisted fingerprint.
    pub fn load_or_init(mut log: L) -> Result<Self> {
        if !log.exists() || log.is_empty()? {
            log.create()?;
            log::info!("Created new record log");
            return Ok(Self {
                log,
                known: HashSet::new(),
                resume_page: 0,
            });
        }

        let entries = log.read_entries()?;
        let resume_page = entries.iter().map(|e| e.page_number).max().unwrap_or(0);
        let known: HashSet<String> = entries.into_iter().map(|e| e.fingerprint).collect();

        log::info!(
            "Loaded {} known records, last recorded page {}",
            known.len(),
            resume_page
        );

        Ok(Self {
            log,
            known,
            resume_page,
        })
    }

    /// Highest page number found in the log at load time (0 for a fresh log).
    pub fn resume_page(&self) -> u32 {
        self.resume_page
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.known.contains(fingerprint)
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Append the record unless its fingerprint is already persisted.
    ///
    /// Returns `Ok(false)` without touching the log for known fingerprints.
    pub fn append_if_new(&mut self, record: &Record) -> Result<bool> {
        if self.known.contains(&record.fingerprint) {
            return Ok(false);
        }
        self.log.append(record)?;
        self.known.insert(record.fingerprint.clone());
        Ok(true)
    }

    /// Drain `pending` front to back through [`append_if_new`].
    ///
    /// Each row leaves the queue only once it has been handled, so on error the
    /// failed row and everything after it are still queued.
    ///
    /// [`append_if_new`]: RecordStore::append_if_new
    pub fn flush(&mut self, pending: &mut VecDeque<Record>) -> Result<FlushSummary> {
        let mut summary = FlushSummary::default();
        while let Some(record) = pending.front() {
            if self.append_if_new(record)? {
                summary.appended += 1;
            } else {
                summary.duplicates += 1;
            }
            pending.pop_front();
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Category, LogEntry};
    use crate::storage::CsvRecordLog;
    use tempfile::TempDir;

    fn record(name: &str, page: u32) -> Record {
        Record {
            facility_name: name.to_string(),
            category: Category::Unknown,
            district: "Ho Municipal".to_string(),
            amount_paid: 10.0,
            claim_month: String::new(),
            payment_date: "01/01/2025".to_string(),
            page_number: page,
            fingerprint: format!("{name}100001012025"),
        }
    }

    /// In-memory log whose appends start failing after `fail_after` writes.
    #[derive(Default)]
    struct FlakyLog {
        rows: Vec<Record>,
        fail_after: Option<usize>,
    }

    impl RecordLog for FlakyLog {
        fn exists(&self) -> bool {
            true
        }

        fn is_empty(&self) -> Result<bool> {
            Ok(false)
        }

        fn create(&mut self) -> Result<()> {
            Ok(())
        }

        fn read_entries(&self) -> Result<Vec<LogEntry>> {
            Ok(self
                .rows
                .iter()
                .map(|r| LogEntry {
                    page_number: r.page_number,
                    fingerprint: r.fingerprint.clone(),
                })
                .collect())
        }

        fn append(&mut self, record: &Record) -> Result<()> {
            if self.fail_after.is_some_and(|n| self.rows.len() >= n) {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.rows.push(record.clone());
            Ok(())
        }
    }

    #[test]
    fn test_fresh_log_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::load_or_init(CsvRecordLog::new(tmp.path().join("p.csv"))).unwrap();
        assert_eq!(store.resume_page(), 0);
        assert_eq!(store.known_count(), 0);
        assert_eq!(store.log().line_count().unwrap(), 1);
    }

    #[test]
    fn test_empty_existing_log_gets_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.csv");
        std::fs::write(&path, "").unwrap();

        let mut store = RecordStore::load_or_init(CsvRecordLog::new(&path)).unwrap();
        assert!(store.append_if_new(&record("A", 1)).unwrap());

        let mut reloaded = RecordStore::load_or_init(CsvRecordLog::new(&path)).unwrap();
        assert!(reloaded.contains("A100001012025"));
        assert_eq!(reloaded.resume_page(), 1);
        assert!(!reloaded.append_if_new(&record("A", 1)).unwrap());
        assert_eq!(reloaded.log().line_count().unwrap(), 2);
    }

    #[test]
    fn test_headerless_log_fails_to_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.csv");
        std::fs::write(&path, "A,Unknown,Ho Municipal,10.00,,01/01/2025,1,A100001012025\n").unwrap();

        let result = RecordStore::load_or_init(CsvRecordLog::new(&path));
        assert!(matches!(result, Err(AppError::Validation(_))));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_resume_cursor_is_max_page() {
        let log = FlakyLog {
            rows: vec![record("A", 3), record("B", 5), record("C", 4)],
            fail_after: None,
        };
        let store = RecordStore::load_or_init(log).unwrap();
        assert_eq!(store.resume_page(), 5);
        assert_eq!(store.known_count(), 3);
        assert!(store.contains("B100001012025"));
    }

    #[test]
    fn test_append_if_new_rejects_known() {
        let mut store = RecordStore::load_or_init(FlakyLog::default()).unwrap();
        assert!(store.append_if_new(&record("A", 1)).unwrap());
        assert!(!store.append_if_new(&record("A", 2)).unwrap());
        assert_eq!(store.log().rows.len(), 1);
        assert_eq!(store.known_count(), 1);
    }

    #[test]
    fn test_flush_appends_only_new() {
        let log = FlakyLog {
            rows: vec![record("A", 1)],
            fail_after: None,
        };
        let mut store = RecordStore::load_or_init(log).unwrap();
        let before = store.known_count();

        let mut pending: VecDeque<Record> =
            vec![record("A", 2), record("B", 2), record("C", 2)].into();
        let summary = store.flush(&mut pending).unwrap();

        assert_eq!(summary, FlushSummary { appended: 2, duplicates: 1 });
        assert_eq!(store.known_count(), before + 2);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_failed_append_keeps_unflushed_suffix() {
        let log = FlakyLog {
            rows: Vec::new(),
            fail_after: Some(1),
        };
        let mut store = RecordStore::load_or_init(log).unwrap();

        let mut pending: VecDeque<Record> =
            vec![record("A", 1), record("B", 1), record("C", 1)].into();
        assert!(store.flush(&mut pending).is_err());

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].facility_name, "B");
        assert!(store.contains("A100001012025"));
        assert!(!store.contains("B100001012025"));
    }

    #[test]
    fn test_reload_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.csv");
        let batch = || -> VecDeque<Record> { vec![record("A", 1), record("B", 2)].into() };

        let mut first = RecordStore::load_or_init(CsvRecordLog::new(&path)).unwrap();
        assert_eq!(first.flush(&mut batch()).unwrap().appended, 2);

        let mut second = RecordStore::load_or_init(CsvRecordLog::new(&path)).unwrap();
        assert_eq!(second.resume_page(), 2);
        let summary = second.flush(&mut batch()).unwrap();
        assert_eq!(summary.appended, 0);
        assert_eq!(summary.duplicates, 2);
        assert_eq!(second.log().line_count().unwrap(), 3);
    }
}
