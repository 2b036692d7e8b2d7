//! Local CSV file implementation of the record log.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{LOG_HEADER, LogEntry, Record};
use crate::storage::RecordLog;

/// Append-only CSV log on the local filesystem.
#[derive(Debug, Clone)]
pub struct CsvRecordLog {
    path: PathBuf,
}

impl CsvRecordLog {
    /// Create a log handle for the given file. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of physical lines in the log, header included.
    #[cfg(test)]
    pub fn line_count(&self) -> Result<usize> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content.lines().count())
    }

    /// Ensure parent directory exists.
    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl RecordLog for CsvRecordLog {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(std::fs::metadata(&self.path)?.len() == 0)
    }

    fn create(&mut self) -> Result<()> {
        self.ensure_dir()?;
        let file = File::create(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(LOG_HEADER)?;
        writer.flush()?;
        Ok(())
    }

    fn read_entries(&self) -> Result<Vec<LogEntry>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let headers = reader.headers()?;
        let missing: Vec<&str> = ["Page", "Hash"]
            .into_iter()
            .filter(|column| !headers.iter().any(|h| h.trim() == *column))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "{} has no {} column in its header; refusing to treat it as a record log",
                self.path.display(),
                missing.join("/")
            )));
        }

        let mut entries = Vec::new();
        for (index, row) in reader.deserialize::<LogEntry>().enumerate() {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) if e.is_io_error() => return Err(AppError::Csv(e)),
                Err(e) => {
                    // Row 1 is the header
                    log::warn!(
                        "Skipping malformed row {} in {}: {}",
                        index + 2,
                        self.path.display(),
                        e
                    );
                }
            }
        }
        Ok(entries)
    }

    fn append(&mut self, record: &Record) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(record.to_row())?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))?;
        file.sync_data()?;
        Ok(())
    }
}
