//! # CSV Destination
//!
//! Keeps every record ever taken in one CSV file, oldest row first.
//!
//! Each append loads the existing table, checks its header against the record,
//! and writes header + old rows + new row to a temporary file next to the
//! target before renaming it into place. A crash mid-write leaves the previous
//! file intact.

use crate::Record;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors raised while appending to the CSV file.
#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV IO on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// The file was written with a different column set
    #[error("{} has columns {found:?}, record has {expected:?}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// An append-only CSV table on disk.
#[derive(Clone, Debug)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` as the last row, creating the file with a header if needed.
    pub fn append(&self, record: &Record) -> Result<(), CsvError> {
        let columns: Vec<String> = record.columns().map(str::to_string).collect();
        let existing = self.load(&columns)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| self.io(e))?;

        {
            let mut writer = csv::Writer::from_writer(BufWriter::new(temp.as_file()));
            writer.write_record(&columns)?;
            for row in &existing {
                writer.write_record(row)?;
            }
            writer.write_record(record.values().map(|value| value.to_string()))?;
            writer.flush().map_err(|e| self.io(e))?;
        }
        // The temp file is created 0600; keep whatever mode the table had
        if let Ok(meta) = fs::metadata(&self.path) {
            temp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| self.io(e))?;
        }
        temp.as_file().sync_all().map_err(|e| self.io(e))?;
        temp.persist(&self.path).map_err(|e| self.io(e.error))?;

        debug!(path = %self.path.display(), rows = existing.len() + 1, "csv updated");
        Ok(())
    }

    /// All data rows currently stored, oldest first.
    pub fn rows(&self) -> Result<Vec<csv::StringRecord>, CsvError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        Ok(reader.records().collect::<Result<Vec<_>, _>>()?)
    }

    /// Read the existing rows, verifying the header matches `columns`.
    fn load(&self, columns: &[String]) -> Result<Vec<csv::StringRecord>, CsvError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io(e)),
        };
        if file.metadata().map_err(|e| self.io(e))?.len() == 0 {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_reader(file);
        let found: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if found != columns {
            return Err(CsvError::SchemaMismatch {
                path: self.path.clone(),
                expected: columns.to_vec(),
                found,
            });
        }

        Ok(reader.records().collect::<Result<Vec<_>, _>>()?)
    }

    fn io(&self, source: io::Error) -> CsvError {
        CsvError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
