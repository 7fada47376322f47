//! CSV dataset projected to JSON rows.
//!
//! The dataset file is read start to end on every call. Each record becomes
//! a [`Row`] keyed by the header, minus the excluded columns, and the full
//! list is returned only once the end of the file is reached.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde_json::Value;
use tracing::debug;

use crate::config::default_excluded_columns;
use crate::error::{Error, Result};

/// One dataset record, in header order.
pub type Row = serde_json::Map<String, Value>;

/// Reads the dataset file and drops excluded columns.
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
    excluded: Vec<String>,
}

impl DatasetReader {
    /// Reader for `path` that drops the `Subcategory` and `Note` columns.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            excluded: default_excluded_columns(),
        }
    }

    /// Replace the set of dropped columns.
    #[must_use]
    pub fn with_excluded_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the dataset file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Columns removed from every row.
    #[must_use]
    pub fn excluded_columns(&self) -> &[String] {
        &self.excluded
    }

    /// Read the whole dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the file cannot be opened or the CSV
    /// reader fails partway through. No partial result is returned.
    pub fn read_all(&self) -> Result<Vec<Row>> {
        let file = File::open(&self.path).map_err(|e| Error::read_failed(&self.path, e))?;
        self.read_from(file)
    }

    /// Read the whole dataset on the blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`DatasetReader::read_all`].
    pub async fn load(&self) -> Result<Vec<Row>> {
        let reader = self.clone();
        tokio::task::spawn_blocking(move || reader.read_all())
            .await
            .map_err(|e| Error::internal(format!("dataset read task failed: {e}")))?
    }

    /// Read rows from any CSV source with a header line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the CSV reader reports an error.
    pub fn read_from<R: Read>(&self, source: R) -> Result<Vec<Row>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);

        let headers = reader
            .headers()
            .map_err(|e| Error::read_failed(&self.path, e))?
            .clone();

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader
            .read_record(&mut record)
            .map_err(|e| Error::read_failed(&self.path, e))?
        {
            rows.push(self.project(&headers, &record));
        }

        debug!(path = %self.path.display(), rows = rows.len(), "Dataset loaded");
        Ok(rows)
    }

    /// Build a row from one record.
    ///
    /// Short records leave out the missing columns; fields past the end of
    /// the header are keyed by position as `_<index>`.
    fn project(&self, headers: &StringRecord, record: &StringRecord) -> Row {
        let mut row = Row::new();
        for (index, value) in record.iter().enumerate() {
            let key = headers
                .get(index)
                .map_or_else(|| format!("_{index}"), str::to_string);
            if self.is_excluded(&key) {
                continue;
            }
            row.insert(key, Value::String(value.to_string()));
        }
        row
    }

    fn is_excluded(&self, column: &str) -> bool {
        self.excluded.iter().any(|c| c == column)
    }
}
