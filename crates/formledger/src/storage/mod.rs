//! Storage layer for formledger.
//!
//! Registrations are appended to a CSV file with a fixed header. The file
//! is only ever appended to; nothing here rewrites or truncates it.

pub mod schema;
pub mod writer;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::registrant::Registrant;

pub use schema::REGISTRATION_HEADER;
pub use writer::RecordWriter;

/// Destination for accepted registrations.
#[async_trait]
pub trait RecordSink: Send + Sync + std::fmt::Debug {
    /// Persist one registrant.
    ///
    /// # Errors
    ///
    /// Returns a write failure if the record could not be stored.
    async fn append(&self, record: Registrant) -> Result<()>;
}

/// Append-only CSV file of registrants.
///
/// Every write is encoded in memory first and handed to the file as a single
/// append, so a failed call never leaves half a row behind it. The store
/// itself does no locking; [`RecordWriter`] serializes concurrent callers.
#[derive(Debug)]
pub struct RecordStore {
    /// Path to the registrations file.
    path: PathBuf,
}

impl RecordStore {
    /// Open the registrations file, creating it with its header if needed.
    ///
    /// Creates parent directories when they don't exist. An existing file
    /// keeps its content; if its first row is not the expected header a
    /// warning is logged and new rows still use the fixed column order.
    ///
    /// A file that cannot be prepared is only logged. Each [`append`] retries
    /// and reports its own failure, so readers of other files keep working.
    ///
    /// [`append`]: Self::append
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };

        debug!("Opening registrations file at {}", store.path.display());
        match store.prepare() {
            Ok(()) => info!("Registrations file ready at {}", store.path.display()),
            Err(err) => warn!(
                path = %store.path.display(),
                kind = err.kind(),
                "Registrations file is not writable yet: {err}"
            ),
        }
        store
    }

    /// Get the path to the registrations file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one registrant as a row.
    ///
    /// If the file vanished or was emptied since it was opened, the header
    /// is written again before the row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if encoding or writing fails, or
    /// [`Error::DirectoryCreate`] if the parent directory cannot be created.
    pub fn append(&self, record: &Registrant) -> Result<()> {
        self.write(Some(record))?;
        debug!(username = %record.username, "Appended registration row");
        Ok(())
    }

    /// Count the data rows currently in the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the file exists but cannot be read.
    pub fn count(&self) -> Result<usize> {
        Self::count_at(&self.path)
    }

    /// Count the data rows of a registrations file without opening a store.
    ///
    /// A missing file has no rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadFailed`] if the file exists but cannot be read.
    pub fn count_at(path: &Path) -> Result<usize> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(Error::read_failed(path, e)),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let mut count = 0;
        let mut record = csv::ByteRecord::new();
        while reader
            .read_byte_record(&mut record)
            .map_err(|e| Error::read_failed(path, e))?
        {
            count += 1;
        }
        Ok(count)
    }

    fn prepare(&self) -> Result<()> {
        if !self.write(None)? {
            self.check_header()?;
        }
        Ok(())
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Write the header (when the file holds no rows) and an optional row.
    ///
    /// Returns whether the header was written.
    fn write(&self, record: Option<&Registrant>) -> Result<bool> {
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_failed(e))?;

        let len = file.metadata().map_err(|e| self.write_failed(e))?.len();
        let needs_header = is_blank(&mut file).map_err(|e| self.write_failed(e))?;
        let needs_newline =
            !ends_with_terminator(&mut file, len).map_err(|e| self.write_failed(e))?;

        if record.is_none() && !needs_header {
            return Ok(false);
        }

        let mut buf = Vec::new();
        if needs_newline {
            buf.push(schema::ROW_TERMINATOR);
        }
        buf.extend(encode(needs_header, record).map_err(|e| self.write_failed(e))?);

        file.write_all(&buf).map_err(|e| self.write_failed(e))?;
        file.sync_data().map_err(|e| self.write_failed(e))?;

        if needs_header {
            debug!("Wrote registrations header to {}", self.path.display());
        }
        Ok(needs_header)
    }

    fn check_header(&self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| self.write_failed(e))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut first = csv::ByteRecord::new();
        reader
            .read_byte_record(&mut first)
            .map_err(|e| self.write_failed(e))?;

        if first != csv::ByteRecord::from(REGISTRATION_HEADER.to_vec()) {
            warn!(
                path = %self.path.display(),
                found = ?first,
                "Registrations file has an unexpected header; appending with the standard column order"
            );
        }
        Ok(())
    }

    fn write_failed(&self, source: impl Into<csv::Error>) -> Error {
        Error::write_failed(&self.path, source)
    }
}

/// Encode an optional header and an optional row into one buffer.
fn encode(header: bool, record: Option<&Registrant>) -> csv::Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(schema::ROW_TERMINATOR))
        .from_writer(Vec::new());

    if header {
        writer.write_record(REGISTRATION_HEADER)?;
    }
    if let Some(record) = record {
        writer.serialize(record)?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Check whether a file holds nothing but line breaks.
///
/// The CSV reader skips empty lines, so such a file has no header yet.
fn is_blank(file: &mut File) -> std::io::Result<bool> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; 512];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            return Ok(true);
        }
        if buf[..n].iter().any(|b| !matches!(b, b'\n' | b'\r')) {
            return Ok(false);
        }
    }
}

/// Check whether a non-empty file ends with the row terminator.
fn ends_with_terminator(file: &mut File, len: u64) -> std::io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == schema::ROW_TERMINATOR)
}
