//! Single-writer task for the registrations file.
//!
//! The [`RecordStore`] is moved onto one blocking task; request handlers hold
//! a cloneable [`RecordWriter`] and send it records over a bounded channel.
//! Appends are applied one at a time, so rows from concurrent registrations
//! never interleave.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{RecordSink, RecordStore};
use crate::error::{Error, Result};
use crate::registrant::Registrant;

/// A queued append and the channel its result goes back on.
struct AppendRequest {
    record: Registrant,
    reply: oneshot::Sender<Result<()>>,
}

/// Handle to the task that owns the registrations file.
#[derive(Debug, Clone)]
pub struct RecordWriter {
    tx: mpsc::Sender<AppendRequest>,
    path: PathBuf,
}

impl std::fmt::Debug for AppendRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendRequest")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

impl RecordWriter {
    /// Move `store` onto a blocking task and return a handle to it.
    ///
    /// `capacity` bounds the number of appends waiting in the queue. The task
    /// exits once every handle has been dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(store: RecordStore, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AppendRequest>(capacity.max(1));
        let path = store.path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            debug!(path = %store.path().display(), "Registration writer started");
            while let Some(request) = rx.blocking_recv() {
                let result = store.append(&request.record);
                // The requester may have gone away; the row is written regardless.
                let _ = request.reply.send(result);
            }
            debug!(path = %store.path().display(), "Registration writer stopped");
        });

        Self { tx, path }
    }

    /// Path of the file this writer appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a record and wait until it has been written.
    ///
    /// # Errors
    ///
    /// Returns the store's write failure, or [`Error::WriterClosed`] if the
    /// writer task is gone.
    pub async fn append(&self, record: Registrant) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AppendRequest { record, reply })
            .await
            .map_err(|_| Error::WriterClosed)?;
        response.await.map_err(|_| Error::WriterClosed)?
    }
}

#[async_trait]
impl RecordSink for RecordWriter {
    async fn append(&self, record: Registrant) -> Result<()> {
        RecordWriter::append(self, record).await
    }
}
