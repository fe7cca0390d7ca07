//! JSON-lines implementation of the `EventLog` trait.
//!
//! One `StoredEvent` per line, in strict offset order. A record only counts
//! once its terminating newline is on disk: readers skip an unterminated
//! tail (an append in flight, or one torn by a crash) and the writer cuts
//! such a tail off before its first append.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use orderflow_core::error::DomainError;
use orderflow_core::event::{DomainEvent, StoredEvent};
use orderflow_core::event_log::{EventLog, EventStream};

/// File-backed, append-only event log.
#[derive(Debug)]
pub struct FileEventLog {
    path: PathBuf,
    /// Next offset to assign; `None` until the file has been scanned.
    next_offset: Mutex<Option<u64>>,
}

impl FileEventLog {
    /// Creates a log backed by `path`. Nothing is touched on disk until the
    /// first append or read; a missing file is an empty log.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_offset: Mutex::new(None),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scans the file for the last durable record and truncates any
    /// unterminated tail. Returns the next offset to assign.
    async fn recover(&self) -> Result<u64, DomainError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error("read event log", &e)),
        };

        let mut next_offset = 0;
        let mut durable_len = 0;
        for line in bytes.split_inclusive(|b| *b == b'\n') {
            if line.last() != Some(&b'\n') {
                break;
            }
            durable_len += line.len();
            if let Some(record) = parse_line(line)? {
                next_offset = record.offset + 1;
            }
        }

        if durable_len < bytes.len() {
            tracing::warn!(
                path = %self.path.display(),
                discarded_bytes = bytes.len() - durable_len,
                "truncating unterminated tail of event log"
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&self.path)
                .await
                .map_err(|e| io_error("open event log", &e))?;
            file.set_len(durable_len as u64)
                .await
                .map_err(|e| io_error("truncate event log", &e))?;
            file.sync_all()
                .await
                .map_err(|e| io_error("sync event log", &e))?;
        }

        tracing::info!(path = %self.path.display(), next_offset, "event log recovered");
        Ok(next_offset)
    }

    async fn write_record(&self, record: &StoredEvent) -> Result<(), DomainError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create event log directory", &e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_error("open event log", &e))?;
        file.write_all(&line)
            .await
            .map_err(|e| io_error("write event log", &e))?;
        file.sync_data()
            .await
            .map_err(|e| io_error("sync event log", &e))
    }
}

#[async_trait]
impl EventLog for FileEventLog {
    async fn append(&self, event: DomainEvent) -> Result<StoredEvent, DomainError> {
        let mut next_offset = self.next_offset.lock().await;
        let offset = match *next_offset {
            Some(offset) => offset,
            None => self.recover().await?,
        };

        let record = StoredEvent::new(event, offset);
        if let Err(err) = self.write_record(&record).await {
            // The file may now end in a partial line; rescan before the
            // next append.
            *next_offset = None;
            return Err(err);
        }

        *next_offset = Some(offset + 1);
        tracing::debug!(offset, event_type = %record.event_type, "event appended");
        Ok(record)
    }

    fn stream(&self, from_offset: u64) -> EventStream<'_> {
        let state = ReadState::Unopened(self.path.clone());
        futures::stream::try_unfold(state, move |state| async move {
            let mut reader = match state {
                ReadState::Unopened(path) => match File::open(&path).await {
                    Ok(file) => BufReader::new(file),
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(io_error("open event log", &e)),
                },
                ReadState::Reading(reader) => reader,
            };

            let mut line = Vec::new();
            loop {
                line.clear();
                let read = reader
                    .read_until(b'\n', &mut line)
                    .await
                    .map_err(|e| io_error("read event log", &e))?;
                if read == 0 || line.last() != Some(&b'\n') {
                    return Ok(None);
                }
                if let Some(record) = parse_line(&line)?
                    && record.offset >= from_offset
                {
                    return Ok(Some((record, ReadState::Reading(reader))));
                }
            }
        })
        .boxed()
    }
}

enum ReadState {
    Unopened(PathBuf),
    Reading(BufReader<File>),
}

/// Parses one newline-terminated line; blank lines yield `None`.
fn parse_line(line: &[u8]) -> Result<Option<StoredEvent>, DomainError> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(line)
        .map(Some)
        .map_err(|e| DomainError::Serialization(format!("corrupt event log record: {e}")))
}

fn io_error(action: &str, err: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action}: {err}"))
}
