use std::io::{ErrorKind, SeekFrom};
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use events::{newest_first, EventId, EventStore, NormalizedEvent, StoreError, StoredEvent};

/// [`EventStore`] that appends each record as one JSON line to a file.
///
/// The file is created (with its parent directory) on the first insert; a
/// missing file reads as an empty store. Reads and writes are serialised by
/// an internal lock so a reader never observes a half-written line.
///
/// A line left unterminated by an interrupted append is closed off before the
/// next record is written, and lines that do not decode are skipped with a
/// warning on read. One torn write costs at most the record it was writing.
#[derive(Debug)]
pub struct JsonlEventStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<Vec<StoredEvent>, StoreError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (index, line) in contents.split(|b| *b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice(line) {
                Ok(event) => events.push(event),
                Err(error) => tracing::warn!(
                    line = index + 1,
                    %error,
                    path = %self.path.display(),
                    "skipping undecodable event record"
                ),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn insert(&self, event: NormalizedEvent) -> Result<EventId, StoreError> {
        let id = EventId::new_random();
        let mut line = serde_json::to_vec(&StoredEvent::new(id, event))?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;

        if file.metadata().await?.len() > 0 {
            file.seek(SeekFrom::End(-1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                tracing::warn!(path = %self.path.display(), "terminating a torn record before appending");
                line.insert(0, b'\n');
            }
        }

        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(event_id = %id, path = %self.path.display(), "event appended");
        Ok(id)
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let _guard = self.lock.lock().await;
        let events = self.read_all().await?;
        Ok(newest_first(events, limit))
    }
}
