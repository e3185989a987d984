use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Weak;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::registry::Inner;
use crate::content::ByteReader;
use crate::envelope::Fault;

pub(super) enum Source {
    File(File),
    Bytes(Bytes),
    Reader(ByteReader),
    Channel(mpsc::Receiver<Bytes>),
}

/// A result parked for chunked retrieval.
///
/// File-backed handles serve ranged reads and are exhausted once `size` bytes
/// went out. Every other kind is drained whole by its first fetch.
pub struct StreamHandle {
    id: String,
    size: u64,
    is_file: bool,
    source: tokio::sync::Mutex<Option<Source>>,
    served: AtomicU64,
    last_fetch: Mutex<Instant>,
    destroyed: AtomicBool,
    watchdog: Mutex<Option<JoinHandle<()>>>,
    registry: Weak<Inner>,
}

impl StreamHandle {
    pub(super) fn new(
        id: String,
        size: u64,
        is_file: bool,
        source: Source,
        registry: Weak<Inner>,
    ) -> Self {
        Self {
            id,
            size,
            is_file,
            source: tokio::sync::Mutex::new(Some(source)),
            served: AtomicU64::new(0),
            last_fetch: Mutex::new(Instant::now()),
            destroyed: AtomicBool::new(false),
            watchdog: Mutex::new(None),
            registry,
        }
    }

    /// Registry id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Total size in bytes, zero when unknown.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Time since the last fetch (or since opening).
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_fetch.lock().elapsed()
    }

    /// Returns `true` once [`StreamHandle::destroy`] ran.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(super) fn attach_watchdog(&self, task: JoinHandle<()>) {
        *self.watchdog.lock() = Some(task);
    }

    /// Reads up to `length` bytes at `offset`.
    ///
    /// Returns the data and whether the handle is now exhausted.
    pub(super) async fn fetch(&self, offset: u64, length: u64) -> Result<(Bytes, bool), Fault> {
        if self.is_destroyed() {
            return Err(Fault::StreamNotFound(self.id.clone()));
        }
        *self.last_fetch.lock() = Instant::now();

        let mut guard = self.source.lock().await;
        let data = match guard.as_mut() {
            None => return Err(Fault::StreamNotFound(self.id.clone())),
            Some(Source::File(file)) => read_range(file, offset, length).await?,
            Some(Source::Bytes(data)) => std::mem::take(data),
            Some(Source::Reader(reader)) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Bytes::from(buf)
            }
            Some(Source::Channel(receiver)) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = receiver.recv().await {
                    buf.extend_from_slice(&chunk);
                }
                buf.freeze()
            }
        };

        let served = self.served.fetch_add(data.len() as u64, Ordering::AcqRel) + data.len() as u64;
        let exhausted = !self.is_file || served >= self.size;
        if exhausted {
            guard.take();
        }
        Ok((data, exhausted))
    }

    /// Releases the source, stops the watchdog and leaves the registry.
    /// Safe to call repeatedly.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut source) = self.source.try_lock() {
            source.take();
        }
        if let Some(task) = self.watchdog.lock().take() {
            task.abort();
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.streams.write().remove(&self.id);
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("is_file", &self.is_file)
            .field("served", &self.served.load(Ordering::Relaxed))
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

async fn read_range(file: &mut File, offset: u64, length: u64) -> Result<Bytes, Fault> {
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = Vec::with_capacity(usize::try_from(length).unwrap_or(0).min(1 << 22));
    file.take(length).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}
