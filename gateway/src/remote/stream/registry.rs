//! Streamed result bookkeeping with idle eviction.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use uuid::Uuid;

use super::handle::{Source, StreamHandle};
use crate::content::Content;
use crate::envelope::Fault;
use crate::infrastructure::audit::{log_audit, AuditEvent};
use crate::infrastructure::config::StreamingSettings;
use crate::remote::transport::StreamDescriptor;

pub(super) struct Inner {
    pub(super) streams: RwLock<HashMap<String, Arc<StreamHandle>>>,
    settings: StreamingSettings,
}

/// Live stream handles keyed by id, each guarded by an idle watchdog.
///
/// A handle leaves the registry when its last byte is served, when its
/// watchdog sees no fetch for the idle timeout, or on explicit
/// [`StreamRegistry::remove`]. Fetching an id that already left yields
/// [`Fault::StreamNotFound`].
#[derive(Clone)]
pub struct StreamRegistry {
    inner: Arc<Inner>,
}

impl StreamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(settings: StreamingSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                streams: RwLock::new(HashMap::new()),
                settings,
            }),
        }
    }

    /// Parks a binary result and returns its descriptor.
    ///
    /// Empty files are never registered: their descriptor has size zero and the
    /// client has nothing to fetch.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::Invocation`] for inline content, or an internal fault
    /// if a file cannot be opened.
    pub async fn open(&self, content: Content) -> Result<StreamDescriptor, Fault> {
        let id = Uuid::new_v4().to_string();
        let name = content
            .name()
            .ok_or_else(|| Fault::invocation("only binary results can be streamed"))?;

        let (size, is_file, source) = match content {
            Content::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let size = file.metadata().await?.len();
                (size, true, Source::File(file))
            }
            Content::Bytes { data, .. } => (data.len() as u64, false, Source::Bytes(data)),
            Content::Reader { reader, .. } => (0, false, Source::Reader(reader)),
            Content::Channel { receiver, .. } => (0, false, Source::Channel(receiver)),
            Content::Empty | Content::Json(_) => {
                return Err(Fault::invocation("only binary results can be streamed"))
            }
        };

        let descriptor = StreamDescriptor {
            id: id.clone(),
            name,
            size,
            is_file,
        };
        if is_file && size == 0 {
            debug!(stream_id = %id, "Empty file, nothing to register");
            return Ok(descriptor);
        }

        let handle = Arc::new(StreamHandle::new(
            id.clone(),
            size,
            is_file,
            source,
            Arc::downgrade(&self.inner),
        ));
        handle.attach_watchdog(self.spawn_watchdog(&handle));
        self.inner.streams.write().insert(id.clone(), handle);
        metrics::counter!("conduit_streams_opened_total").increment(1);
        debug!(stream_id = %id, size, is_file, "Stream registered");
        Ok(descriptor)
    }

    /// Serves `length` bytes of stream `id` from `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::StreamNotFound`] if the stream was exhausted, evicted
    /// or never existed.
    pub async fn fetch(&self, id: &str, offset: u64, length: u64) -> Result<bytes::Bytes, Fault> {
        let handle = self
            .get(id)
            .ok_or_else(|| Fault::StreamNotFound(id.to_string()))?;
        let (data, exhausted) = handle.fetch(offset, length).await?;
        metrics::counter!("conduit_bytes_served_total").increment(data.len() as u64);
        if exhausted {
            self.remove(id);
        }
        Ok(data)
    }

    /// Looks up a live handle.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<StreamHandle>> {
        self.inner.streams.read().get(id).cloned()
    }

    /// Destroys and unregisters `id`. Returns `false` if it was already gone.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.inner.streams.write().remove(id);
        match removed {
            Some(handle) => {
                handle.destroy();
                debug!(stream_id = %id, "Stream destroyed");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.streams.read().contains_key(id)
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.streams.read().len()
    }

    /// Returns `true` when no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_watchdog(&self, handle: &Arc<StreamHandle>) -> tokio::task::JoinHandle<()> {
        let registry: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle: Weak<StreamHandle> = Arc::downgrade(handle);
        let idle_timeout = self.inner.settings.idle_timeout();
        let mut ticker = tokio::time::interval(self.inner.settings.watchdog_interval());

        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let (Some(inner), Some(stream)) = (registry.upgrade(), handle.upgrade()) else {
                    break;
                };
                if stream.is_destroyed() {
                    break;
                }
                let idle = stream.idle_for();
                if idle < idle_timeout {
                    continue;
                }
                let id = stream.id().to_string();
                if inner.streams.read().contains_key(&id) {
                    let idle_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
                    info!(stream_id = %id, idle_ms, "Evicting idle stream");
                    metrics::counter!("conduit_streams_evicted_total").increment(1);
                    log_audit(&AuditEvent::StreamEvicted {
                        stream_id: id,
                        idle_ms,
                    });
                }
                drop(inner);
                stream.destroy();
                break;
            }
        })
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("live", &self.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;

    fn fast_settings() -> StreamingSettings {
        StreamingSettings::default()
            .with_idle(Duration::from_millis(100), Duration::from_millis(20))
    }

    async fn file_with(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> Content {
        let path = dir.path().join(name);
        tokio::fs::write(&path, data).await.unwrap();
        Content::File(path)
    }

    #[tokio::test]
    async fn file_stream_is_destroyed_after_last_byte() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(StreamingSettings::default());
        let desc = registry
            .open(file_with(&dir, "a.bin", b"0123456789").await)
            .await
            .unwrap();
        assert!(desc.is_file);
        assert_eq!(desc.size, 10);
        assert_eq!(desc.name, "a.bin");

        let first = registry.fetch(&desc.id, 0, 4).await.unwrap();
        let third = registry.fetch(&desc.id, 8, 4).await.unwrap();
        assert_eq!(&first[..], b"0123");
        assert_eq!(&third[..], b"89");
        assert!(registry.contains(&desc.id));

        let second = registry.fetch(&desc.id, 4, 4).await.unwrap();
        assert_eq!(&second[..], b"4567");
        assert!(!registry.contains(&desc.id));
    }

    #[tokio::test]
    async fn fetching_gone_stream_is_a_fault() {
        let registry = StreamRegistry::new(StreamingSettings::default());
        let err = registry.fetch("nope", 0, 10).await.unwrap_err();
        assert!(matches!(err, Fault::StreamNotFound(_)));
        assert!(err.to_string().contains("stream does not exist"));
    }

    #[tokio::test]
    async fn bytes_are_served_whole_once() {
        let registry = StreamRegistry::new(StreamingSettings::default());
        let desc = registry
            .open(Content::Bytes {
                name: "r.txt".into(),
                data: Bytes::from_static(b"report"),
            })
            .await
            .unwrap();
        assert!(!desc.is_file);

        let data = registry.fetch(&desc.id, 0, 2).await.unwrap();
        assert_eq!(&data[..], b"report");
        assert!(registry.fetch(&desc.id, 0, 2).await.is_err());
    }

    #[tokio::test]
    async fn channel_stream_collects_until_sender_drops() {
        let registry = StreamRegistry::new(StreamingSettings::default());
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let desc = registry
            .open(Content::Channel {
                name: "live".into(),
                receiver: rx,
            })
            .await
            .unwrap();
        assert_eq!(desc.size, 0);

        tokio::spawn(async move {
            for part in ["a", "b", "c"] {
                tx.send(Bytes::from(part)).await.unwrap();
            }
        });
        let data = registry.fetch(&desc.id, 0, 0).await.unwrap();
        assert_eq!(&data[..], b"abc");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_never_registered() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(StreamingSettings::default());
        let desc = registry.open(file_with(&dir, "empty", b"").await).await.unwrap();
        assert_eq!(desc.size, 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn idle_stream_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(fast_settings());
        let desc = registry
            .open(file_with(&dir, "idle.bin", b"abc").await)
            .await
            .unwrap();
        assert!(registry.contains(&desc.id));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(!registry.contains(&desc.id));
        let err = registry.fetch(&desc.id, 0, 3).await.unwrap_err();
        assert!(matches!(err, Fault::StreamNotFound(_)));
    }

    #[tokio::test]
    async fn fetches_keep_stream_alive() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StreamRegistry::new(fast_settings());
        let desc = registry
            .open(file_with(&dir, "busy.bin", &[7u8; 64]).await)
            .await
            .unwrap();

        for i in 0..6u64 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            registry.fetch(&desc.id, i, 1).await.unwrap();
        }
        assert!(registry.contains(&desc.id));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = StreamRegistry::new(StreamingSettings::default());
        let desc = registry
            .open(Content::Bytes {
                name: "x".into(),
                data: Bytes::from_static(b"x"),
            })
            .await
            .unwrap();
        let handle = registry.get(&desc.id).unwrap();

        assert!(registry.remove(&desc.id));
        assert!(!registry.remove(&desc.id));
        handle.destroy();
        assert!(handle.is_destroyed());
    }

    #[tokio::test]
    async fn destroying_a_handle_unregisters_it() {
        let registry = StreamRegistry::new(fast_settings());
        let desc = registry
            .open(Content::Bytes {
                name: "gone".into(),
                data: Bytes::from_static(b"payload"),
            })
            .await
            .unwrap();
        let handle = registry.get(&desc.id).unwrap();

        handle.destroy();
        handle.destroy();

        assert!(!registry.contains(&desc.id));
        assert!(registry.is_empty());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(registry.is_empty());
        let err = registry.fetch(&desc.id, 0, 7).await.unwrap_err();
        assert!(matches!(err, Fault::StreamNotFound(_)));
    }

    #[tokio::test]
    async fn inline_content_cannot_be_streamed() {
        let registry = StreamRegistry::new(StreamingSettings::default());
        let err = registry.open(Content::text("hi")).await.unwrap_err();
        assert!(matches!(err, Fault::Invocation(_)));
    }
}
