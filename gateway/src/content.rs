//! Results produced by resources.

use bytes::Bytes;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;

/// Boxed async byte source used for reader-backed results.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Value returned by a resource.
///
/// Plain values travel inline inside an envelope. The four binary kinds
/// (file, bytes, reader, channel) are streamed: the HTTP channel writes them as
/// the response body and the remote channel parks them in the stream registry.
pub enum Content {
    /// No result.
    Empty,
    /// Inline JSON value.
    Json(Value),
    /// Server-local file.
    File(PathBuf),
    /// In-memory buffer with a display name.
    Bytes {
        /// Name reported to the client.
        name: String,
        /// Payload.
        data: Bytes,
    },
    /// Async reader of unknown length.
    Reader {
        /// Name reported to the client.
        name: String,
        /// Byte source.
        reader: ByteReader,
    },
    /// Chunks pushed by a producer task until the sender is dropped.
    Channel {
        /// Name reported to the client.
        name: String,
        /// Receiving half of the producer channel.
        receiver: mpsc::Receiver<Bytes>,
    },
}

impl Content {
    /// Inline string result.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Content::Json(Value::String(s.into()))
    }

    /// Returns `true` for the binary kinds that are streamed rather than inlined.
    #[must_use]
    pub fn is_streamable(&self) -> bool {
        matches!(
            self,
            Content::File(_) | Content::Bytes { .. } | Content::Reader { .. } | Content::Channel { .. }
        )
    }

    /// Display name of a binary result.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self {
            Content::File(path) => Some(file_name(path)),
            Content::Bytes { name, .. }
            | Content::Reader { name, .. }
            | Content::Channel { name, .. } => Some(name.clone()),
            Content::Empty | Content::Json(_) => None,
        }
    }

    /// JSON view for inline transport. Binary kinds collapse to their name.
    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Content::Empty => Value::Null,
            Content::Json(value) => value,
            other => other.name().map_or(Value::Null, Value::String),
        }
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Content::Empty,
            other => Content::Json(other),
        }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Content::Empty => write!(f, "Empty"),
            Content::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Content::File(p) => f.debug_tuple("File").field(p).finish(),
            Content::Bytes { name, data } => f
                .debug_struct("Bytes")
                .field("name", name)
                .field("len", &data.len())
                .finish(),
            Content::Reader { name, .. } => f.debug_struct("Reader").field("name", name).finish(),
            Content::Channel { name, .. } => {
                f.debug_struct("Channel").field("name", name).finish()
            }
        }
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "download".to_string(), |n| n.to_string_lossy().into_owned())
}
