//! Chunked transfer tuning.

use serde::Deserialize;
use std::time::Duration;

/// Default chunk size for uploads and downloads (200 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 200 * 1024;
/// Default number of in-flight transfer calls.
pub const DEFAULT_WINDOW: usize = 3;
/// Default idle time before an unfetched stream is evicted.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 10_000;
/// Default watchdog tick.
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 1_000;

/// Streaming protocol settings shared by the remote channel and its clients.
///
/// Zero chunk sizes and windows are raised to one when deserialized.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(from = "RawStreamingSettings")]
pub struct StreamingSettings {
    /// Bytes per upload/download call.
    pub chunk_size: usize,
    /// Maximum in-flight calls per transfer.
    pub window: usize,
    /// Idle time in milliseconds after which a stream handle is destroyed.
    pub idle_timeout_ms: u64,
    /// Watchdog tick in milliseconds.
    pub watchdog_interval_ms: u64,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawStreamingSettings {
    chunk_size: usize,
    window: usize,
    idle_timeout_ms: u64,
    watchdog_interval_ms: u64,
}

impl Default for RawStreamingSettings {
    fn default() -> Self {
        let d = StreamingSettings::default();
        Self {
            chunk_size: d.chunk_size,
            window: d.window,
            idle_timeout_ms: d.idle_timeout_ms,
            watchdog_interval_ms: d.watchdog_interval_ms,
        }
    }
}

impl From<RawStreamingSettings> for StreamingSettings {
    fn from(raw: RawStreamingSettings) -> Self {
        Self {
            chunk_size: raw.chunk_size,
            window: raw.window,
            idle_timeout_ms: raw.idle_timeout_ms,
            watchdog_interval_ms: raw.watchdog_interval_ms,
        }
        .normalized()
    }
}

impl StreamingSettings {
    /// Copy with `chunk_size` and `window` raised to at least one.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            chunk_size: self.chunk_size.max(1),
            window: self.window.max(1),
            ..self
        }
    }

    /// Idle threshold as a [`Duration`].
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Watchdog tick as a [`Duration`].
    #[must_use]
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(1))
    }

    /// Sets the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the window depth.
    #[must_use]
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Sets the idle timeout and watchdog tick.
    #[must_use]
    pub fn with_idle(mut self, idle: Duration, tick: Duration) -> Self {
        self.idle_timeout_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX);
        self.watchdog_interval_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            window: DEFAULT_WINDOW,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_and_window_are_raised() {
        let settings: StreamingSettings =
            serde_json::from_str(r#"{"chunk_size": 0, "window": 0}"#).unwrap();
        assert_eq!(settings.chunk_size, 1);
        assert_eq!(settings.window, 1);
        assert_eq!(settings.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT_MS);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: StreamingSettings = serde_json::from_str(r#"{"window": 5}"#).unwrap();
        assert_eq!(settings.window, 5);
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
