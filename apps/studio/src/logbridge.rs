//! Log Bridge — mirrors `tracing` records into a live log panel.
//!
//! `LogBridge::layer()` is installed once in the global subscriber and is inert
//! until a display is attached. `attach` returns a guard; while it lives, every
//! INFO-or-more-severe record is appended to a buffer and the display is
//! re-rendered with the whole buffer under a fresh key. Dropping the guard
//! detaches the display, so later records go nowhere.

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

/// Snapshot pushed to a display. `key` increases by one per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogUpdate {
    pub key: u64,
    pub text: String,
}

/// Something that can show the accumulated log text.
pub trait LogDisplay: Send + Sync {
    fn show(&self, update: &LogUpdate);
}

struct Capture {
    display: Arc<dyn LogDisplay>,
    lines: Vec<String>,
    counter: u64,
}

#[derive(Clone, Default)]
pub struct LogBridge {
    slot: Arc<Mutex<Option<Capture>>>,
}

impl LogBridge {
    pub fn layer(&self) -> LogBridgeLayer {
        LogBridgeLayer {
            bridge: self.clone(),
        }
    }

    /// Starts forwarding records to `display` with an empty buffer.
    pub fn attach(&self, display: Arc<dyn LogDisplay>) -> LogBridgeGuard {
        *self.lock() = Some(Capture {
            display,
            lines: Vec::new(),
            counter: 0,
        });
        LogBridgeGuard {
            bridge: self.clone(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    fn detach(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<Capture>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, line: String) {
        // The display is called outside the lock so it may log without deadlocking.
        let (display, update) = {
            let mut slot = self.lock();
            let Some(capture) = slot.as_mut() else {
                return;
            };
            capture.lines.push(line);
            capture.counter += 1;
            (
                Arc::clone(&capture.display),
                LogUpdate {
                    key: capture.counter,
                    text: capture.lines.join("\n"),
                },
            )
        };
        display.show(&update);
    }
}

/// Detaches the display when dropped.
#[must_use = "the display is detached as soon as the guard is dropped"]
pub struct LogBridgeGuard {
    bridge: LogBridge,
}

impl Drop for LogBridgeGuard {
    fn drop(&mut self) {
        self.bridge.detach();
    }
}

pub struct LogBridgeLayer {
    bridge: LogBridge,
}

impl<S: Subscriber> Layer<S> for LogBridgeLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO || !self.bridge.is_attached() {
            return;
        }
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        self.bridge.publish(format_record(level, &visitor.finish()));
    }
}

/// `2024-05-01 09:30:12,345 - INFO - message`
fn format_record(level: Level, message: &str) -> String {
    format!(
        "{} - {} - {}",
        Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
        level,
        message
    )
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    fields: String,
}

impl RecordVisitor {
    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Display backed by a watch channel; the page follows it over SSE.
pub struct ChannelDisplay {
    tx: watch::Sender<LogUpdate>,
}

impl ChannelDisplay {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LogUpdate::default());
        Self { tx }
    }

    /// Updates shown after this call. The value already in the channel is
    /// skipped, so a new follower never replays the previous run's log.
    pub fn changes(&self) -> WatchStream<LogUpdate> {
        WatchStream::from_changes(self.tx.subscribe())
    }
}

impl Default for ChannelDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDisplay for ChannelDisplay {
    fn show(&self, update: &LogUpdate) {
        self.tx.send_replace(update.clone());
    }
}

/// Forwards to another display and remembers the latest update.
pub struct SnapshotDisplay {
    inner: Arc<dyn LogDisplay>,
    latest: Mutex<Option<LogUpdate>>,
}

impl SnapshotDisplay {
    pub fn new(inner: Arc<dyn LogDisplay>) -> Self {
        Self {
            inner,
            latest: Mutex::new(None),
        }
    }

    pub fn latest(&self) -> Option<LogUpdate> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogDisplay for SnapshotDisplay {
    fn show(&self, update: &LogUpdate) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(update.clone());
        self.inner.show(update);
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    #[derive(Default)]
    pub struct RecordingDisplay {
        updates: Mutex<Vec<LogUpdate>>,
    }

    impl RecordingDisplay {
        pub fn updates(&self) -> Vec<LogUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl LogDisplay for RecordingDisplay {
        fn show(&self, update: &LogUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }
    }
}
