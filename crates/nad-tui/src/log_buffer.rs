//! Bounded in-memory log ring fed by a tracing layer and read by the Logs view.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::Level;

pub const LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: Level,
    pub message: String,
}

/// Shared handle; clones see the same ring.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(LOG_CAPACITY)))),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, dropping the oldest once full.
    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A tracing layer that copies every event it sees into this buffer.
    pub fn layer(&self) -> LogBufferLayer {
        LogBufferLayer {
            buffer: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LogBufferLayer {
    buffer: LogBuffer,
}

impl<S> tracing_subscriber::Layer<S> for LogBufferLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.buffer.push(LogEntry {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            level: *event.metadata().level(),
            message,
        });
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{:?}", value);
        } else {
            let _ = write!(self.0, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            time: "12:00:00".into(),
            level: Level::INFO,
            message: message.into(),
        }
    }

    #[test]
    fn oldest_entries_are_dropped() {
        let buffer = LogBuffer::new();
        for i in 0..LOG_CAPACITY + 5 {
            buffer.push(entry(&i.to_string()));
        }
        let entries = buffer.entries();
        assert_eq!(entries.len(), LOG_CAPACITY);
        assert_eq!(entries[0].message, "5");
        assert_eq!(entries[LOG_CAPACITY - 1].message, (LOG_CAPACITY + 4).to_string());
    }

    #[test]
    fn layer_records_message_and_fields() {
        let buffer = LogBuffer::with_capacity(10);
        let subscriber = tracing_subscriber::registry().with(buffer.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(attempt = 2, "Retrying {}", "volume");
        });
        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].message, "Retrying volume attempt=2");
    }
}
