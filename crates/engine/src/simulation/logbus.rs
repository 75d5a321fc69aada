//! The log bus (§4.8.4), grounded on `simulation/logsocket.h`'s free-function
//! `logSocketMessage(level, category, message, newline)` API: every stage of
//! a simulation task appends here, and the command-socket server drains it to
//! stream frames out over the log socket. A bounded ring keeps a slow or
//! absent reader from growing this without limit.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::protocol::{LogCategory, LogLevel, LogRecord};

/// Ring capacity past which the oldest record is dropped to make room for
/// the newest — a slow reader loses history, not the task.
const CAPACITY: usize = 4096;

/// A bounded, thread-safe log ring with a condvar so a reader can block
/// until new records arrive instead of polling.
pub struct LogBus {
    state: Mutex<VecDeque<LogRecord>>,
    available: Condvar,
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBus {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(VecDeque::with_capacity(CAPACITY)), available: Condvar::new() }
    }

    /// Appends a record, dropping the oldest if the ring is full.
    pub fn push(&self, timestamp_us: u64, level: LogLevel, category: LogCategory, message: impl Into<String>) {
        let mut queue = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if queue.len() == CAPACITY {
            queue.pop_front();
        }
        queue.push_back(LogRecord { timestamp_us, level, category, message: message.into() });
        self.available.notify_all();
    }

    /// Drains every record currently queued, blocking briefly if none are
    /// available yet.
    #[must_use]
    pub fn drain(&self) -> Vec<LogRecord> {
        let mut queue = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        queue.drain(..).collect()
    }

    /// Blocks until at least one record is queued (or the condvar is spuriously
    /// woken), then drains everything.
    #[must_use]
    pub fn drain_blocking(&self) -> Vec<LogRecord> {
        let mut queue = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        while queue.is_empty() {
            queue = self.available.wait(queue).unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_drain_returns_in_order() {
        let bus = LogBus::new();
        bus.push(1, LogLevel::Info, LogCategory::Generation, "a");
        bus.push(2, LogLevel::Warning, LogCategory::Generation, "b");
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "a");
        assert_eq!(drained[1].message, "b");
    }

    #[test]
    fn ring_drops_oldest_past_capacity() {
        let bus = LogBus::new();
        for i in 0..CAPACITY + 10 {
            bus.push(i as u64, LogLevel::Debug, LogCategory::General, format!("msg{i}"));
        }
        let drained = bus.drain();
        assert_eq!(drained.len(), CAPACITY);
        assert_eq!(drained[0].message, "msg10");
    }
}
