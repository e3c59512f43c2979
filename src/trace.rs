//! Satisfaction tracing shared by every rule
//!
//! Concrete rules stay pure; wrapping one in [`Traced`] forwards each
//! `(rule, index, satisfied)` result to a [`TraceSink`] after the rule has
//! been evaluated. Sinks cannot fail an evaluation.
//!
//! # Example
//!
//! ```rust
//! use tarules::prelude::*;
//!
//! let closes = [1.0, 2.0, 3.0];
//! let log = TraceLog::with_capacity(2);
//! let rule = IsRisingRule::strict(&closes[..], 1).unwrap().traced(&log);
//!
//! for i in 0..closes.len() {
//!     rule.is_satisfied(i, &NoTrades);
//! }
//!
//! // Oldest entry was evicted
//! let entries = log.entries();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[0].index, 1);
//! assert_eq!(log.evicted(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Rule, RuleId, TradingRecord};

/// One evaluation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TraceEntry {
    pub rule: RuleId,
    pub index: usize,
    pub satisfied: bool,
}

/// Destination for evaluation outcomes.
///
/// `record` returns nothing: a sink that cannot store an entry drops it.
pub trait TraceSink: Send + Sync {
    fn record(&self, entry: TraceEntry);
}

/// No sink
impl TraceSink for () {
    #[inline]
    fn record(&self, _entry: TraceEntry) {}
}

impl<S: TraceSink + ?Sized> TraceSink for &S {
    #[inline]
    fn record(&self, entry: TraceEntry) {
        (**self).record(entry)
    }
}

impl<S: TraceSink + ?Sized> TraceSink for std::sync::Arc<S> {
    #[inline]
    fn record(&self, entry: TraceEntry) {
        (**self).record(entry)
    }
}

// ============================================================
// LOG SINK
// ============================================================

/// Emits a `TRACE` level `tracing` event per evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    #[inline]
    fn record(&self, entry: TraceEntry) {
        tracing::trace!(
            rule = entry.rule.as_str(),
            index = entry.index,
            satisfied = entry.satisfied,
            "is_satisfied"
        );
    }
}

// ============================================================
// IN-MEMORY LOG
// ============================================================

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<TraceEntry>,
    evicted: u64,
}

/// Bounded in-memory trace log.
///
/// When full, the oldest entry is evicted and counted. A panic while the
/// lock is held does not disable the log: later calls recover the guard and
/// keep recording.
#[derive(Debug)]
pub struct TraceLog {
    capacity: usize,
    state: Mutex<LogState>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl TraceLog {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Capacity of 0 keeps nothing and counts every entry as evicted.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LogState {
                entries: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
                evicted: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn guard(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.guard().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries dropped because the log was full
    pub fn evicted(&self) -> u64 {
        self.guard().evicted
    }

    /// Snapshot, oldest first
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.guard().entries.iter().copied().collect()
    }

    /// Most recent entry for `index`, if still retained
    pub fn last_at(&self, index: usize) -> Option<TraceEntry> {
        self.guard().entries.iter().rev().find(|e| e.index == index).copied()
    }

    /// Remove and return all entries
    pub fn drain(&self) -> Vec<TraceEntry> {
        self.guard().entries.drain(..).collect()
    }
}

impl TraceSink for TraceLog {
    fn record(&self, entry: TraceEntry) {
        let mut state = self.guard();
        if self.capacity == 0 {
            state.evicted += 1;
            return;
        }
        if state.entries.len() == self.capacity {
            state.entries.pop_front();
            state.evicted += 1;
        }
        state.entries.push_back(entry);
    }
}

// ============================================================
// DECORATOR
// ============================================================

/// Rule wrapper forwarding every result to a sink.
#[derive(Debug, Clone)]
pub struct Traced<R, S = LogSink> {
    inner: R,
    sink: S,
}

impl<R: Rule, S: TraceSink> Traced<R, S> {
    pub fn new(inner: R, sink: S) -> Self {
        Self { inner, sink }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Rule, S: TraceSink> Rule for Traced<R, S> {
    fn id(&self) -> RuleId {
        self.inner.id()
    }

    fn is_satisfied(&self, index: usize, record: &dyn TradingRecord) -> bool {
        let satisfied = self.inner.is_satisfied(index, record);
        self.sink.record(TraceEntry {
            rule: self.inner.id(),
            index,
            satisfied,
        });
        satisfied
    }
}

// ============================================================
// TESTS
// ============================================================
