//! Trial clock and delayed-action scheduling
//!
//! All trial timing runs off a monotonic millisecond clock and a queue of
//! cancellable delayed actions. Nothing here spawns threads or blocks: the
//! host drains due actions from its own event loop, so every mutation stays
//! on one logical thread.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of monotonic millisecond timestamps.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic clock backed by `Instant`, anchored at construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for headless drivers and tests.
///
/// Clones share the same underlying time, so a test can hold one clone while
/// the sequencer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

/// Handle to a scheduled action. Ids are never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

/// Queue of pending delayed actions.
///
/// Invariants: a cancelled entry never fires; a fired entry is removed
/// before its action is handed back, so it fires exactly once; `cancel` is
/// idempotent and safe for already-fired ids.
#[derive(Debug)]
pub struct TimerQueue<A> {
    entries: Vec<TimerEntry<A>>,
    next_id: u64,
}

#[derive(Debug)]
struct TimerEntry<A> {
    id: TimerId,
    due_at_ms: u64,
    action: A,
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `action` to fire once `delay_ms` has elapsed past `now_ms`.
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TimerEntry {
            id,
            due_at_ms: now_ms + delay_ms,
            action,
        });
        id
    }

    /// Cancel a pending entry. No-op if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Cancel everything pending. Teardown path: after this, no scheduled
    /// action can reach the caller.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Remove and return every entry due at `now_ms`, ordered by due time
    /// (schedule order breaks ties, since ids increase monotonically).
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<A> {
        let mut due: Vec<TimerEntry<A>> = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].due_at_ms <= now_ms {
                due.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|e| (e.due_at_ms, e.id.0));
        due.into_iter().map(|e| e.action).collect()
    }

    /// Earliest pending deadline, if any.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due_at_ms).min()
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}
