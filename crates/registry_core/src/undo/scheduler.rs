//! Cancellable delayed actions.
//!
//! Timers never run callbacks on their own. The owner drains due handles via
//! [`Scheduler::take_due`] on its own execution context, so a `cancel` made
//! before the drain always wins over the expiry.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Opaque handle of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Schedule/cancel capability injected into timed components.
pub trait Scheduler {
    /// Arms a timer that becomes due after `delay`.
    fn arm(&mut self, delay: Duration) -> TimerHandle;

    /// Cancels an armed timer.
    ///
    /// Returns `false` when the timer already fired, was already cancelled,
    /// or is unknown. Cancelling after fire is a no-op.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Returns whether the timer has been handed out by `take_due`.
    fn has_fired(&self, handle: TimerHandle) -> bool;

    /// Marks every due, still-armed timer as fired and returns the handles
    /// ordered by deadline, then arm order.
    fn take_due(&mut self) -> Vec<TimerHandle>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Armed,
    Fired,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry<T> {
    deadline: T,
    state: TimerState,
}

/// Timer table shared by both scheduler flavors.
#[derive(Debug)]
struct TimerTable<T> {
    next_id: u64,
    timers: BTreeMap<TimerHandle, TimerEntry<T>>,
}

impl<T: Copy + Ord> TimerTable<T> {
    fn new() -> Self {
        Self {
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }

    fn arm(&mut self, deadline: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(
            handle,
            TimerEntry {
                deadline,
                state: TimerState::Armed,
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.timers.get_mut(&handle) {
            Some(entry) if entry.state == TimerState::Armed => {
                entry.state = TimerState::Cancelled;
                true
            }
            _ => false,
        }
    }

    fn has_fired(&self, handle: TimerHandle) -> bool {
        self.timers
            .get(&handle)
            .is_some_and(|entry| entry.state == TimerState::Fired)
    }

    fn take_due(&mut self, now: T) -> Vec<TimerHandle> {
        let mut due: Vec<(T, TimerHandle)> = self
            .timers
            .iter()
            .filter(|(_, entry)| entry.state == TimerState::Armed && entry.deadline <= now)
            .map(|(handle, entry)| (entry.deadline, *handle))
            .collect();
        due.sort();
        for (_, handle) in &due {
            if let Some(entry) = self.timers.get_mut(handle) {
                entry.state = TimerState::Fired;
            }
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    fn armed_count(&self) -> usize {
        self.timers
            .values()
            .filter(|entry| entry.state == TimerState::Armed)
            .count()
    }
}

/// Deterministic scheduler driven by virtual time.
#[derive(Debug)]
pub struct ManualScheduler {
    now: Duration,
    table: TimerTable<Duration>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            table: TimerTable::new(),
        }
    }

    /// Moves virtual time forward.
    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by);
    }

    /// Current virtual time since construction.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers neither fired nor cancelled.
    pub fn armed_count(&self) -> usize {
        self.table.armed_count()
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        let deadline = self.now.saturating_add(delay);
        self.table.arm(deadline)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.table.cancel(handle)
    }

    fn has_fired(&self, handle: TimerHandle) -> bool {
        self.table.has_fired(handle)
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        self.table.take_due(self.now)
    }
}

/// Wall-clock scheduler for hosts that poll from their event loop.
#[derive(Debug)]
pub struct MonotonicScheduler {
    table: TimerTable<Instant>,
}

impl Default for MonotonicScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicScheduler {
    pub fn new() -> Self {
        Self {
            table: TimerTable::new(),
        }
    }

    /// Number of timers neither fired nor cancelled.
    pub fn armed_count(&self) -> usize {
        self.table.armed_count()
    }
}

impl Scheduler for MonotonicScheduler {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        let now = Instant::now();
        let deadline = now.checked_add(delay).unwrap_or(now);
        self.table.arm(deadline)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.table.cancel(handle)
    }

    fn has_fired(&self, handle: TimerHandle) -> bool {
        self.table.has_fired(handle)
    }

    fn take_due(&mut self) -> Vec<TimerHandle> {
        self.table.take_due(Instant::now())
    }
}
