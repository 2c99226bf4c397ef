// Coarse timer - "check again later" callbacks for the look-ahead scheduler
// Only decides WHEN the scheduler looks for work, never when a click sounds

use std::time::{Duration, Instant};

/// Opaque handle to one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wrap a timer-specific identifier. Identifiers must be unique per timer.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// A cancellable one-shot timer primitive
///
/// The host event loop is responsible for noticing that a timer fired and
/// handing its handle back to whoever armed it.
pub trait CoarseTimer {
    /// Request one future firing after `delay`
    fn arm(&mut self, delay: Duration) -> TimerHandle;

    /// Cancel a previously armed timer. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Deadline-based timer serviced by a polling event loop
///
/// Holds at most one outstanding deadline: arming again replaces the previous one.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    next_id: u64,
    pending: Option<(TimerHandle, Instant)>,
}

impl DeadlineTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the outstanding timer, if any
    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending.map(|(handle, _)| handle)
    }

    /// Take the pending handle if its deadline has been reached at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<TimerHandle> {
        match self.pending {
            Some((handle, deadline)) if now >= deadline => {
                self.pending = None;
                Some(handle)
            }
            _ => None,
        }
    }

    /// Time left before the pending timer fires (zero if overdue, None if idle)
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, deadline)| deadline.saturating_duration_since(now))
    }

    fn arm_at(&mut self, deadline: Instant) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle::new(self.next_id);
        self.pending = Some((handle, deadline));
        handle
    }
}

impl CoarseTimer for DeadlineTimer {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        self.arm_at(Instant::now() + delay)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.pending() == Some(handle) {
            self.pending = None;
        }
    }
}
