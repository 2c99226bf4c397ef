// Offline audio clock - Manually advanced clock that records scheduled clicks
// Used by tests, benchmarks and anything that must run without an audio device

use super::{AudioClock, AudioClockProvider, AudioError, AudioResult};
use crate::sequencer::timeline::Accent;

/// A click as it was handed to the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedClick {
    pub at: f64,
    pub accent: Accent,
}

/// Audio clock whose time only moves when told to
#[derive(Debug, Clone, Default)]
pub struct OfflineClock {
    now: f64,
    suspended: bool,
    failed: bool,
    resume_count: usize,
    clicks: Vec<RecordedClick>,
}

impl OfflineClock {
    pub fn new(start_time: f64) -> Self {
        Self {
            now: start_time,
            ..Self::default()
        }
    }

    /// Move time forward. Negative steps are ignored so the clock stays monotonic.
    pub fn advance(&mut self, seconds: f64) {
        if seconds > 0.0 && !self.failed {
            self.now += seconds;
        }
    }

    /// Every click scheduled so far, in scheduling order
    pub fn clicks(&self) -> &[RecordedClick] {
        &self.clicks
    }

    /// Drain the recorded clicks
    pub fn take_clicks(&mut self) -> Vec<RecordedClick> {
        std::mem::take(&mut self.clicks)
    }

    /// Simulate the platform pausing the clock
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Simulate the device dying: time stops and the clock reports itself failed
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// How many times the clock was resumed after a suspension
    pub fn resume_count(&self) -> usize {
        self.resume_count
    }
}

impl AudioClock for OfflineClock {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule_click(&mut self, at: f64, accent: Accent) {
        self.clicks.push(RecordedClick { at, accent });
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn is_failed(&self) -> bool {
        self.failed
    }

    fn resume(&mut self) -> AudioResult<()> {
        if self.suspended {
            self.suspended = false;
            self.resume_count += 1;
        }
        Ok(())
    }
}

/// Hands out offline clocks, optionally pretending no device is available
#[derive(Debug, Clone)]
pub struct OfflineClockProvider {
    available: bool,
    open_count: usize,
}

impl OfflineClockProvider {
    pub fn new() -> Self {
        Self {
            available: true,
            open_count: 0,
        }
    }

    /// A provider whose every `open` fails
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Number of clocks successfully created
    pub fn open_count(&self) -> usize {
        self.open_count
    }
}

impl Default for OfflineClockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClockProvider for OfflineClockProvider {
    type Clock = OfflineClock;

    fn open(&mut self) -> AudioResult<OfflineClock> {
        if !self.available {
            return Err(AudioError::Unavailable(
                "offline clock disabled".to_string(),
            ));
        }
        self.open_count += 1;
        Ok(OfflineClock::new(0.0))
    }
}
