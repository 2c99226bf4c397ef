// Session - Transport + scheduler pair driven by a polling event loop
// This is the one object the UI binding layer (egui app, CLI) talks to

use std::time::{Duration, Instant};

use super::metronome::{BeatRenderer, MetronomeScheduler, PulseRenderer, SchedulerTiming};
use super::timeline::{StepSize, Subdivision};
use super::timer::DeadlineTimer;
use super::transport::TransportState;
use crate::audio::AudioClockProvider;

pub struct MetronomeSession<P, V>
where
    P: AudioClockProvider,
{
    transport: TransportState,
    scheduler: MetronomeScheduler<P, DeadlineTimer, V>,
}

impl<P, V> MetronomeSession<P, V>
where
    P: AudioClockProvider,
    V: PulseRenderer + BeatRenderer,
{
    pub fn new(provider: P, visuals: V, timing: SchedulerTiming) -> Self {
        Self::with_transport(TransportState::new(), provider, visuals, timing)
    }

    pub fn with_transport(
        transport: TransportState,
        provider: P,
        visuals: V,
        timing: SchedulerTiming,
    ) -> Self {
        Self {
            transport,
            scheduler: MetronomeScheduler::new(provider, DeadlineTimer::new(), visuals, timing),
        }
    }

    // -------------------------------
    // MARK: Start / Stop
    // -------------------------------

    pub fn start(&mut self) -> bool {
        self.scheduler.start(&self.transport)
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Start/stop button. Returns whether the metronome is playing afterwards.
    pub fn toggle(&mut self) -> bool {
        if self.scheduler.is_playing() {
            self.stop();
            false
        } else {
            self.start()
        }
    }

    pub fn prime(&mut self) -> bool {
        self.scheduler.prime()
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    // -------------------------------
    // MARK: Event loop
    // -------------------------------

    /// Service the coarse timer. Call this from the host loop as often as
    /// convenient; the tick only runs once its deadline has passed.
    pub fn poll(&mut self, now: Instant) {
        if let Some(handle) = self.scheduler.timer_mut().take_due(now) {
            self.scheduler.on_timer(handle, &self.transport);
        }
    }

    /// How long the host loop may sleep before the next `poll` is useful
    pub fn time_until_next_poll(&self, now: Instant) -> Option<Duration> {
        self.scheduler.timer().time_until_due(now)
    }

    // -------------------------------
    // MARK: Transport
    // -------------------------------

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn set_tempo(&mut self, value: u32) -> u32 {
        self.transport.set_tempo(value)
    }

    pub fn nudge_tempo(&mut self, direction: i32) -> u32 {
        self.transport.nudge_tempo(direction)
    }

    pub fn set_step_size(&mut self, step_size: StepSize) -> u32 {
        self.transport.set_step_size(step_size)
    }

    pub fn cycle_step_size(&mut self, direction: i32) -> StepSize {
        self.transport.cycle_step_size(direction)
    }

    pub fn set_range(&mut self, min: u32, max: u32) -> (u32, u32) {
        self.transport.set_range(min, max)
    }

    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.transport.set_subdivision(subdivision);
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    pub fn scheduler(&self) -> &MetronomeScheduler<P, DeadlineTimer, V> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut MetronomeScheduler<P, DeadlineTimer, V> {
        &mut self.scheduler
    }

    pub fn visuals(&self) -> &V {
        self.scheduler.visuals()
    }

    pub fn visuals_mut(&mut self) -> &mut V {
        self.scheduler.visuals_mut()
    }
}
