// Metronome - Look-ahead click scheduler
//
// A coarse, jitter-prone timer decides WHEN we look for work. Each time it
// fires, every click falling inside the look-ahead horizon is handed to the
// audio clock with its exact timestamp, so a late timer never moves a click.
//
// Click spacing is read from the transport at the moment the position
// advances: a tempo or subdivision change applies from the next unscheduled
// click onward and never rewrites clicks already handed to the clock.

use std::time::Duration;

use super::timeline::{click_interval_seconds, Accent, Subdivision, BEATS_PER_BAR};
use super::timer::{CoarseTimer, TimerHandle};
use super::transport::TransportState;
use crate::audio::{AudioClock, AudioClockProvider, AudioError, AudioResult};

/// Renders the transient visual flash of each click
pub trait PulseRenderer {
    fn pulse(&mut self, accent: Accent);
}

/// Marks which beat of the bar is currently live
pub trait BeatRenderer {
    fn show_beat(&mut self, beat_index: u32, bar_accent: bool);
}

/// Visual sink that draws nothing (headless runs, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVisuals;

impl PulseRenderer for NoVisuals {
    fn pulse(&mut self, _accent: Accent) {}
}

impl BeatRenderer for NoVisuals {
    fn show_beat(&mut self, _beat_index: u32, _bar_accent: bool) {}
}

/// Visual sink that writes beats to the log (CLI)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogVisuals;

impl PulseRenderer for LogVisuals {
    fn pulse(&mut self, accent: Accent) {
        log::trace!("pulse {:?}", accent);
    }
}

impl BeatRenderer for LogVisuals {
    fn show_beat(&mut self, beat_index: u32, bar_accent: bool) {
        if bar_accent {
            log::info!("● beat {}", beat_index + 1);
        } else {
            log::info!("○ beat {}", beat_index + 1);
        }
    }
}

/// Fixed timing constants of the look-ahead loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerTiming {
    /// How often the coarse timer re-checks for due clicks
    pub lookahead: Duration,
    /// How far past "now" clicks are scheduled on each check (seconds)
    pub schedule_ahead: f64,
    /// Lead time before the first click after start (seconds)
    pub start_latency: f64,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            lookahead: Duration::from_millis(25),
            schedule_ahead: 0.1,
            start_latency: 0.1,
        }
    }
}

/// Musical position of the next unscheduled click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerPosition {
    /// Index of the click inside the current beat
    pub sub_step: u32,
    /// Index of the beat inside the current bar
    pub beat_in_bar: u32,
    /// Audio-clock timestamp of the next click (seconds)
    pub next_event_time: f64,
}

impl SchedulerPosition {
    fn at(start_time: f64) -> Self {
        Self {
            sub_step: 0,
            beat_in_bar: 0,
            next_event_time: start_time,
        }
    }

    pub fn accent(&self) -> Accent {
        Accent::at(self.sub_step, self.beat_in_bar)
    }

    /// Step to the following click using the tempo and subdivision in effect now
    fn advance(&mut self, tempo: u32, subdivision: Subdivision) {
        self.next_event_time += click_interval_seconds(tempo, subdivision);

        // `>=` so that a switch to a coarser subdivision mid-beat wraps on the next click
        self.sub_step += 1;
        if self.sub_step >= subdivision.count() {
            self.sub_step = 0;
            self.beat_in_bar = (self.beat_in_bar + 1) % BEATS_PER_BAR;
        }
    }
}

/// Look-ahead scheduler: Stopped / Playing state machine plus the tick loop
///
/// This struct is single-threaded. It owns the audio clock (created lazily on
/// first use and reused afterwards), the coarse timer and the visual sinks.
/// The transport is passed in explicitly on every call that needs it.
pub struct MetronomeScheduler<P, T, V>
where
    P: AudioClockProvider,
{
    provider: P,
    clock: Option<P::Clock>,
    timer: T,
    visuals: V,
    timing: SchedulerTiming,
    position: SchedulerPosition,
    playing: bool,
    pending_timer: Option<TimerHandle>,
    last_click_time: Option<f64>,
    last_error: Option<AudioError>,
}

impl<P, T, V> MetronomeScheduler<P, T, V>
where
    P: AudioClockProvider,
    T: CoarseTimer,
    V: PulseRenderer + BeatRenderer,
{
    pub fn new(provider: P, timer: T, visuals: V, timing: SchedulerTiming) -> Self {
        Self {
            provider,
            clock: None,
            timer,
            visuals,
            timing,
            position: SchedulerPosition::at(0.0),
            playing: false,
            pending_timer: None,
            last_click_time: None,
            last_error: None,
        }
    }

    // -------------------------------
    // MARK: Clock resource
    // -------------------------------

    /// Open the clock on first use, resume it if the platform suspended it,
    /// reopen it if it failed
    fn acquire_clock(&mut self) -> AudioResult<()> {
        if self.clock.as_ref().is_some_and(|clock| clock.is_failed()) {
            log::info!("Dropping failed audio clock");
            self.clock = None;
            self.last_click_time = None;
        }

        match self.clock.as_mut() {
            Some(clock) => {
                if clock.is_suspended() {
                    log::debug!("Resuming suspended audio clock");
                    clock.resume()?;
                }
            }
            None => {
                let clock = self.provider.open()?;
                log::info!("Audio clock acquired");
                self.clock = Some(clock);
            }
        }
        Ok(())
    }

    /// Drop the clock so the next start or prime opens a fresh one
    /// (after the output device changed). Stops first if playing.
    pub fn release_clock(&mut self) {
        self.stop();
        self.last_click_time = None;
        if self.clock.take().is_some() {
            log::debug!("Audio clock released");
        }
    }

    /// Acquire the clock ahead of the first start (e.g. on a first user
    /// gesture, for platforms that only grant audio after one).
    /// Returns whether the clock is ready.
    pub fn prime(&mut self) -> bool {
        match self.acquire_clock() {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                log::warn!("Audio clock priming failed: {}", err);
                self.last_error = Some(err);
                false
            }
        }
    }

    // -------------------------------
    // MARK: Transitions
    // -------------------------------

    /// Start clicking. Returns whether the scheduler is playing afterwards.
    ///
    /// No-op while already playing. If the clock cannot be acquired the
    /// scheduler stays stopped with nothing armed and the error is kept in
    /// `last_error`; calling `start` again retries the acquisition.
    pub fn start(&mut self, transport: &TransportState) -> bool {
        if self.playing {
            return true;
        }

        if let Err(err) = self.acquire_clock() {
            log::warn!("Metronome start aborted: {}", err);
            self.last_error = Some(err);
            return false;
        }
        self.last_error = None;

        let Some(clock) = self.clock.as_ref() else {
            return false;
        };

        self.position = SchedulerPosition::at(clock.now() + self.timing.start_latency);
        self.visuals.show_beat(0, true);
        self.playing = true;

        log::debug!(
            "Metronome started at {} BPM ({}), first click at {:.3}s",
            transport.tempo(),
            transport.subdivision(),
            self.position.next_event_time
        );

        self.tick(transport);
        true
    }

    /// Stop clicking. Clicks already handed to the clock still sound.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }

        self.playing = false;
        if let Some(handle) = self.pending_timer.take() {
            self.timer.cancel(handle);
        }

        log::debug!("Metronome stopped");
    }

    /// Coarse timer callback. Stray firings (after a stop, or for a handle
    /// that is no longer pending) are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, transport: &TransportState) {
        if !self.playing || self.pending_timer != Some(handle) {
            log::trace!("Ignoring stray timer {:?}", handle);
            return;
        }

        self.pending_timer = None;
        self.tick(transport);
    }

    // -------------------------------
    // MARK: Tick
    // -------------------------------

    fn tick(&mut self, transport: &TransportState) {
        if !self.playing {
            return;
        }
        let Some(clock) = self.clock.as_mut() else {
            return;
        };

        if clock.is_failed() {
            log::warn!("Audio clock failed while playing, stopping");
            self.playing = false;
            if let Some(handle) = self.pending_timer.take() {
                self.timer.cancel(handle);
            }
            self.last_error = Some(AudioError::Unavailable(
                "audio clock stopped running".to_string(),
            ));
            return;
        }

        while self.position.next_event_time < clock.now() + self.timing.schedule_ahead {
            let accent = self.position.accent();

            clock.schedule_click(self.position.next_event_time, accent);
            self.last_click_time = Some(self.position.next_event_time);

            // Visuals render now, not at the click timestamp
            self.visuals.pulse(accent);
            if accent.is_beat() {
                self.visuals
                    .show_beat(self.position.beat_in_bar, accent.is_bar());
            }

            self.position
                .advance(transport.tempo(), transport.subdivision());
        }

        if let Some(previous) = self.pending_timer.take() {
            self.timer.cancel(previous);
        }
        self.pending_timer = Some(self.timer.arm(self.timing.lookahead));
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Position of the next unscheduled click (None while stopped)
    pub fn position(&self) -> Option<SchedulerPosition> {
        self.playing.then_some(self.position)
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending_timer
    }

    /// Error of the last failed clock acquisition, cleared by a successful one
    pub fn last_error(&self) -> Option<&AudioError> {
        self.last_error.as_ref()
    }

    pub fn timing(&self) -> SchedulerTiming {
        self.timing
    }

    /// Audio-clock timestamp of the latest click handed to the clock.
    /// Kept after stop: clicks up to this time may still be sounding.
    pub fn last_click_time(&self) -> Option<f64> {
        self.last_click_time
    }

    pub fn clock(&self) -> Option<&P::Clock> {
        self.clock.as_ref()
    }

    pub fn clock_mut(&mut self) -> Option<&mut P::Clock> {
        self.clock.as_mut()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn visuals(&self) -> &V {
        &self.visuals
    }

    pub fn visuals_mut(&mut self) -> &mut V {
        &mut self.visuals
    }
}
