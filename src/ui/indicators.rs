// Indicators - Pulse dot and beat dots state
//
// The scheduler writes into this on every drained click; the egui app reads it
// each frame. The pulse reverts on its own once `pulse_duration` has elapsed.

use std::time::{Duration, Instant};

use crate::sequencer::metronome::{BeatRenderer, PulseRenderer};
use crate::sequencer::timeline::Accent;

#[derive(Debug, Clone)]
pub struct Indicators {
    pulse_duration: Duration,
    flash: Option<(Accent, Instant)>,
    beat: Option<(u32, bool)>,
}

impl Indicators {
    pub const DEFAULT_PULSE: Duration = Duration::from_millis(90);

    pub fn new(pulse_duration: Duration) -> Self {
        Self {
            pulse_duration,
            flash: None,
            beat: None,
        }
    }

    /// Accent of the pulse still lit at `now`
    pub fn active_pulse(&self, now: Instant) -> Option<Accent> {
        self.flash.and_then(|(accent, at)| {
            (now.saturating_duration_since(at) < self.pulse_duration).then_some(accent)
        })
    }

    /// Time left before the pulse goes dark
    pub fn pulse_remaining(&self, now: Instant) -> Option<Duration> {
        let (_, at) = self.flash?;
        self.pulse_duration
            .checked_sub(now.saturating_duration_since(at))
            .filter(|d| !d.is_zero())
    }

    /// Live beat index and whether it is the bar's first beat
    pub fn active_beat(&self) -> Option<(u32, bool)> {
        self.beat
    }

    /// Dark pulse and no live beat (after stop)
    pub fn clear(&mut self) {
        self.flash = None;
        self.beat = None;
    }

    fn pulse_at(&mut self, accent: Accent, at: Instant) {
        self.flash = Some((accent, at));
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PULSE)
    }
}

impl PulseRenderer for Indicators {
    fn pulse(&mut self, accent: Accent) {
        self.pulse_at(accent, Instant::now());
    }
}

impl BeatRenderer for Indicators {
    fn show_beat(&mut self, beat_index: u32, bar_accent: bool) {
        self.beat = Some((beat_index, bar_accent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_reverts_after_duration() {
        let mut indicators = Indicators::default();
        let t0 = Instant::now();
        indicators.pulse_at(Accent::Bar, t0);

        assert_eq!(indicators.active_pulse(t0), Some(Accent::Bar));
        assert_eq!(
            indicators.active_pulse(t0 + Duration::from_millis(89)),
            Some(Accent::Bar)
        );
        assert_eq!(indicators.active_pulse(t0 + Duration::from_millis(90)), None);
    }

    #[test]
    fn test_pulse_remaining() {
        let mut indicators = Indicators::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert_eq!(indicators.pulse_remaining(t0), None);

        indicators.pulse_at(Accent::Beat, t0);
        assert_eq!(
            indicators.pulse_remaining(t0 + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
        assert_eq!(indicators.pulse_remaining(t0 + Duration::from_millis(100)), None);
    }

    #[test]
    fn test_newer_pulse_replaces_older() {
        let mut indicators = Indicators::default();
        let t0 = Instant::now();
        indicators.pulse_at(Accent::Bar, t0);
        indicators.pulse_at(Accent::SubStep, t0 + Duration::from_millis(50));

        assert_eq!(
            indicators.active_pulse(t0 + Duration::from_millis(100)),
            Some(Accent::SubStep)
        );
    }

    #[test]
    fn test_show_beat_and_clear() {
        let mut indicators = Indicators::default();
        assert_eq!(indicators.active_beat(), None);

        indicators.show_beat(0, true);
        assert_eq!(indicators.active_beat(), Some((0, true)));
        indicators.show_beat(2, false);
        assert_eq!(indicators.active_beat(), Some((2, false)));

        indicators.pulse(Accent::Beat);
        indicators.clear();
        assert_eq!(indicators.active_beat(), None);
        assert_eq!(indicators.active_pulse(Instant::now()), None);
    }
}
