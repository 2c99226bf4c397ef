// Timeline - Musical time vocabulary for the metronome
// Subdivisions, step sizes, accent tiers and the interval math between clicks

use std::fmt;

/// Beats in one bar. The metronome only runs in common time (4/4).
pub const BEATS_PER_BAR: u32 = 4;

/// Number of clicks per beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Subdivision {
    /// One click per beat
    #[default]
    Quarter,
    /// Two clicks per beat
    Eighth,
    /// Four clicks per beat
    Sixteenth,
}

impl Subdivision {
    pub const ALL: [Subdivision; 3] = [
        Subdivision::Quarter,
        Subdivision::Eighth,
        Subdivision::Sixteenth,
    ];

    /// Clicks per beat
    pub fn count(&self) -> u32 {
        match self {
            Subdivision::Quarter => 1,
            Subdivision::Eighth => 2,
            Subdivision::Sixteenth => 4,
        }
    }

    /// Parse a raw clicks-per-beat value. Anything outside {1, 2, 4} is rejected.
    pub fn from_count(count: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.count() == count)
    }

    /// Short label used by the subdivision selector
    pub fn label(&self) -> &'static str {
        match self {
            Subdivision::Quarter => "♩",
            Subdivision::Eighth => "♪♪",
            Subdivision::Sixteenth => "♬♬",
        }
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.count() * 4)
    }
}

/// Increment used by the tempo nudge buttons and the slider grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum StepSize {
    One,
    #[default]
    Five,
    Ten,
}

impl StepSize {
    /// Cycling order of the step pill
    pub const ALL: [StepSize; 3] = [StepSize::One, StepSize::Five, StepSize::Ten];

    pub fn bpm(&self) -> u32 {
        match self {
            StepSize::One => 1,
            StepSize::Five => 5,
            StepSize::Ten => 10,
        }
    }

    pub fn from_bpm(bpm: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.bpm() == bpm)
    }

    /// Neighbour in the cycling order, wrapping at both ends
    pub fn cycled(&self, direction: i32) -> Self {
        let len = Self::ALL.len() as i32;
        let index = Self::ALL.iter().position(|s| s == self).unwrap_or(0) as i32;
        let next = (index + direction).rem_euclid(len);
        Self::ALL[next as usize]
    }

    /// Round `bpm` to the nearest multiple of this step (halves round up)
    pub fn snap(&self, bpm: u32) -> u32 {
        let step = self.bpm();
        ((bpm + step / 2) / step) * step
    }
}

impl fmt::Display for StepSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm())
    }
}

/// Accent level of a click, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accent {
    /// First sub-step of the first beat of a bar
    Bar,
    /// First sub-step of any other beat
    Beat,
    /// Any other sub-step
    SubStep,
}

impl Accent {
    /// Accent for a position inside the bar
    pub fn at(sub_step: u32, beat_in_bar: u32) -> Self {
        match (sub_step, beat_in_bar) {
            (0, 0) => Accent::Bar,
            (0, _) => Accent::Beat,
            _ => Accent::SubStep,
        }
    }

    /// True for the first click of a beat (bar accents included)
    pub fn is_beat(&self) -> bool {
        matches!(self, Accent::Bar | Accent::Beat)
    }

    pub fn is_bar(&self) -> bool {
        matches!(self, Accent::Bar)
    }
}

/// Duration of one beat in seconds
#[inline]
pub fn beat_duration_seconds(tempo: u32) -> f64 {
    60.0 / tempo as f64
}

/// Spacing between two consecutive clicks in seconds
#[inline]
pub fn click_interval_seconds(tempo: u32, subdivision: Subdivision) -> f64 {
    beat_duration_seconds(tempo) / subdivision.count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivision_counts() {
        assert_eq!(Subdivision::Quarter.count(), 1);
        assert_eq!(Subdivision::Eighth.count(), 2);
        assert_eq!(Subdivision::Sixteenth.count(), 4);

        assert_eq!(Subdivision::from_count(2), Some(Subdivision::Eighth));
        assert_eq!(Subdivision::from_count(3), None);
        assert_eq!(Subdivision::from_count(0), None);
    }

    #[test]
    fn test_step_size_cycling_wraps() {
        assert_eq!(StepSize::One.cycled(1), StepSize::Five);
        assert_eq!(StepSize::Ten.cycled(1), StepSize::One);
        assert_eq!(StepSize::One.cycled(-1), StepSize::Ten);
        assert_eq!(StepSize::Five.cycled(3), StepSize::Five);
    }

    #[test]
    fn test_step_snap_rounds_half_up() {
        assert_eq!(StepSize::Five.snap(123), 125);
        assert_eq!(StepSize::Five.snap(122), 120);
        assert_eq!(StepSize::Ten.snap(125), 130);
        assert_eq!(StepSize::Ten.snap(124), 120);
        assert_eq!(StepSize::One.snap(97), 97);
    }

    #[test]
    fn test_accent_tiers() {
        assert_eq!(Accent::at(0, 0), Accent::Bar);
        assert_eq!(Accent::at(0, 3), Accent::Beat);
        assert_eq!(Accent::at(1, 0), Accent::SubStep);
        assert!(Accent::Bar.is_beat());
        assert!(!Accent::SubStep.is_beat());
        assert!(!Accent::Beat.is_bar());
    }

    #[test]
    fn test_click_interval() {
        assert_eq!(click_interval_seconds(120, Subdivision::Quarter), 0.5);
        assert_eq!(click_interval_seconds(120, Subdivision::Eighth), 0.25);
        assert_eq!(click_interval_seconds(60, Subdivision::Sixteenth), 0.25);
    }
}
