// Transport - Tempo, range, step and subdivision settings
// Every write is clamped/snapped so readers never see an invalid combination

use super::timeline::{StepSize, Subdivision, BEATS_PER_BAR};

/// Lowest tempo the range pickers allow
pub const ABSOLUTE_MIN_BPM: u32 = 40;
/// Highest tempo the range pickers allow
pub const ABSOLUTE_MAX_BPM: u32 = 300;
/// Spacing of the candidates offered by the range pickers
pub const RANGE_STEP_BPM: u32 = 10;

/// Mutable metronome settings
///
/// This struct:
/// - is the single source of truth for tempo and its allowed range
/// - never fails: out-of-range input is corrected, not rejected
/// - contains NO timing logic (the scheduler reads it on every tick)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportState {
    tempo: u32,
    subdivision: Subdivision,
    step_size: StepSize,
    range_min: u32,
    range_max: u32,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            tempo: 100,
            subdivision: Subdivision::Quarter,
            step_size: StepSize::Five,
            range_min: 50,
            range_max: 150,
        }
    }
}

impl TransportState {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    #[inline]
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    #[inline]
    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    #[inline]
    pub fn step_size(&self) -> StepSize {
        self.step_size
    }

    #[inline]
    pub fn range(&self) -> (u32, u32) {
        (self.range_min, self.range_max)
    }

    #[inline]
    pub fn range_min(&self) -> u32 {
        self.range_min
    }

    #[inline]
    pub fn range_max(&self) -> u32 {
        self.range_max
    }

    #[inline]
    pub fn beats_per_bar(&self) -> u32 {
        BEATS_PER_BAR
    }

    // -------------------------------
    // MARK: Mutators
    // -------------------------------

    /// Set the tempo, snapped to the step grid then clamped into the range.
    /// Returns the tempo actually stored.
    ///
    /// The input is clamped once before snapping too, so a bound that is not
    /// on the step grid maps back onto itself and the operation stays idempotent.
    pub fn set_tempo(&mut self, value: u32) -> u32 {
        let bounded = value.clamp(self.range_min, self.range_max);
        let snapped = self.step_size.snap(bounded);
        self.tempo = snapped.clamp(self.range_min, self.range_max);
        self.tempo
    }

    /// Move the tempo one step up (`direction > 0`) or down (`direction < 0`)
    pub fn nudge_tempo(&mut self, direction: i32) -> u32 {
        let step = self.step_size.bpm();
        let target = match direction.signum() {
            1 => self.tempo.saturating_add(step),
            -1 => self.tempo.saturating_sub(step),
            _ => self.tempo,
        };
        self.set_tempo(target)
    }

    /// Change the nudge increment and re-snap the current tempo onto its grid
    pub fn set_step_size(&mut self, step_size: StepSize) -> u32 {
        self.step_size = step_size;
        self.set_tempo(self.tempo)
    }

    /// Advance the step pill to the next (or previous) allowed step
    pub fn cycle_step_size(&mut self, direction: i32) -> StepSize {
        let next = self.step_size.cycled(direction);
        self.set_step_size(next);
        next
    }

    /// Change the allowed tempo range.
    ///
    /// Both bounds are limited to [ABSOLUTE_MIN_BPM, ABSOLUTE_MAX_BPM]. A maximum
    /// below the minimum collapses the range onto the minimum. The current
    /// tempo is re-snapped and re-clamped afterwards.
    pub fn set_range(&mut self, min: u32, max: u32) -> (u32, u32) {
        let bounded_min = min.clamp(ABSOLUTE_MIN_BPM, ABSOLUTE_MAX_BPM);
        let bounded_max = max.min(ABSOLUTE_MAX_BPM).max(bounded_min);

        self.range_min = bounded_min;
        self.range_max = bounded_max;
        self.set_tempo(self.tempo);

        log::debug!(
            "Tempo range set to [{}, {}], tempo now {}",
            self.range_min,
            self.range_max,
            self.tempo
        );

        (self.range_min, self.range_max)
    }

    /// Change the number of clicks per beat. Only future click spacing is affected.
    pub fn set_subdivision(&mut self, subdivision: Subdivision) {
        self.subdivision = subdivision;
    }

    // -------------------------------
    // MARK: Range picker helpers
    // -------------------------------

    /// Candidates for the minimum picker: every RANGE_STEP_BPM from the
    /// absolute minimum up to the current maximum
    pub fn range_min_options(&self) -> Vec<u32> {
        (ABSOLUTE_MIN_BPM..=self.range_max)
            .step_by(RANGE_STEP_BPM as usize)
            .collect()
    }

    /// Candidates for the maximum picker: every RANGE_STEP_BPM from the
    /// current minimum up to the absolute maximum
    pub fn range_max_options(&self) -> Vec<u32> {
        (self.range_min..=ABSOLUTE_MAX_BPM)
            .step_by(RANGE_STEP_BPM as usize)
            .collect()
    }

    /// Evenly spaced tempo labels for the slider scale, from range_min to range_max
    pub fn scale_labels(&self, count: usize) -> Vec<u32> {
        match count {
            0 => Vec::new(),
            1 => vec![self.range_min],
            _ => {
                let span = (self.range_max - self.range_min) as f64;
                let step = span / (count - 1) as f64;
                (0..count)
                    .map(|i| (self.range_min as f64 + step * i as f64).round() as u32)
                    .collect()
            }
        }
    }
}
