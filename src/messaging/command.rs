// Commands - Scheduler → audio thread

use crate::sequencer::timeline::Accent;

/// A click the audio callback must start at an exact frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledClick {
    /// Absolute frame index (audio-clock domain) where the click begins
    pub at_sample: u64,
    pub accent: Accent,
}
