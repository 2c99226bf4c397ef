// Sequencer module - Metronome timing core
// Transport settings, look-ahead scheduler, coarse timer and the session tying them together

pub mod metronome;
pub mod session;
pub mod timeline;
pub mod timer;
pub mod transport;

pub use metronome::{
    BeatRenderer, LogVisuals, MetronomeScheduler, NoVisuals, PulseRenderer, SchedulerPosition,
    SchedulerTiming,
};
pub use session::MetronomeSession;
pub use timeline::{Accent, StepSize, Subdivision, BEATS_PER_BAR};
pub use timer::{CoarseTimer, DeadlineTimer, TimerHandle};
pub use transport::{TransportState, ABSOLUTE_MAX_BPM, ABSOLUTE_MIN_BPM, RANGE_STEP_BPM};
