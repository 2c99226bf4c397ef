// Tempo Pulse - Library exports for the binaries, tests and benchmarks

pub mod audio;
pub mod config;
pub mod messaging;
pub mod sequencer;
pub mod ui;

// Re-export commonly used types for convenience
pub use audio::engine::{CpalAudioClock, CpalClockProvider};
pub use audio::offline::{OfflineClock, OfflineClockProvider};
pub use audio::timing::AudioTiming;
pub use audio::{AudioClock, AudioClockProvider, AudioError, AudioResult};
pub use config::{ConfigError, MetronomeConfig};
pub use messaging::channels::{create_click_channel, create_notification_channel};
pub use sequencer::{
    Accent, BeatRenderer, LogVisuals, MetronomeScheduler, MetronomeSession, NoVisuals,
    PulseRenderer, SchedulerTiming, StepSize, Subdivision, TransportState,
};
