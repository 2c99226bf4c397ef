// Module audio - Audio clock capability, CPAL backend and click rendering

pub mod click;
pub mod device;
pub mod dsp_utils;
pub mod engine;
pub mod offline;
pub mod parameters;
pub mod status;
pub mod timing;

use crate::sequencer::timeline::Accent;
use thiserror::Error;

/// Audio backend errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio device configuration error: {0}")]
    DeviceConfig(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Error in stream creation: {0}")]
    StreamBuild(String),

    #[error("Error in stream beginning: {0}")]
    StreamPlay(String),

    #[error("Audio clock unavailable: {0}")]
    Unavailable(String),
}

pub type AudioResult<T> = Result<T, AudioError>;

/// A precise, monotonic time source that can also sound clicks at exact times
///
/// Timestamps are seconds in the clock's own domain (not wall-clock time).
pub trait AudioClock {
    /// Current audio time in seconds
    fn now(&self) -> f64;

    /// Sound a click of the given accent starting exactly at `at`.
    ///
    /// The click must begin at that timestamp, not when this method is called.
    /// A timestamp already in the past sounds as soon as possible.
    fn schedule_click(&mut self, at: f64, accent: Accent);

    /// True when the platform paused the clock (it must be resumed before use)
    fn is_suspended(&self) -> bool {
        false
    }

    /// True when the clock died (device lost, stream error) and must be reopened
    fn is_failed(&self) -> bool {
        false
    }

    /// Resume a suspended clock
    fn resume(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// Lazily creates the audio clock resource
pub trait AudioClockProvider {
    type Clock: AudioClock;

    fn open(&mut self) -> AudioResult<Self::Clock>;
}
