// Audio timing - Sample counter shared between the audio callback and the clock

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared audio timing state: the audio-clock domain of the CPAL backend
#[derive(Clone)]
pub struct AudioTiming {
    /// Frames rendered since the stream started (incremented by audio callback)
    sample_position: Arc<AtomicU64>,
    /// Sample rate (for timestamp conversions)
    sample_rate: f64,
}

impl AudioTiming {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate,
        }
    }

    /// Current sample position (called from the scheduler thread)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Acquire)
    }

    /// Current audio time in seconds
    pub fn current_seconds(&self) -> f64 {
        self.sample_to_seconds(self.current_sample())
    }

    /// Advance sample position (called from audio callback)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Release);
    }

    /// Convert an audio-clock timestamp into the index of the frame where it starts.
    /// Negative timestamps map to frame 0.
    pub fn seconds_to_sample(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            0
        } else {
            (seconds * self.sample_rate).round() as u64
        }
    }

    pub fn sample_to_seconds(&self, sample: u64) -> f64 {
        sample as f64 / self.sample_rate
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
