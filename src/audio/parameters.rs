// Atomic parameters - Lock-free communication UI ↔ Audio thread
// Uses atomic operations to share parameters between threads without locks

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe f32 parameter using atomic operations
/// Converts f32 to u32 bits for atomic storage
#[derive(Clone)]
pub struct AtomicF32 {
    inner: Arc<AtomicU32>,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            inner: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    /// Set the value (called from UI thread)
    pub fn set(&self, value: f32) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get the value (called from audio thread)
    pub fn get(&self) -> f32 {
        f32::from_bits(self.inner.load(Ordering::Relaxed))
    }
}

impl Default for AtomicF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Master click volume shared with the audio callback, always in [0, 1]
#[derive(Clone)]
pub struct ClickVolume {
    value: AtomicF32,
}

impl ClickVolume {
    pub const DEFAULT: f32 = 0.5;

    pub fn new(volume: f32) -> Self {
        Self {
            value: AtomicF32::new(Self::sanitize(volume)),
        }
    }

    pub fn set(&self, volume: f32) {
        self.value.set(Self::sanitize(volume));
    }

    pub fn get(&self) -> f32 {
        self.value.get()
    }

    fn sanitize(volume: f32) -> f32 {
        if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            Self::DEFAULT
        }
    }
}

impl Default for ClickVolume {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}
