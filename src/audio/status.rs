// Audio output status shared between the callback, the clock and the UI

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Suspended = 3,
    Error = 4,
}

impl DeviceStatus {
    pub fn label(self) -> &'static str {
        match self {
            DeviceStatus::Disconnected => "No audio",
            DeviceStatus::Connecting => "Connecting",
            DeviceStatus::Connected => "Audio ready",
            DeviceStatus::Suspended => "Audio suspended",
            DeviceStatus::Error => "Audio error",
        }
    }
}

impl From<u8> for DeviceStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => DeviceStatus::Disconnected,
            1 => DeviceStatus::Connecting,
            2 => DeviceStatus::Connected,
            3 => DeviceStatus::Suspended,
            4 => DeviceStatus::Error,
            _ => DeviceStatus::Disconnected,
        }
    }
}

/// Atomic wrapper to share the status between threads
#[derive(Clone)]
pub struct AtomicDeviceStatus {
    inner: Arc<AtomicU8>,
}

impl AtomicDeviceStatus {
    pub fn new(status: DeviceStatus) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(status as u8)),
        }
    }

    pub fn get(&self) -> DeviceStatus {
        DeviceStatus::from(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, status: DeviceStatus) {
        self.inner.store(status as u8, Ordering::Relaxed);
    }
}

impl Default for AtomicDeviceStatus {
    fn default() -> Self {
        Self::new(DeviceStatus::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_u8() {
        for status in [
            DeviceStatus::Disconnected,
            DeviceStatus::Connecting,
            DeviceStatus::Connected,
            DeviceStatus::Suspended,
            DeviceStatus::Error,
        ] {
            assert_eq!(DeviceStatus::from(status as u8), status);
        }
        assert_eq!(DeviceStatus::from(42), DeviceStatus::Disconnected);
    }

    #[test]
    fn test_atomic_status_shared() {
        let status = AtomicDeviceStatus::default();
        let callback_side = status.clone();
        callback_side.set(DeviceStatus::Error);
        assert_eq!(status.get(), DeviceStatus::Error);
    }
}
