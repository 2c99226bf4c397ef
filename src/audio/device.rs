// CPAL audio output device management

use super::{AudioError, AudioResult};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

#[derive(Clone, Debug)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List every available audio output device
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let mut devices = Vec::new();

        let default_name = self
            .host
            .default_output_device()
            .as_ref()
            .and_then(|d| d.name().ok())
            .unwrap_or_default();

        if let Ok(output_devices) = self.host.output_devices() {
            for (index, device) in output_devices.enumerate() {
                if let Ok(name) = device.name() {
                    let is_default = name == default_name;
                    devices.push(AudioDeviceInfo {
                        id: format!("audio_out_{}", index),
                        name,
                        is_default,
                    });
                }
            }
        }

        devices
    }

    pub fn get_default_output_device(&self) -> Option<Device> {
        self.host.default_output_device()
    }

    pub fn get_output_device_by_name(&self, device_name: &str) -> Option<Device> {
        let devices = self.host.output_devices().ok()?;
        devices
            .into_iter()
            .find(|device| device.name().map(|n| n == device_name).unwrap_or(false))
    }

    /// Pick the configured device, falling back to the default output.
    pub fn resolve(&self, device_name: Option<&str>) -> AudioResult<Device> {
        if let Some(name) = device_name {
            if let Some(device) = self.get_output_device_by_name(name) {
                return Ok(device);
            }
            log::warn!("Output device '{}' not found, using default output", name);
        }

        self.get_default_output_device().ok_or(AudioError::NoDevice)
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
