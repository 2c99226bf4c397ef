// Audio engine - CPAL output stream acting as the metronome's audio clock
//
// # Format Support
//
// The stream is built for the device's preferred sample format:
// - **F32**: 32-bit float (native, no conversion)
// - **I16**: signed 16-bit integer (common on Windows/WASAPI)
// - **U16**: unsigned 16-bit integer
//
// Clicks are mixed in f32 and converted to the device format while writing the
// output buffer, through CPAL's `FromSample<f32>`.
//
// # Clock
//
// The audio clock is the number of frames the callback has rendered. The
// scheduler converts each click timestamp into an absolute frame index and the
// callback starts the click on exactly that frame.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send/Sync, so the clock stays on the
// thread that opened it. The error callback reports failures to the UI through
// the notification queue.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};

use crate::audio::click::ClickMixer;
use crate::audio::device::AudioDeviceManager;
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::parameters::ClickVolume;
use crate::audio::status::{AtomicDeviceStatus, DeviceStatus};
use crate::audio::timing::AudioTiming;
use crate::audio::{AudioClock, AudioClockProvider, AudioError, AudioResult};
use crate::messaging::channels::{
    ClickConsumer, ClickProducer, NotificationProducer, create_click_channel,
};
use crate::messaging::command::ScheduledClick;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::timeline::Accent;

/// Capacity of the scheduler → callback click queue
const CLICK_QUEUE_CAPACITY: usize = 256;

/// Volume smoothing time constant
const VOLUME_SMOOTHING_MS: f32 = 10.0;

/// Audio clock backed by a running CPAL output stream
pub struct CpalAudioClock {
    _device: Device,
    stream: Stream,
    timing: AudioTiming,
    click_tx: ClickProducer,
    status: AtomicDeviceStatus,
    sample_rate: f32,
}

impl CpalAudioClock {
    pub fn new(
        device: Device,
        volume: ClickVolume,
        status: AtomicDeviceStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> AudioResult<Self> {
        status.set(DeviceStatus::Connecting);

        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        log::debug!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let timing = AudioTiming::new(sample_rate as f64);
        let (click_tx, click_rx) = create_click_channel(CLICK_QUEUE_CAPACITY);

        let callback = CallbackState {
            channels,
            click_rx,
            mixer: ClickMixer::new(sample_rate),
            volume_smoother: OnePoleSmoother::new(volume.get(), VOLUME_SMOOTHING_MS, sample_rate),
            volume,
            timing: timing.clone(),
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                callback,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                callback,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                callback,
                status.clone(),
                notification_tx.clone(),
            ),
            other => {
                status.set(DeviceStatus::Error);
                return Err(AudioError::UnsupportedFormat(format!(
                    "{:?}. Supported formats: F32, I16, U16",
                    other
                )));
            }
        };

        let stream = stream.inspect_err(|_| status.set(DeviceStatus::Error))?;

        stream.play().map_err(|e| {
            status.set(DeviceStatus::Error);
            AudioError::StreamPlay(e.to_string())
        })?;

        status.set(DeviceStatus::Connected);
        log::info!("Audio clock started: {} Hz, {} channels", sample_rate, channels);

        push_notification(
            &notification_tx,
            Notification::info(
                NotificationCategory::Audio,
                format!("Audio connected: {} Hz", sample_rate),
            ),
        );

        Ok(Self {
            _device: device,
            stream,
            timing,
            click_tx,
            status,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    /// Pause the stream. The clock stops advancing until `resume`.
    pub fn suspend(&mut self) -> AudioResult<()> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        self.status.set(DeviceStatus::Suspended);
        log::debug!("Audio clock suspended");
        Ok(())
    }

    /// Build an audio stream with automatic format conversion
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut callback: CallbackState,
        status: AtomicDeviceStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> AudioResult<Stream>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // ========== SACRED ZONE ==========
                    // No allocations, No I/O, No blocking locks
                    callback.render(data);
                    // ========== SACRED ZONE END ==========
                },
                move |err| {
                    // Runs outside the audio callback, I/O is allowed here
                    log::error!("Audio stream error: {}", err);
                    status.set(DeviceStatus::Error);
                    push_notification(
                        &notification_tx,
                        Notification::error(
                            NotificationCategory::Audio,
                            format!("Audio stream error: {}", err),
                        ),
                    );
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))
    }
}

impl AudioClock for CpalAudioClock {
    fn now(&self) -> f64 {
        self.timing.current_seconds()
    }

    fn schedule_click(&mut self, at: f64, accent: Accent) {
        let click = ScheduledClick {
            at_sample: self.timing.seconds_to_sample(at),
            accent,
        };
        if self.click_tx.try_push(click).is_err() {
            log::warn!("Click queue full, dropping click at {:.3}s", at);
        }
    }

    fn is_suspended(&self) -> bool {
        self.status.get() == DeviceStatus::Suspended
    }

    fn resume(&mut self) -> AudioResult<()> {
        self.stream
            .play()
            .map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        self.status.set(DeviceStatus::Connected);
        log::debug!("Audio clock resumed");
        Ok(())
    }

    fn is_failed(&self) -> bool {
        self.status.get() == DeviceStatus::Error
    }
}

/// Everything the real-time callback owns
struct CallbackState {
    channels: usize,
    click_rx: ClickConsumer,
    mixer: ClickMixer,
    volume: ClickVolume,
    volume_smoother: OnePoleSmoother,
    timing: AudioTiming,
}

impl CallbackState {
    fn render<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        // Clicks the mixer has no room for stay in the queue for the next buffer
        while self.mixer.pending_count() < ClickMixer::MAX_PENDING {
            let Some(click) = self.click_rx.try_pop() else {
                break;
            };
            self.mixer.queue(click);
        }

        let start = self.timing.current_sample();
        let channels = self.channels.max(1);
        let mut frames = 0;

        for (i, frame) in data.chunks_mut(channels).enumerate() {
            let smoothed_volume = self.volume_smoother.process(self.volume.get());

            let mut sample = self.mixer.next_sample(start + i as u64);
            sample = flush_denormals_to_zero(sample);
            sample *= smoothed_volume;
            sample = soft_clip(sample);

            // Mono click written to every channel
            let converted = T::from_sample(sample);
            for channel_sample in frame.iter_mut() {
                *channel_sample = converted;
            }
            frames += 1;
        }

        self.timing.advance(frames);
    }
}

fn push_notification(tx: &Arc<Mutex<NotificationProducer>>, notification: Notification) {
    if let Ok(mut tx) = tx.try_lock() {
        let _ = tx.try_push(notification);
    }
}

/// Opens the CPAL audio clock on first use
pub struct CpalClockProvider {
    device_name: Option<String>,
    volume: ClickVolume,
    status: AtomicDeviceStatus,
    notification_tx: Arc<Mutex<NotificationProducer>>,
}

impl CpalClockProvider {
    pub fn new(
        device_name: Option<String>,
        volume: ClickVolume,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Self {
        Self {
            device_name,
            volume,
            status: AtomicDeviceStatus::default(),
            notification_tx,
        }
    }

    /// Volume handle shared with the callback
    pub fn volume(&self) -> &ClickVolume {
        &self.volume
    }

    /// Output status shared with the callback
    pub fn status(&self) -> &AtomicDeviceStatus {
        &self.status
    }

    /// Selected output device, None for the system default
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Takes effect the next time a clock is opened
    pub fn set_device_name(&mut self, device_name: Option<String>) {
        self.device_name = device_name;
    }
}

impl AudioClockProvider for CpalClockProvider {
    type Clock = CpalAudioClock;

    fn open(&mut self) -> AudioResult<CpalAudioClock> {
        let manager = AudioDeviceManager::new();
        let result = manager
            .resolve(self.device_name.as_deref())
            .and_then(|device| {
                CpalAudioClock::new(
                    device,
                    self.volume.clone(),
                    self.status.clone(),
                    self.notification_tx.clone(),
                )
            });

        if let Err(e) = &result {
            log::error!("Failed to open audio clock: {}", e);
            push_notification(
                &self.notification_tx,
                Notification::error(NotificationCategory::Audio, e.to_string()),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channels::create_click_channel;

    fn callback_state(channels: usize) -> (CallbackState, ClickProducer) {
        callback_state_with_queue(channels, 16)
    }

    fn callback_state_with_queue(
        channels: usize,
        capacity: usize,
    ) -> (CallbackState, ClickProducer) {
        let (tx, rx) = create_click_channel(capacity);
        let state = CallbackState {
            channels,
            click_rx: rx,
            mixer: ClickMixer::new(48000.0),
            volume: ClickVolume::new(1.0),
            volume_smoother: OnePoleSmoother::new(1.0, VOLUME_SMOOTHING_MS, 48000.0),
            timing: AudioTiming::new(48000.0),
        };
        (state, tx)
    }

    #[test]
    fn test_render_advances_clock_by_frames() {
        let (mut state, _tx) = callback_state(2);
        let mut buffer = vec![0.0f32; 512 * 2];
        state.render(&mut buffer[..]);
        assert_eq!(state.timing.current_sample(), 512);
    }

    #[test]
    fn test_render_silent_without_clicks() {
        let (mut state, _tx) = callback_state(1);
        let mut buffer = vec![1.0f32; 256];
        state.render(&mut buffer[..]);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_render_starts_click_at_frame() {
        let (mut state, mut tx) = callback_state(2);
        assert!(
            tx.try_push(ScheduledClick {
                at_sample: 100,
                accent: Accent::Bar,
            })
            .is_ok()
        );

        let mut buffer = vec![0.0f32; 256 * 2];
        state.render(&mut buffer[..]);

        // Silent before the click frame
        assert!(buffer[..200].iter().all(|s| *s == 0.0));
        // Both channels carry the same sample
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(buffer[200..].iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn test_render_converts_to_integer_format() {
        let (mut state, mut tx) = callback_state(1);
        let _ = tx.try_push(ScheduledClick {
            at_sample: 0,
            accent: Accent::Beat,
        });

        let mut buffer = vec![0i16; 512];
        state.render(&mut buffer[..]);
        assert!(buffer.iter().any(|s| *s != 0));
    }

    #[test]
    fn test_render_keeps_clicks_the_mixer_cannot_take() {
        use ringbuf::traits::Observer;

        let overflow = 5;
        let (mut state, mut tx) = callback_state_with_queue(1, ClickMixer::MAX_PENDING * 2);
        for i in 0..(ClickMixer::MAX_PENDING + overflow) as u64 {
            assert!(
                tx.try_push(ScheduledClick {
                    at_sample: 1_000_000 + i,
                    accent: Accent::SubStep,
                })
                .is_ok()
            );
        }

        let mut buffer = vec![0.0f32; 256];
        state.render(&mut buffer[..]);

        assert_eq!(state.mixer.pending_count(), ClickMixer::MAX_PENDING);
        assert_eq!(state.click_rx.occupied_len(), overflow);
    }
}
