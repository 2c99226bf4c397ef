// Click - Click sound generation and sample-accurate click mixing
// Pre-generates one short click per accent tier for low CPU overhead in the callback

use crate::messaging::command::ScheduledClick;
use crate::sequencer::timeline::Accent;
use std::f32::consts::PI;

/// Pre-rendered click buffers, one per accent tier.
/// Higher pitch for stronger accents: bar > beat > sub-step.
#[derive(Debug, Clone)]
pub struct ClickSound {
    bar_samples: Vec<f32>,
    beat_samples: Vec<f32>,
    sub_step_samples: Vec<f32>,
}

impl ClickSound {
    /// Duration of a click
    pub const CLICK_DURATION_MS: f32 = 40.0;
    /// Time to reach peak gain
    const ATTACK_MS: f32 = 5.0;
    const PEAK_GAIN: f32 = 0.6;
    /// Gain at the very start and end of the click (exponential ramps cannot reach 0)
    const FLOOR_GAIN: f32 = 0.0001;

    pub fn new(sample_rate: f32) -> Self {
        let num_samples = ((Self::CLICK_DURATION_MS / 1000.0) * sample_rate) as usize;

        Self {
            bar_samples: Self::generate_click(sample_rate, num_samples, 1400.0),
            beat_samples: Self::generate_click(sample_rate, num_samples, 1000.0),
            sub_step_samples: Self::generate_click(sample_rate, num_samples, 750.0),
        }
    }

    /// Sine burst with an exponential attack to PEAK_GAIN and exponential decay back down
    fn generate_click(sample_rate: f32, num_samples: usize, frequency: f32) -> Vec<f32> {
        let attack_samples = ((Self::ATTACK_MS / 1000.0) * sample_rate).max(1.0);
        let decay_samples = (num_samples as f32 - attack_samples).max(1.0);
        let ratio = Self::PEAK_GAIN / Self::FLOOR_GAIN;
        let phase_increment = 2.0 * PI * frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let n = i as f32;
                let envelope = if n < attack_samples {
                    Self::FLOOR_GAIN * ratio.powf(n / attack_samples)
                } else {
                    Self::PEAK_GAIN * ratio.powf(-(n - attack_samples) / decay_samples)
                };
                (n * phase_increment).sin() * envelope
            })
            .collect()
    }

    pub fn get_click(&self, accent: Accent) -> &[f32] {
        match accent {
            Accent::Bar => &self.bar_samples,
            Accent::Beat => &self.beat_samples,
            Accent::SubStep => &self.sub_step_samples,
        }
    }

    /// Duration of a click in samples
    pub fn click_duration(&self) -> usize {
        self.bar_samples.len()
    }
}

/// One sounding click
#[derive(Debug, Clone, Copy)]
struct ClickVoice {
    accent: Accent,
    position: usize,
}

/// Starts queued clicks on their exact frame and mixes the ones sounding
///
/// Real-time safe after construction: queue and voices are pre-allocated.
#[derive(Debug, Clone)]
pub struct ClickMixer {
    sound: ClickSound,
    pending: Vec<ScheduledClick>,
    next_due: u64,
    voices: [Option<ClickVoice>; Self::MAX_VOICES],
}

impl ClickMixer {
    /// Clicks that may overlap (very fast tempos, late bursts)
    pub const MAX_VOICES: usize = 8;
    /// Scheduled clicks waiting for their frame
    pub const MAX_PENDING: usize = 64;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            sound: ClickSound::new(sample_rate),
            pending: Vec::with_capacity(Self::MAX_PENDING),
            next_due: u64::MAX,
            voices: [None; Self::MAX_VOICES],
        }
    }

    /// Queue a click. Returns false (and drops it) when the queue is full.
    pub fn queue(&mut self, click: ScheduledClick) -> bool {
        if self.pending.len() >= Self::MAX_PENDING {
            return false;
        }
        self.next_due = self.next_due.min(click.at_sample);
        self.pending.push(click);
        true
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    /// Render the mixed click output for frame `sample_index`.
    /// Clicks whose frame is already past start immediately.
    pub fn next_sample(&mut self, sample_index: u64) -> f32 {
        if sample_index >= self.next_due {
            self.start_due(sample_index);
        }

        let mut output = 0.0;
        for slot in self.voices.iter_mut() {
            if let Some(voice) = slot {
                let samples = self.sound.get_click(voice.accent);
                if voice.position < samples.len() {
                    output += samples[voice.position];
                    voice.position += 1;
                } else {
                    *slot = None;
                }
            }
        }
        output
    }

    fn start_due(&mut self, sample_index: u64) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].at_sample <= sample_index {
                let click = self.pending.swap_remove(i);
                self.start_voice(click.accent);
            } else {
                i += 1;
            }
        }
        self.next_due = self
            .pending
            .iter()
            .map(|c| c.at_sample)
            .min()
            .unwrap_or(u64::MAX);
    }

    fn start_voice(&mut self, accent: Accent) {
        let voice = ClickVoice {
            accent,
            position: 0,
        };

        if let Some(slot) = self.voices.iter_mut().find(|v| v.is_none()) {
            *slot = Some(voice);
            return;
        }

        // All busy: steal the click closest to its end
        if let Some(slot) = self
            .voices
            .iter_mut()
            .max_by_key(|v| v.map(|v| v.position).unwrap_or(0))
        {
            *slot = Some(voice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    #[test]
    fn test_click_sound_generation() {
        let sound = ClickSound::new(48000.0);

        // Expected duration: 40ms at 48kHz = 1920 samples
        assert_eq!(sound.click_duration(), 1920);
        for accent in [Accent::Bar, Accent::Beat, Accent::SubStep] {
            let click = sound.get_click(accent);
            assert_eq!(click.len(), 1920);
            assert!(peak(click) > 0.3);
            assert!(peak(click) <= 0.6 + 1e-3);
        }
    }

    #[test]
    fn test_click_fades_in_and_out() {
        let sound = ClickSound::new(48000.0);
        let click = sound.get_click(Accent::Beat);

        assert!(peak(&click[..20]) < 0.01);
        assert!(peak(&click[click.len() - 20..]) < 0.01);
    }

    #[test]
    fn test_accent_tiers_have_distinct_pitch() {
        let sound = ClickSound::new(48000.0);

        // Count zero crossings as a pitch proxy
        let crossings = |samples: &[f32]| {
            samples
                .windows(2)
                .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
                .count()
        };

        let bar = crossings(sound.get_click(Accent::Bar));
        let beat = crossings(sound.get_click(Accent::Beat));
        let sub = crossings(sound.get_click(Accent::SubStep));
        assert!(bar > beat);
        assert!(beat > sub);
    }

    #[test]
    fn test_mixer_starts_click_on_exact_frame() {
        let mut mixer = ClickMixer::new(48000.0);
        assert!(mixer.queue(ScheduledClick {
            at_sample: 1000,
            accent: Accent::Bar,
        }));

        for i in 0..1000 {
            assert_eq!(mixer.next_sample(i), 0.0);
        }
        assert_eq!(mixer.active_voices(), 0);

        mixer.next_sample(1000);
        assert_eq!(mixer.active_voices(), 1);
        assert_eq!(mixer.pending_count(), 0);
    }

    #[test]
    fn test_mixer_late_click_starts_immediately() {
        let mut mixer = ClickMixer::new(48000.0);
        mixer.queue(ScheduledClick {
            at_sample: 10,
            accent: Accent::Beat,
        });

        mixer.next_sample(500);
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn test_mixer_voice_ends_after_click() {
        let mut mixer = ClickMixer::new(48000.0);
        mixer.queue(ScheduledClick {
            at_sample: 0,
            accent: Accent::SubStep,
        });

        for i in 0..=1920 {
            mixer.next_sample(i);
        }
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(mixer.next_sample(1921), 0.0);
    }

    #[test]
    fn test_mixer_queue_is_bounded() {
        let mut mixer = ClickMixer::new(48000.0);
        for i in 0..ClickMixer::MAX_PENDING as u64 {
            assert!(mixer.queue(ScheduledClick {
                at_sample: 1_000 + i,
                accent: Accent::SubStep,
            }));
        }
        assert!(!mixer.queue(ScheduledClick {
            at_sample: 0,
            accent: Accent::Bar,
        }));
    }

    #[test]
    fn test_mixer_steals_voice_when_full() {
        let mut mixer = ClickMixer::new(48000.0);
        for _ in 0..ClickMixer::MAX_VOICES + 2 {
            mixer.queue(ScheduledClick {
                at_sample: 0,
                accent: Accent::Bar,
            });
        }
        mixer.next_sample(0);
        assert_eq!(mixer.active_voices(), ClickMixer::MAX_VOICES);
        assert_eq!(mixer.pending_count(), 0);
    }
}
