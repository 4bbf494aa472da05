use std::time::Duration;

use crate::clock::now_millis;

/// Shape of captured audio: rate, channel count and how much goes in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub frame_duration: Duration,
}

impl AudioConfig {
    /// 48 kHz mono in 20 ms frames.
    #[must_use]
    pub const fn default_voice() -> Self {
        Self {
            sample_rate_hz: 48_000,
            channels: 1,
            frame_duration: Duration::from_millis(20),
        }
    }

    /// Interleaved samples in one frame.
    #[must_use]
    pub fn samples_per_frame(&self) -> usize {
        let per_channel =
            u128::from(self.sample_rate_hz) * self.frame_duration.as_micros() / 1_000_000;
        usize::try_from(per_channel).unwrap_or(0) * usize::from(self.channels.max(1))
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::default_voice()
    }
}

/// A block of signed 16-bit PCM, interleaved by channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub timestamp_ms: u128,
    pub samples: Vec<i16>,
}

impl AudioFrame {
    #[must_use]
    pub fn new(sample_rate_hz: u32, channels: u16, samples: Vec<i16>) -> Self {
        Self {
            sample_rate_hz,
            channels,
            timestamp_ms: now_millis(),
            samples,
        }
    }

    /// Samples per channel.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        let micros = self.frames() as u64 * 1_000_000 / u64::from(self.sample_rate_hz);
        Duration::from_micros(micros)
    }

    /// One frame of a sine tone. `start` is the running sample index, so
    /// consecutive calls continue the wave without clicks.
    #[must_use]
    pub fn tone(config: &AudioConfig, freq_hz: f32, start: u64) -> Self {
        let channels = usize::from(config.channels.max(1));
        let per_channel = config.samples_per_frame() / channels;
        let rate = config.sample_rate_hz.max(1) as f32;
        let mut samples = Vec::with_capacity(per_channel * channels);
        for n in 0..per_channel as u64 {
            let t = (start + n) as f32 / rate;
            let v = (t * freq_hz * std::f32::consts::TAU).sin() * f32::from(i16::MAX) * 0.25;
            for _ in 0..channels {
                samples.push(v as i16);
            }
        }
        Self::new(config.sample_rate_hz, config.channels.max(1), samples)
    }

    /// Mixes down to mono and resamples (nearest neighbour) to `rate`.
    #[must_use]
    pub fn mono_at(&self, rate: u32) -> Vec<i16> {
        let channels = usize::from(self.channels.max(1));
        let mono: Vec<i16> = self
            .samples
            .chunks(channels)
            .map(|c| {
                let sum: i32 = c.iter().map(|&s| i32::from(s)).sum();
                (sum / c.len() as i32) as i16
            })
            .collect();
        if rate == self.sample_rate_hz || self.sample_rate_hz == 0 || rate == 0 {
            return mono;
        }
        let out_len = (mono.len() as u64 * u64::from(rate) / u64::from(self.sample_rate_hz)) as usize;
        (0..out_len)
            .filter_map(|i| {
                let src = i as u64 * u64::from(self.sample_rate_hz) / u64::from(rate);
                mono.get(src as usize).copied()
            })
            .collect()
    }
}
