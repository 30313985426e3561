//! Synthetic hall impulse response.
//!
//! Each channel is independent uniform noise shaped by `(1 - t)^decay`,
//! where `t` runs over `[0, 1)` along the buffer. Independent noise per
//! channel gives a diffuse stereo tail. Regeneration is never expected to
//! reproduce an earlier buffer.

use rand::Rng;

/// Number of channels in a generated response.
pub const IMPULSE_CHANNELS: usize = 2;

// Loudness calibration for normalized convolution (matches browser engines).
const GAIN_CALIBRATION_DB: f64 = -58.0;
const GAIN_CALIBRATION_SAMPLE_RATE: f64 = 44_100.0;
const MIN_POWER: f64 = 0.000_125;

/// Immutable multi-channel impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: f64,
    channels: Vec<Vec<f32>>,
}

impl ImpulseResponse {
    /// Generate a hall response using the thread-local RNG.
    pub fn hall(sample_rate: f64, tail_seconds: f64, decay: f64) -> Self {
        Self::hall_with_rng(sample_rate, tail_seconds, decay, &mut rand::rng())
    }

    /// Generate a hall response from a caller-supplied noise source.
    ///
    /// Length is `sample_rate * tail_seconds` frames; anything that rounds
    /// to zero (or is not finite) yields a single-frame buffer.
    pub fn hall_with_rng<R: Rng + ?Sized>(
        sample_rate: f64,
        tail_seconds: f64,
        decay: f64,
        rng: &mut R,
    ) -> Self {
        let length = Self::length_for(sample_rate, tail_seconds);
        let decay = if decay.is_finite() && decay > 0.0 { decay } else { 1.0 };

        let channels = (0..IMPULSE_CHANNELS)
            .map(|_| {
                (0..length)
                    .map(|i| {
                        let t = i as f64 / length as f64;
                        let damp = (1.0 - t).powf(decay);
                        let noise: f64 = rng.random_range(-1.0..=1.0);
                        (noise * damp) as f32
                    })
                    .collect()
            })
            .collect();

        Self {
            sample_rate,
            channels,
        }
    }

    /// Build a response from explicit channel data.
    ///
    /// Empty input becomes a single silent frame.
    pub fn from_channels(sample_rate: f64, mut channels: Vec<Vec<f32>>) -> Self {
        if channels.is_empty() {
            channels.push(vec![0.0]);
        }
        let len = channels.iter().map(Vec::len).max().unwrap_or(0).max(1);
        for ch in &mut channels {
            ch.resize(len, 0.0);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    /// Frame count for a tail length at a sample rate (never zero).
    /// Fractional frame counts truncate, as a browser's `createBuffer`
    /// length conversion does.
    pub fn length_for(sample_rate: f64, tail_seconds: f64) -> usize {
        let frames = (sample_rate * tail_seconds).floor();
        if frames.is_finite() && frames >= 1.0 {
            frames as usize
        } else {
            1
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Frames per channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Channel data. Out-of-range indexes wrap, so a mono response serves
    /// every output channel.
    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch % self.channels.len()]
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    /// Gain that brings a convolved signal back to roughly the loudness of
    /// the dry signal: inverse RMS of the response, calibrated.
    pub fn normalization_scale(&self) -> f32 {
        let count = (self.num_channels() * self.len()) as f64;
        let energy: f64 = self
            .channels
            .iter()
            .flatten()
            .map(|&s| f64::from(s) * f64::from(s))
            .sum();
        let mut power = (energy / count.max(1.0)).sqrt();
        if !power.is_finite() || power < MIN_POWER {
            power = MIN_POWER;
        }
        let mut scale = 1.0 / power;
        scale *= 10f64.powf(GAIN_CALIBRATION_DB * 0.05);
        if self.sample_rate > 0.0 {
            scale *= GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate;
        }
        scale as f32
    }
}
