// src/config.rs
//
// Player tuning constants.
//
// The rate bounds and the dry-duck factor are product tuning values; they
// live here rather than being derived anywhere else.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// Default audio configuration
pub const DEFAULT_MAX_BLOCK: usize = 512;
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

pub const DEFAULT_MIN_RATE: f64 = 0.7;
pub const DEFAULT_MAX_RATE: f64 = 1.3;
pub const DEFAULT_MIN_TAIL: f64 = 1.2;
pub const DEFAULT_MAX_TAIL: f64 = 6.0;
pub const DEFAULT_REVERB_MIX: f64 = 0.65;
pub const DEFAULT_REVERB_TAIL: f64 = 3.6;
pub const DEFAULT_DRY_DUCK: f64 = 0.4;
pub const DEFAULT_DECAY_PER_SECOND: f64 = 1.5;
pub const DEFAULT_GAIN_TIME_CONSTANT: f64 = 0.05;
pub const DEFAULT_SEEK_STEP: f64 = 5.0;
pub const DEFAULT_TIME_UPDATE_INTERVAL: f64 = 0.25;
pub const DEFAULT_ASSET_PATH: &str = "audio/resting-place.mp3";
pub const DEFAULT_BASE_PATH: &str = "/Portfolio/";

/// Configuration for the player, its effects unit and its render loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Lowest selectable playback rate.
    pub min_rate: f64,
    /// Highest selectable playback rate.
    pub max_rate: f64,
    /// Shortest reverb tail in seconds.
    pub min_tail: f64,
    /// Longest reverb tail in seconds.
    pub max_tail: f64,
    /// Reverb mix at mount.
    pub default_mix: f64,
    /// Reverb tail at mount.
    pub default_tail: f64,
    /// Dry gain is `1 - mix * dry_duck` while the reverb is on.
    pub dry_duck: f64,
    /// Impulse decay exponent per second of tail.
    pub decay_per_second: f64,
    /// Gain smoothing time constant in seconds.
    pub gain_time_constant: f64,
    /// Arrow-key seek distance in seconds.
    pub seek_step: f64,
    /// Media time between `TimeUpdate` events while playing.
    pub time_update_interval: f64,
    /// Audio asset path relative to the site's asset root.
    pub asset_path: String,
    /// Base path the site is hosted under.
    pub base_path: String,
    /// Render block size in frames.
    pub max_block: usize,
    /// Sample rate used when the host does not dictate one.
    pub sample_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            min_rate: DEFAULT_MIN_RATE,
            max_rate: DEFAULT_MAX_RATE,
            min_tail: DEFAULT_MIN_TAIL,
            max_tail: DEFAULT_MAX_TAIL,
            default_mix: DEFAULT_REVERB_MIX,
            default_tail: DEFAULT_REVERB_TAIL,
            dry_duck: DEFAULT_DRY_DUCK,
            decay_per_second: DEFAULT_DECAY_PER_SECOND,
            gain_time_constant: DEFAULT_GAIN_TIME_CONSTANT,
            seek_step: DEFAULT_SEEK_STEP,
            time_update_interval: DEFAULT_TIME_UPDATE_INTERVAL,
            asset_path: DEFAULT_ASSET_PATH.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            max_block: DEFAULT_MAX_BLOCK,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Clamp into the range spanned by two bounds given in either order.
/// Unlike `f64::clamp` this never panics on inverted or NaN bounds.
#[inline]
fn clamp_between(value: f64, a: f64, b: f64) -> f64 {
    let (lo, hi) = (a.min(b), a.max(b));
    value.max(lo).min(hi)
}

impl PlayerConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that cannot describe a usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_range = |lo: f64, hi: f64| lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi;
        if !finite_range(self.min_rate, self.max_rate) {
            return Err(ConfigError::InvalidRange {
                name: "playback rate",
                min: self.min_rate,
                max: self.max_rate,
            });
        }
        if !finite_range(self.min_tail, self.max_tail) {
            return Err(ConfigError::InvalidRange {
                name: "reverb tail",
                min: self.min_tail,
                max: self.max_tail,
            });
        }
        if self.max_block == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        Ok(())
    }

    #[inline]
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        let rate = if rate.is_nan() { 1.0 } else { rate };
        clamp_between(rate, self.min_rate, self.max_rate)
    }

    #[inline]
    pub fn clamp_mix(&self, mix: f64) -> f64 {
        if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) }
    }

    #[inline]
    pub fn clamp_tail(&self, tail: f64) -> f64 {
        let tail = if tail.is_nan() { self.min_tail } else { tail };
        clamp_between(tail, self.min_tail, self.max_tail)
    }

    /// Decay exponent paired with a tail length.
    #[inline]
    pub fn decay_for(&self, tail: f64) -> f64 {
        tail * self.decay_per_second
    }

    /// Public URL of the audio asset (`base_path` + `asset_path`).
    pub fn asset_url(&self) -> String {
        let base = self.base_path.trim_end_matches('/');
        let asset = self.asset_path.trim_start_matches('/');
        format!("{base}/{asset}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlayerConfig::from_json(r#"{ "seek_step": 10.0 }"#).unwrap();
        assert_eq!(config.seek_step, 10.0);
        assert_eq!(config.min_rate, DEFAULT_MIN_RATE);
        assert_eq!(config.asset_path, DEFAULT_ASSET_PATH);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = PlayerConfig::from_json(r#"{ "min_rate": 1.5, "max_rate": 0.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { name: "playback rate", .. }));
    }

    #[test]
    fn test_clamps() {
        let config = PlayerConfig::default();
        assert_eq!(config.clamp_rate(2.0), 1.3);
        assert_eq!(config.clamp_rate(0.1), 0.7);
        assert_eq!(config.clamp_mix(-1.0), 0.0);
        assert_eq!(config.clamp_tail(10.0), 6.0);
        assert!((config.decay_for(3.6) - 5.4).abs() < 1e-12);
    }

    #[test]
    fn test_clamps_tolerate_inverted_bounds() {
        let config = PlayerConfig {
            min_rate: 1.3,
            max_rate: 0.7,
            min_tail: 6.0,
            max_tail: 1.2,
            ..PlayerConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.clamp_rate(1.0), 1.0);
        assert_eq!(config.clamp_rate(2.0), 1.3);
        assert_eq!(config.clamp_rate(f64::NAN), 1.0);
        assert_eq!(config.clamp_tail(0.5), 1.2);
        assert_eq!(config.clamp_tail(f64::NAN), 6.0);
    }

    #[test]
    fn test_asset_url_joins_base_path() {
        let config = PlayerConfig::default();
        assert_eq!(config.asset_url(), "/Portfolio/audio/resting-place.mp3");
    }
}
