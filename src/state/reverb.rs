// src/state/reverb.rs
//
// Reverb settings and the gain targets derived from them.

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbState {
    pub enabled: bool,

    /// Wet contribution in `[0, 1]`.
    pub mix: f64,

    /// Impulse response length in seconds.
    pub tail_seconds: f64,
}

impl ReverbState {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            enabled: false,
            mix: config.clamp_mix(config.default_mix),
            tail_seconds: config.clamp_tail(config.default_tail),
        }
    }

    /// Wet gain the path should settle at.
    #[inline]
    pub fn wet_target(&self) -> f64 {
        if self.enabled { self.mix } else { 0.0 }
    }

    /// Dry gain the path should settle at. The dry path ducks under the
    /// wet signal by `mix * dry_duck`.
    #[inline]
    pub fn dry_target(&self, dry_duck: f64) -> f64 {
        if self.enabled {
            (1.0 - self.mix * dry_duck).max(0.0)
        } else {
            1.0
        }
    }
}

impl Default for ReverbState {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DRY_DUCK;

    #[test]
    fn test_targets_follow_enable() {
        let mut reverb = ReverbState::default();
        assert_eq!(reverb.mix, 0.65);
        assert_eq!(reverb.tail_seconds, 3.6);
        assert_eq!(reverb.wet_target(), 0.0);
        assert_eq!(reverb.dry_target(DEFAULT_DRY_DUCK), 1.0);

        reverb.enabled = true;
        assert!((reverb.wet_target() - 0.65).abs() < 1e-12);
        assert!((reverb.dry_target(DEFAULT_DRY_DUCK) - 0.74).abs() < 1e-12);
    }

    #[test]
    fn test_dry_never_negative() {
        let reverb = ReverbState {
            enabled: true,
            mix: 1.0,
            tail_seconds: 2.0,
        };
        assert_eq!(reverb.dry_target(3.0), 0.0);
    }
}
