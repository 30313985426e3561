use serde::Serialize;

use crate::config::PlayerConfig;
use crate::state::{PlaybackState, ReverbState};

//
// ===============================
// MARK: Control availability
// ===============================
//

/// Which controls accept input.
///
/// An active media fault disables everything. The rate slider follows the
/// scrub surface (fault or unknown duration), and the reverb sliders are
/// additionally off while the reverb is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlAvailability {
    pub play_pause: bool,
    pub playback_rate: bool,
    pub reverb_toggle: bool,
    pub reverb_mix: bool,
    pub reverb_tail: bool,
    pub scrub: bool,
}

impl ControlAvailability {
    pub fn from_state(playback: &PlaybackState, reverb: &ReverbState) -> Self {
        let faulted = playback.has_error();
        let scrub = !playback.scrub_disabled();
        let reverb_params = scrub && reverb.enabled;
        Self {
            play_pause: !faulted,
            playback_rate: scrub,
            reverb_toggle: !faulted,
            reverb_mix: reverb_params,
            reverb_tail: reverb_params,
            scrub,
        }
    }

    /// Whether every control is disabled.
    pub fn all_disabled(&self) -> bool {
        !(self.play_pause
            || self.playback_rate
            || self.reverb_toggle
            || self.reverb_mix
            || self.reverb_tail
            || self.scrub)
    }
}

//
// ===================================
// MARK: Display readout
// ===================================
//

/// `m:ss`. Non-finite or negative input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Position of `value` within `[min, max]` as a percentage in `[0, 100]`.
fn percent(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if !(span.is_finite() && span > 0.0) || !value.is_finite() {
        return 0.0;
    }
    (((value - min) / span) * 100.0).clamp(0.0, 100.0)
}

/// Accessibility values for the scrub surface (slider role).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrubAria {
    pub value_min: f64,
    pub value_max: String,
    pub value_now: String,
    pub disabled: bool,
}

/// Everything the controls display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub is_playing: bool,
    pub elapsed: String,
    pub total: String,
    pub progress_css: String,
    pub rate_label: String,
    pub rate_percent: f64,
    pub reverb_enabled: bool,
    pub mix_percent: f64,
    pub tail_label: String,
    pub tail_percent: f64,
    pub error_message: Option<String>,
    pub aria: ScrubAria,
    pub controls: ControlAvailability,
}

impl Readout {
    pub fn new(
        playback: &PlaybackState,
        reverb: &ReverbState,
        fill: f64,
        config: &PlayerConfig,
    ) -> Self {
        let duration = playback.duration.filter(|d| d.is_finite()).unwrap_or(0.0);
        let controls = ControlAvailability::from_state(playback, reverb);
        Self {
            is_playing: playback.is_playing,
            elapsed: format_time(playback.current_time),
            total: format_time(duration),
            progress_css: format!("{:.3}%", fill.clamp(0.0, 1.0) * 100.0),
            rate_label: format!("{:.2}", playback.playback_rate),
            rate_percent: percent(playback.playback_rate, config.min_rate, config.max_rate),
            reverb_enabled: reverb.enabled,
            mix_percent: percent(reverb.mix, 0.0, 1.0),
            tail_label: format!("{:.1}", reverb.tail_seconds),
            tail_percent: percent(reverb.tail_seconds, config.min_tail, config.max_tail),
            error_message: playback.error_message(),
            aria: ScrubAria {
                value_min: 0.0,
                value_max: format!("{duration:.2}"),
                value_now: format!("{:.2}", playback.current_time),
                disabled: !controls.scrub,
            },
            controls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaErrorKind;

    fn ready(duration: f64) -> PlaybackState {
        let mut state = PlaybackState::new();
        state.duration = Some(duration);
        state
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-1.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn test_reverb_sliders_follow_toggle() {
        let playback = ready(180.0);
        let mut reverb = ReverbState::default();
        let controls = ControlAvailability::from_state(&playback, &reverb);
        assert!(controls.play_pause && controls.scrub && controls.playback_rate);
        assert!(!controls.reverb_mix && !controls.reverb_tail);

        reverb.enabled = true;
        let controls = ControlAvailability::from_state(&playback, &reverb);
        assert!(controls.reverb_mix && controls.reverb_tail);
    }

    #[test]
    fn test_unknown_duration_disables_scrub_and_rate() {
        let playback = PlaybackState::new();
        let reverb = ReverbState {
            enabled: true,
            ..ReverbState::default()
        };
        let controls = ControlAvailability::from_state(&playback, &reverb);
        assert!(controls.play_pause && controls.reverb_toggle);
        assert!(!controls.scrub && !controls.playback_rate && !controls.reverb_mix);
    }

    #[test]
    fn test_fault_disables_everything() {
        let mut playback = ready(180.0);
        playback.error = Some(MediaErrorKind::GenericPlaybackFailure);
        let reverb = ReverbState {
            enabled: true,
            ..ReverbState::default()
        };
        assert!(ControlAvailability::from_state(&playback, &reverb).all_disabled());
    }

    #[test]
    fn test_readout_labels() {
        let mut playback = ready(200.0);
        playback.set_position(50.0);
        let reverb = ReverbState::default();
        let readout = Readout::new(&playback, &reverb, playback.progress, &PlayerConfig::default());

        assert_eq!(readout.elapsed, "0:50");
        assert_eq!(readout.total, "3:20");
        assert_eq!(readout.progress_css, "25.000%");
        assert_eq!(readout.rate_label, "1.00");
        assert!((readout.rate_percent - 50.0).abs() < 1e-9);
        assert!((readout.mix_percent - 65.0).abs() < 1e-9);
        assert_eq!(readout.tail_label, "3.6");
        assert!((readout.tail_percent - 50.0).abs() < 1e-9);
        assert_eq!(readout.aria.value_max, "200.00");
        assert_eq!(readout.aria.value_now, "50.00");
        assert!(!readout.aria.disabled);
        assert_eq!(readout.error_message, None);
    }
}
