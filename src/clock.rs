//! Playback clock bridge.
//!
//! Folds the media element's event stream into [`PlaybackState`]. The
//! bridge only observes: it never touches the element, so the caller can
//! react to what changed (stop the animator, log) through the returned
//! [`ClockChange`].

use crate::error::MediaErrorKind;
use crate::media::{MediaElement, MediaErrorCode, MediaEvent, ReadyState};
use crate::state::PlaybackState;

/// What an observed event did to playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockChange {
    /// Nothing the caller needs to act on.
    None,
    /// Playback ran to the end.
    Ended,
    /// A media fault became active.
    Faulted,
    /// A positive duration cleared an active fault.
    Recovered,
}

impl PlaybackState {
    /// A duration became available. Only finite positive values count;
    /// anything else leaves the duration unknown. A positive duration
    /// clears an active fault.
    pub fn on_metadata_ready(&mut self, duration: f64) -> ClockChange {
        if !(duration.is_finite() && duration > 0.0) {
            return ClockChange::None;
        }
        self.duration = Some(duration);
        self.set_position(self.current_time);
        if self.error.take().is_some() {
            log::debug!("media recovered with duration {duration:.2}s");
            return ClockChange::Recovered;
        }
        ClockChange::None
    }

    /// The element reported a new position.
    pub fn on_time_advance(&mut self, current_time: f64) -> ClockChange {
        self.set_position(current_time);
        ClockChange::None
    }

    /// Playback reached the end. The duration is kept.
    pub fn on_ended(&mut self) -> ClockChange {
        self.is_playing = false;
        self.current_time = 0.0;
        self.progress = 0.0;
        ClockChange::Ended
    }

    /// Mirror the rate the element actually applied.
    pub fn on_rate_change(&mut self, rate: f64) -> ClockChange {
        if rate.is_finite() {
            self.playback_rate = rate;
        }
        ClockChange::None
    }

    /// Classify a fault and stop everything. Terminal until a positive
    /// duration is seen again.
    pub fn on_error(&mut self, code: Option<MediaErrorCode>, asset: &str) -> ClockChange {
        let kind = MediaErrorKind::classify(code, asset);
        log::error!("media error: {kind}");
        self.error = Some(kind);
        self.is_playing = false;
        self.current_time = 0.0;
        self.progress = 0.0;
        self.duration = Some(0.0);
        ClockChange::Faulted
    }

    /// Apply one media event.
    pub fn observe(&mut self, event: MediaEvent, asset: &str) -> ClockChange {
        match event {
            MediaEvent::LoadedMetadata { duration } | MediaEvent::DurationChange { duration } => {
                self.on_metadata_ready(duration)
            }
            MediaEvent::TimeUpdate { current_time } => self.on_time_advance(current_time),
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::RateChange { rate } => self.on_rate_change(rate),
            MediaEvent::Error { code } => self.on_error(code, asset),
            // Play/pause are driven from the controls; the element echoing
            // them changes nothing here.
            MediaEvent::Play | MediaEvent::Pause => ClockChange::None,
        }
    }

    /// Seed from an element that already has metadata.
    pub fn seed_from<M: MediaElement + ?Sized>(&mut self, media: &M) {
        if media.ready_state() >= ReadyState::HaveMetadata {
            self.on_metadata_ready(media.duration());
            self.on_time_advance(media.current_time());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{PcmData, PcmMedia};

    const ASSET: &str = "audio/resting-place.mp3";

    #[test]
    fn test_invalid_durations_stay_unknown() {
        let mut state = PlaybackState::new();
        for bad in [f64::NAN, f64::INFINITY, 0.0, -4.0] {
            state.on_metadata_ready(bad);
            assert_eq!(state.duration, None);
        }
        state.on_time_advance(3.0);
        assert_eq!(state.current_time, 3.0);
        assert_eq!(state.progress, 0.0);
    }

    #[test]
    fn test_time_advance_sets_progress() {
        let mut state = PlaybackState::new();
        state.on_metadata_ready(200.0);
        state.on_time_advance(50.0);
        assert!((state.progress - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_ended_keeps_duration() {
        let mut state = PlaybackState::new();
        state.on_metadata_ready(10.0);
        state.is_playing = true;
        state.on_time_advance(10.0);
        assert_eq!(state.observe(MediaEvent::Ended, ASSET), ClockChange::Ended);
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.duration, Some(10.0));
    }

    #[test]
    fn test_rate_mirrors_applied_value() {
        let mut state = PlaybackState::new();
        state.observe(MediaEvent::RateChange { rate: 0.7 }, ASSET);
        assert_eq!(state.playback_rate, 0.7);
    }

    #[test]
    fn test_error_zeroes_and_stops() {
        let mut state = PlaybackState::new();
        state.on_metadata_ready(100.0);
        state.is_playing = true;
        state.on_time_advance(30.0);

        let change = state.observe(
            MediaEvent::Error {
                code: Some(MediaErrorCode::Decode),
            },
            ASSET,
        );
        assert_eq!(change, ClockChange::Faulted);
        assert!(!state.is_playing);
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.duration, Some(0.0));
        assert_eq!(state.error, Some(MediaErrorKind::DecodeFailure));
        assert!(state.scrub_disabled());
    }

    #[test]
    fn test_positive_duration_clears_error() {
        let mut state = PlaybackState::new();
        state.on_error(None, ASSET);
        assert_eq!(state.on_metadata_ready(0.0), ClockChange::None);
        assert!(state.has_error());
        assert_eq!(state.on_metadata_ready(12.5), ClockChange::Recovered);
        assert!(!state.has_error());
        assert_eq!(state.duration, Some(12.5));
    }

    #[test]
    fn test_seed_from_ready_element() {
        let mut media = PcmMedia::with_data(PcmData::new(vec![0.0; 400], 1, 100.0));
        media.set_current_time(1.0);

        let mut state = PlaybackState::new();
        state.seed_from(&media);
        assert_eq!(state.duration, Some(4.0));
        assert!((state.progress - 0.25).abs() < 1e-12);

        let mut empty = PlaybackState::new();
        empty.seed_from(&PcmMedia::empty());
        assert_eq!(empty.duration, None);
    }
}
