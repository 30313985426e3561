// src/state/playback.rs
//
// Transport state visible to the UI.

use serde::{Deserialize, Serialize};

use crate::error::MediaErrorKind;

/// Playback position, length and fault of the single track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Whether playback is requested and not yet stopped.
    pub is_playing: bool,

    /// Position in seconds.
    pub current_time: f64,

    /// Track length in seconds, `None` while unknown.
    pub duration: Option<f64>,

    /// `current_time / duration`, or 0 while the duration is unknown.
    pub progress: f64,

    /// Rate last applied by the media element.
    pub playback_rate: f64,

    /// Active media fault. Forces `is_playing == false`.
    #[serde(skip)]
    pub error: Option<MediaErrorKind>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: None,
            progress: 0.0,
            playback_rate: 1.0,
            error: None,
        }
    }

    /// Known positive duration.
    #[inline]
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Text rendered inline while a fault is active.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    #[inline]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the scrub surface (and everything gated on it) is unusable.
    #[inline]
    pub fn scrub_disabled(&self) -> bool {
        self.has_error() || self.known_duration().is_none()
    }

    /// Set the position and recompute progress against the known duration.
    pub fn set_position(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.current_time = seconds;
        self.progress = match self.known_duration() {
            Some(duration) => (seconds / duration).clamp(0.0, 1.0),
            None => 0.0,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_needs_duration() {
        let mut state = PlaybackState::new();
        state.set_position(12.0);
        assert_eq!(state.progress, 0.0);

        state.duration = Some(48.0);
        state.set_position(12.0);
        assert!((state.progress - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_error_message_text() {
        let mut state = PlaybackState::new();
        assert_eq!(state.error_message(), None);
        state.error = Some(MediaErrorKind::NetworkFailure);
        assert_eq!(
            state.error_message().as_deref(),
            Some("Network error while loading audio.")
        );
        assert!(state.scrub_disabled());
    }
}
