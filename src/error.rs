//! Error types.
//!
//! [`MediaErrorKind`] is the user-visible playback fault taxonomy. Its
//! `Display` text is what the player renders inline. The other errors are
//! internal: they are logged and converted into state rollbacks or silent
//! capability loss, never surfaced to the listener.

use crate::media::MediaErrorCode;

/// Classified media playback failure. Terminal until a positive duration
/// is observed again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaErrorKind {
    #[error("Playback stopped before it finished loading.")]
    LoadAborted,

    #[error("Network error while loading audio.")]
    NetworkFailure,

    #[error("Audio file is corrupt or in an unsupported format.")]
    DecodeFailure,

    #[error("Audio source not found. Place an audio file at public/{asset} to enable playback.")]
    SourceUnsupportedOrMissing { asset: String },

    #[error("Audio playback failed. Check your audio file.")]
    GenericPlaybackFailure,
}

impl MediaErrorKind {
    /// Map a native error code onto the taxonomy. `asset` names the file the
    /// operator should supply when the source is missing.
    pub fn classify(code: Option<MediaErrorCode>, asset: &str) -> Self {
        match code {
            Some(MediaErrorCode::Aborted) => MediaErrorKind::LoadAborted,
            Some(MediaErrorCode::Network) => MediaErrorKind::NetworkFailure,
            Some(MediaErrorCode::Decode) => MediaErrorKind::DecodeFailure,
            Some(MediaErrorCode::SrcNotSupported) => MediaErrorKind::SourceUnsupportedOrMissing {
                asset: asset.to_string(),
            },
            None => MediaErrorKind::GenericPlaybackFailure,
        }
    }
}

/// `play()` was refused by the media element.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayRejected {
    #[error("no playable source is loaded")]
    NoSource,

    #[error("media element is in an error state")]
    Errored,
}

/// Audio-processing context failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("audio context is closed")]
    Closed,
}

/// Failures while turning an asset on disk into playable PCM.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("audio asset not found: {0}")]
    NotFound(String),

    #[error("I/O error reading audio asset: {0}")]
    Io(#[from] std::io::Error),

    /// No container or codec we can play was recognised, or nothing
    /// decoded before the stream failed.
    #[error("unrecognised audio asset: {0}")]
    Unrecognized(String),

    #[error("unsupported sample format: {bits}-bit {format}")]
    UnsupportedFormat { bits: u16, format: &'static str },

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
}

impl AssetError {
    /// Native media error code a browser would report for this failure.
    ///
    /// Anything that fails before audio is known to be playable is
    /// `SrcNotSupported`. A recognised stream that breaks partway is
    /// `Decode`.
    pub fn media_code(&self) -> MediaErrorCode {
        match self {
            AssetError::NotFound(_)
            | AssetError::Unrecognized(_)
            | AssetError::UnsupportedFormat { .. } => MediaErrorCode::SrcNotSupported,
            AssetError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                MediaErrorCode::SrcNotSupported
            }
            AssetError::Io(_) => MediaErrorCode::Network,
            AssetError::Wav(_) | AssetError::Decode(_) => MediaErrorCode::Decode,
        }
    }
}

/// Invalid player configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {name} range [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("block size must be at least one frame")]
    InvalidBlockSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_covers_all_codes() {
        let asset = "audio/resting-place.mp3";
        assert_eq!(
            MediaErrorKind::classify(Some(MediaErrorCode::Aborted), asset),
            MediaErrorKind::LoadAborted
        );
        assert_eq!(
            MediaErrorKind::classify(Some(MediaErrorCode::Network), asset),
            MediaErrorKind::NetworkFailure
        );
        assert_eq!(
            MediaErrorKind::classify(Some(MediaErrorCode::Decode), asset),
            MediaErrorKind::DecodeFailure
        );
        assert_eq!(
            MediaErrorKind::classify(None, asset),
            MediaErrorKind::GenericPlaybackFailure
        );
    }

    #[test]
    fn test_missing_source_message_names_asset() {
        let kind = MediaErrorKind::classify(Some(MediaErrorCode::SrcNotSupported), "audio/x.mp3");
        assert_eq!(
            kind.to_string(),
            "Audio source not found. Place an audio file at public/audio/x.mp3 to enable playback."
        );
    }

    #[test]
    fn test_missing_asset_maps_to_src_not_supported() {
        let err = AssetError::NotFound("audio/x.wav".into());
        assert_eq!(err.media_code(), MediaErrorCode::SrcNotSupported);
    }

    #[test]
    fn test_unplayable_formats_map_to_src_not_supported() {
        let err = AssetError::UnsupportedFormat { bits: 12, format: "int" };
        assert_eq!(err.media_code(), MediaErrorCode::SrcNotSupported);
        let err = AssetError::Unrecognized("no suitable format reader".into());
        assert_eq!(err.media_code(), MediaErrorCode::SrcNotSupported);
    }
}
