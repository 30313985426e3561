// src/lib.rs
//
// Library entry point: the now-playing audio controller and the small
// signal graph behind its reverb.

mod animation;
mod asset;
mod audio_buffer;
mod clock;
mod config;
mod context;
mod effects;
mod error;
mod graph;
mod impulse;
mod media;
mod node;
mod nodes;
mod param;
mod player;
mod scrub;
mod state;
mod transport;
mod waveform;

#[cfg(feature = "web")]
pub mod wasm;


// Re-export key types for Rust consumers
pub use animation::{FrameHandle, FrameScheduler, ManualFrames, ProgressAnimator};
pub use asset::{asset_path, decode_audio_bytes, load_audio, open_media};
pub use audio_buffer::AudioBuffer;
pub use clock::ClockChange;
pub use config::*;
pub use context::{AudioContext, ContextProvider, ContextState, NoAudioContext, OfflineContextProvider};
pub use effects::{EffectsGraph, SignalGraph};
pub use error::{AssetError, ConfigError, ContextError, MediaErrorKind, PlayRejected};
pub use graph::Graph;
pub use impulse::ImpulseResponse;
pub use media::{
    MediaElement, MediaErrorCode, MediaEvent, PcmData, PcmMedia, ReadyState, SharedMedia, lock_media,
};
pub use node::{Node, ProcessContext};
pub use nodes::{ConvolverNode, DestinationNode, GainNode, MediaSourceNode, PARTITION, params};
pub use param::AudioParam;
pub use player::NowPlaying;
pub use scrub::{
    NoCapture, PointerCapture, ScrubKey, ScrubPhase, ScrubSurface, Seek, SurfaceRect, seek_fraction,
};
pub use state::{PlaybackState, ReverbState};
pub use transport::{ControlAvailability, Readout, ScrubAria, format_time};
pub use waveform::{WAVEFORM_BARS, waveform_bars};
