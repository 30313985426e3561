//! Media playback primitive.
//!
//! [`MediaElement`] is the seam the player drives: it plays, pauses,
//! seeks, changes rate and reports what happened through a queue of
//! [`MediaEvent`]s delivered in platform order. [`PcmMedia`] is the in-crate
//! element over decoded PCM; hosts with a native element (a browser
//! `<audio>` tag) implement the trait over that instead.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio_buffer::AudioBuffer;
use crate::config::DEFAULT_TIME_UPDATE_INTERVAL;
use crate::error::PlayRejected;

/// Lowest rate a media element accepts.
pub const MIN_ELEMENT_RATE: f64 = 0.0625;
/// Highest rate a media element accepts.
pub const MAX_ELEMENT_RATE: f64 = 16.0;

/// Native media error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MediaErrorCode {
    Aborted = 1,
    Network = 2,
    Decode = 3,
    SrcNotSupported = 4,
}

impl MediaErrorCode {
    /// Decode a numeric code. Unknown codes have no classification.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Aborted),
            2 => Some(Self::Network),
            3 => Some(Self::Decode),
            4 => Some(Self::SrcNotSupported),
            _ => None,
        }
    }
}

/// How much of the resource the element knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveEnoughData = 4,
}

/// Lifecycle notifications from a media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Ended,
    RateChange { rate: f64 },
    Error { code: Option<MediaErrorCode> },
}

/// A media playback primitive.
pub trait MediaElement: Send {
    /// Begin playback. Rejection leaves the element paused.
    fn play(&mut self) -> Result<(), PlayRejected>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Playback position in seconds.
    fn current_time(&self) -> f64;

    /// Seek. Positions outside `[0, duration]` are clamped.
    fn set_current_time(&mut self, seconds: f64);

    /// Length in seconds, `NaN` while unknown.
    fn duration(&self) -> f64;

    fn playback_rate(&self) -> f64;

    /// Request a rate. The element may clamp; a `RateChange` reports the
    /// value actually applied.
    fn set_playback_rate(&mut self, rate: f64);

    /// When `false`, rate changes also shift pitch.
    fn set_preserves_pitch(&mut self, preserve: bool);

    fn preserves_pitch(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    /// Next pending lifecycle event.
    fn poll_event(&mut self) -> Option<MediaEvent>;

    /// Render stereo audio at `sample_rate` into `output`, advancing the
    /// position. Returns the number of frames produced; the rest is silence.
    fn render(&mut self, output: &mut AudioBuffer, sample_rate: f64) -> usize;
}

/// Media element shared between the player and its source node.
pub type SharedMedia<M> = Arc<Mutex<M>>;

/// Lock a shared element, recovering from a poisoned lock.
pub fn lock_media<M>(media: &Mutex<M>) -> MutexGuard<'_, M> {
    media.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decoded, interleaved PCM audio.
#[derive(Debug, Clone)]
pub struct PcmData {
    pub sample_rate: f64,
    pub channels: usize,
    pub frames: usize,
    pub samples: Arc<Vec<f32>>,
}

impl PcmData {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: f64) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        Self {
            sample_rate,
            channels,
            frames,
            samples: Arc::new(samples),
        }
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames as f64 / self.sample_rate
        } else {
            f64::NAN
        }
    }

    /// Linearly interpolated sample at a fractional frame position.
    #[inline]
    fn read(&self, position: f64, ch: usize) -> f32 {
        let src_ch = ch % self.channels;
        let idx = position as usize;
        if idx >= self.frames {
            return 0.0;
        }
        let a = self.samples[idx * self.channels + src_ch];
        if idx + 1 >= self.frames {
            return a;
        }
        let b = self.samples[(idx + 1) * self.channels + src_ch];
        let frac = (position - idx as f64) as f32;
        a + (b - a) * frac
    }
}

/// Media element over decoded PCM.
#[derive(Debug)]
pub struct PcmMedia {
    data: Option<PcmData>,
    /// Read position in source frames.
    position: f64,
    rate: f64,
    paused: bool,
    ended: bool,
    preserves_pitch: bool,
    errored: bool,
    error_code: Option<MediaErrorCode>,
    events: VecDeque<MediaEvent>,
    time_update_interval: f64,
    since_time_update: f64,
}

impl PcmMedia {
    /// An element with no source yet.
    pub fn empty() -> Self {
        Self {
            data: None,
            position: 0.0,
            rate: 1.0,
            paused: true,
            ended: false,
            preserves_pitch: true,
            errored: false,
            error_code: None,
            events: VecDeque::new(),
            time_update_interval: DEFAULT_TIME_UPDATE_INTERVAL,
            since_time_update: 0.0,
        }
    }

    /// An element with `data` loaded; metadata events are queued.
    pub fn with_data(data: PcmData) -> Self {
        let mut media = Self::empty();
        media.load(data);
        media
    }

    /// An element whose source failed to load.
    pub fn failed(code: Option<MediaErrorCode>) -> Self {
        let mut media = Self::empty();
        media.fail(code);
        media
    }

    pub fn with_time_update_interval(mut self, seconds: f64) -> Self {
        self.time_update_interval = seconds.max(0.0);
        self
    }

    /// Replace the source. Clears any error and queues metadata.
    pub fn load(&mut self, data: PcmData) {
        let duration = data.duration();
        self.data = Some(data);
        self.position = 0.0;
        self.paused = true;
        self.ended = false;
        self.errored = false;
        self.error_code = None;
        self.since_time_update = 0.0;
        self.events.push_back(MediaEvent::DurationChange { duration });
        self.events.push_back(MediaEvent::LoadedMetadata { duration });
    }

    /// Enter the error state, as a failed fetch or decode would.
    pub fn fail(&mut self, code: Option<MediaErrorCode>) {
        self.data = None;
        self.position = 0.0;
        self.paused = true;
        self.errored = true;
        self.error_code = code;
        self.events.push_back(MediaEvent::Error { code });
    }

    /// Whether the element is in the error state.
    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// Code of the current error, if it had one.
    pub fn error_code(&self) -> Option<MediaErrorCode> {
        self.error_code
    }

    fn current_seconds(&self) -> f64 {
        match &self.data {
            Some(data) if data.sample_rate > 0.0 => self.position / data.sample_rate,
            _ => 0.0,
        }
    }
}

impl Default for PcmMedia {
    fn default() -> Self {
        Self::empty()
    }
}

impl MediaElement for PcmMedia {
    fn play(&mut self) -> Result<(), PlayRejected> {
        if self.errored {
            return Err(PlayRejected::Errored);
        }
        let Some(data) = &self.data else {
            return Err(PlayRejected::NoSource);
        };
        if self.ended || self.position >= data.frames as f64 {
            self.position = 0.0;
            self.ended = false;
            self.events.push_back(MediaEvent::TimeUpdate { current_time: 0.0 });
        }
        if self.paused {
            self.paused = false;
            self.events.push_back(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_seconds()
    }

    fn set_current_time(&mut self, seconds: f64) {
        let Some(data) = &self.data else {
            return;
        };
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        let frame = (seconds * data.sample_rate).clamp(0.0, data.frames as f64);
        self.position = frame;
        self.ended = false;
        self.since_time_update = 0.0;
        let current_time = self.current_seconds();
        self.events.push_back(MediaEvent::TimeUpdate { current_time });
    }

    fn duration(&self) -> f64 {
        self.data.as_ref().map_or(f64::NAN, PcmData::duration)
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if !rate.is_finite() {
            return;
        }
        let applied = rate.clamp(MIN_ELEMENT_RATE, MAX_ELEMENT_RATE);
        if applied != self.rate {
            self.rate = applied;
            self.events.push_back(MediaEvent::RateChange { rate: applied });
        }
    }

    fn set_preserves_pitch(&mut self, preserve: bool) {
        // Rendering always resamples; the flag is recorded for hosts that
        // read it back.
        self.preserves_pitch = preserve;
    }

    fn preserves_pitch(&self) -> bool {
        self.preserves_pitch
    }

    fn ready_state(&self) -> ReadyState {
        if self.data.is_some() {
            ReadyState::HaveEnoughData
        } else {
            ReadyState::HaveNothing
        }
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.pop_front()
    }

    fn render(&mut self, output: &mut AudioBuffer, sample_rate: f64) -> usize {
        output.clear();
        if self.paused || sample_rate <= 0.0 {
            return 0;
        }
        let Some(data) = &self.data else {
            return 0;
        };

        let step = self.rate * data.sample_rate / sample_rate;
        let end = data.frames as f64;
        let mut produced = 0;
        for i in 0..output.frames {
            if self.position >= end {
                break;
            }
            for ch in 0..output.channels {
                output.data[ch * output.frames + i] = data.read(self.position, ch);
            }
            self.position += step;
            produced += 1;
        }

        let media_seconds = produced as f64 * step / data.sample_rate;
        self.since_time_update += media_seconds;

        if self.position >= end {
            self.position = end;
            self.paused = true;
            self.ended = true;
            self.since_time_update = 0.0;
            let current_time = self.current_seconds();
            self.events.push_back(MediaEvent::TimeUpdate { current_time });
            self.events.push_back(MediaEvent::Pause);
            self.events.push_back(MediaEvent::Ended);
        } else if self.since_time_update >= self.time_update_interval {
            self.since_time_update = 0.0;
            let current_time = self.current_seconds();
            self.events.push_back(MediaEvent::TimeUpdate { current_time });
        }

        produced
    }
}
