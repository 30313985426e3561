//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { nowplaying_init, NowPlayingWeb } from './nowplaying.js';
//!
//! await init();
//! nowplaying_init();
//!
//! const player = new NowPlayingWeb(null);
//! player.load_audio(new Uint8Array(await (await fetch(url)).arrayBuffer()), "mp3");
//! player.mount();
//!
//! // UI thread, every frame
//! player.pump_events();
//! player.animation_frame();
//! waveform.style.setProperty('--progress', player.progress_css());
//!
//! // AudioWorklet
//! player.render(outputs[0][0], outputs[0][1]);
//! ```

use wasm_bindgen::prelude::*;

use crate::animation::ManualFrames;
use crate::asset::decode_audio_bytes;
use crate::audio_buffer::AudioBuffer;
use crate::config::PlayerConfig;
use crate::context::OfflineContextProvider;
use crate::media::{MediaErrorCode, PcmData, PcmMedia, lock_media};
use crate::player::NowPlaying;
use crate::scrub::{PointerCapture, ScrubKey, SurfaceRect};
use crate::waveform::{WAVEFORM_BARS, waveform_bars};

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn nowplaying_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

/// Bar heights for the decorative waveform.
#[wasm_bindgen]
pub fn nowplaying_waveform() -> Vec<f64> {
    waveform_bars(WAVEFORM_BARS)
}

/// Capture is performed by script on the DOM element; Rust only tracks the
/// drag.
struct ScriptCapture;

impl PointerCapture for ScriptCapture {
    fn set_pointer_capture(&mut self, _pointer_id: i32) -> Result<(), String> {
        Ok(())
    }

    fn release_pointer_capture(&mut self, _pointer_id: i32) -> Result<(), String> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Player
// ═══════════════════════════════════════════════════════════════════════════

/// The now-playing widget, driven from script.
#[wasm_bindgen]
pub struct NowPlayingWeb {
    player: NowPlaying<PcmMedia>,
    scratch: Vec<f32>,
}

#[wasm_bindgen]
impl NowPlayingWeb {
    /// Create a player. `config_json` overrides any subset of the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<NowPlayingWeb, JsValue> {
        let config = match config_json {
            Some(json) => {
                PlayerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
            }
            None => PlayerConfig::default(),
        };
        let provider = OfflineContextProvider::new(config.sample_rate, config.max_block);
        let media = PcmMedia::empty().with_time_update_interval(config.time_update_interval);
        Ok(Self {
            player: NowPlaying::new(media, Box::new(provider), ManualFrames::new(), config),
            scratch: Vec::new(),
        })
    }

    /// Load decoded interleaved PCM.
    pub fn load_pcm(&mut self, samples: Vec<f32>, channels: u32, sample_rate: f64) {
        let data = PcmData::new(samples, channels as usize, sample_rate);
        lock_media(self.player.media()).load(data);
    }

    /// Decode and load an audio file (WAV, MP3). `extension` is a hint for
    /// the container probe. A bad file puts the element in the error state,
    /// like a failed fetch would.
    pub fn load_audio(&mut self, bytes: Vec<u8>, extension: Option<String>) {
        let mut media = lock_media(self.player.media());
        match decode_audio_bytes(bytes, extension.as_deref()) {
            Ok(data) => media.load(data),
            Err(e) => {
                log::error!("failed to decode audio: {e}");
                media.fail(Some(e.media_code()));
            }
        }
    }

    /// Report a fetch/decode failure observed by script (`MediaError.code`).
    pub fn report_error(&mut self, code: u16) {
        lock_media(self.player.media()).fail(MediaErrorCode::from_code(code));
    }

    pub fn mount(&mut self) {
        self.player.mount();
    }

    pub fn unmount(&mut self) {
        self.player.unmount();
    }

    /// Apply pending media events. Returns how many were applied.
    pub fn pump_events(&mut self) -> u32 {
        self.player.pump_events() as u32
    }

    pub fn toggle_play(&mut self) {
        self.player.toggle_play();
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.player.set_playback_rate(rate);
    }

    pub fn toggle_reverb(&mut self) {
        self.player.toggle_reverb();
    }

    pub fn set_reverb_mix(&mut self, mix: f64) {
        self.player.set_reverb_mix(mix);
    }

    pub fn set_reverb_tail(&mut self, tail_seconds: f64) {
        self.player.set_reverb_tail(tail_seconds);
    }

    pub fn pointer_down(&mut self, pointer_id: i32, client_x: f64, left: f64, width: f64) {
        self.player
            .pointer_down(pointer_id, client_x, SurfaceRect::new(left, width), &mut ScriptCapture);
    }

    pub fn pointer_move(&mut self, client_x: f64, left: f64, width: f64) {
        self.player.pointer_move(client_x, SurfaceRect::new(left, width));
    }

    pub fn pointer_up(&mut self, pointer_id: i32) {
        self.player.pointer_up(pointer_id, &mut ScriptCapture);
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32) {
        self.player.pointer_cancel(pointer_id, &mut ScriptCapture);
    }

    /// Keyboard input on the focused waveform (`KeyboardEvent.key`).
    /// Returns `true` when script should call `preventDefault()`.
    pub fn key_down(&mut self, key: &str) -> bool {
        self.player.key_press(ScrubKey::from_key(key))
    }

    /// Call from `requestAnimationFrame`. Returns whether another frame is
    /// wanted.
    pub fn animation_frame(&mut self) -> bool {
        self.player.animation_frame()
    }

    /// Render one block of planar stereo output.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        self.scratch.resize(frames * 2, 0.0);
        let mut out = AudioBuffer::new(&mut self.scratch, 2);
        self.player.render(&mut out);
        left[..frames].copy_from_slice(&self.scratch[..frames]);
        right[..frames].copy_from_slice(&self.scratch[frames..]);
    }

    // ───────────────────────────────────────────────────────────────────
    // Readback
    // ───────────────────────────────────────────────────────────────────

    pub fn is_playing(&self) -> bool {
        self.player.playback().is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.player.playback().current_time
    }

    /// Duration in seconds, `NaN` while unknown.
    pub fn duration(&self) -> f64 {
        self.player.playback().duration.unwrap_or(f64::NAN)
    }

    pub fn progress(&self) -> f64 {
        self.player.playback().progress
    }

    pub fn playback_rate(&self) -> f64 {
        self.player.playback().playback_rate
    }

    pub fn reverb_enabled(&self) -> bool {
        self.player.reverb().enabled
    }

    pub fn error_message(&self) -> Option<String> {
        self.player.playback().error_message()
    }

    /// Value for the `--progress` CSS property.
    pub fn progress_css(&self) -> String {
        self.player.animator().css_progress()
    }

    /// Labels, percentages and control availability as JSON.
    pub fn readout_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.player.readout()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
