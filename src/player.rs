//! The now-playing widget controller.
//!
//! [`NowPlaying`] ties the pieces together: it forwards user input to the
//! media element and the effects graph, folds media events into the
//! playback state, drives the progress animation and reports what the
//! controls should display. Everything runs on the caller's thread; the
//! media element is behind a mutex only because the graph's source node
//! shares it.

use std::sync::{Arc, Mutex};

use crate::animation::{FrameScheduler, ManualFrames, ProgressAnimator};
use crate::audio_buffer::AudioBuffer;
use crate::clock::ClockChange;
use crate::config::PlayerConfig;
use crate::context::ContextProvider;
use crate::effects::EffectsGraph;
use crate::media::{MediaElement, SharedMedia, lock_media};
use crate::scrub::{PointerCapture, ScrubKey, ScrubSurface, Seek, SurfaceRect};
use crate::state::{PlaybackState, ReverbState};
use crate::transport::{ControlAvailability, Readout};

pub struct NowPlaying<M: MediaElement + 'static, S: FrameScheduler = ManualFrames> {
    config: PlayerConfig,
    media: SharedMedia<M>,
    playback: PlaybackState,
    reverb: ReverbState,
    effects: EffectsGraph,
    scrub: ScrubSurface,
    animator: ProgressAnimator<S>,
    mounted: bool,
}

impl<M: MediaElement + 'static, S: FrameScheduler> NowPlaying<M, S> {
    pub fn new(
        media: M,
        provider: Box<dyn ContextProvider>,
        scheduler: S,
        config: PlayerConfig,
    ) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("player config: {e}; bounds are used as given");
        }
        Self {
            effects: EffectsGraph::new(provider, &config),
            reverb: ReverbState::new(&config),
            playback: PlaybackState::new(),
            media: Arc::new(Mutex::new(media)),
            scrub: ScrubSurface::new(),
            animator: ProgressAnimator::new(scheduler),
            mounted: false,
            config,
        }
    }

    /// Attach to the element: apply the rate, and seed duration and
    /// position when the element already has metadata.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        {
            let mut media = lock_media(&self.media);
            media.set_preserves_pitch(false);
            media.set_playback_rate(self.playback.playback_rate);
            self.playback.seed_from(&*media);
        }
        self.mounted = true;
        self.sync_fill();
        log::debug!("player mounted, asset {}", self.config.asset_url());
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Drain pending media events in delivery order. Returns how many were
    /// applied.
    pub fn pump_events(&mut self) -> usize {
        if !self.mounted {
            return 0;
        }
        let mut applied = 0;
        loop {
            // Released before handling so handlers can lock again.
            let Some(event) = lock_media(&self.media).poll_event() else {
                break;
            };
            match self.playback.observe(event, &self.config.asset_path) {
                ClockChange::Ended => self.animator.stop(),
                ClockChange::Faulted => {
                    self.animator.stop();
                    lock_media(&self.media).pause();
                }
                ClockChange::Recovered | ClockChange::None => {}
            }
            applied += 1;
        }
        self.sync_fill();
        applied
    }

    /// Play or pause. Ignored while a fault is active.
    ///
    /// Starting playback builds the effects graph when possible and resumes
    /// its context. A refused `play()` rolls the state back.
    pub fn toggle_play(&mut self) {
        if !self.mounted || self.playback.has_error() {
            return;
        }

        if self.playback.is_playing {
            self.playback.is_playing = false;
            lock_media(&self.media).pause();
            self.animator.stop();
            self.sync_fill();
            return;
        }

        self.playback.is_playing = true;
        self.effects.ensure(&self.media, &self.reverb);
        self.effects.resume();
        let result = lock_media(&self.media).play();
        match result {
            Ok(()) => self.animator.start(),
            Err(e) => {
                log::warn!("play rejected: {e}");
                self.playback.is_playing = false;
            }
        }
    }

    /// Select a playback rate. Pitch follows speed.
    pub fn set_playback_rate(&mut self, rate: f64) {
        if !self.mounted || !self.controls().playback_rate {
            return;
        }
        let rate = self.config.clamp_rate(rate);
        self.playback.playback_rate = rate;
        let mut media = lock_media(&self.media);
        media.set_preserves_pitch(false);
        media.set_playback_rate(rate);
    }

    /// Switch the reverb. Needs the effects graph; without one the toggle
    /// does nothing.
    pub fn toggle_reverb(&mut self) {
        if !self.mounted || self.playback.has_error() {
            return;
        }
        if !self.effects.ensure(&self.media, &self.reverb) {
            return;
        }
        self.reverb.enabled = !self.reverb.enabled;
        log::debug!("reverb {}", if self.reverb.enabled { "on" } else { "off" });
        self.effects.set_reverb_enabled(&self.reverb);
    }

    pub fn set_reverb_mix(&mut self, mix: f64) {
        if !self.mounted || !self.controls().reverb_mix {
            return;
        }
        self.reverb.mix = self.config.clamp_mix(mix);
        self.effects.apply_gains(&self.reverb);
    }

    /// Change the tail. The impulse response is regenerated; playback is
    /// not interrupted.
    pub fn set_reverb_tail(&mut self, tail_seconds: f64) {
        if !self.mounted || !self.controls().reverb_tail {
            return;
        }
        let tail = self.config.clamp_tail(tail_seconds);
        self.reverb.tail_seconds = tail;
        self.effects.set_tail(tail);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Scrubbing
    // ═══════════════════════════════════════════════════════════════════

    /// Duration the scrub surface works against, `None` while disabled.
    fn scrub_duration(&self) -> Option<f64> {
        if self.mounted && !self.playback.scrub_disabled() {
            self.playback.known_duration()
        } else {
            None
        }
    }

    pub fn pointer_down(
        &mut self,
        pointer_id: i32,
        x: f64,
        rect: SurfaceRect,
        capture: &mut dyn PointerCapture,
    ) {
        let duration = self.scrub_duration();
        if let Some(seek) = self.scrub.pointer_down(pointer_id, x, rect, duration, capture) {
            self.apply_seek(seek);
        }
    }

    pub fn pointer_move(&mut self, x: f64, rect: SurfaceRect) {
        let duration = self.scrub_duration();
        if let Some(seek) = self.scrub.pointer_move(x, rect, duration) {
            self.apply_seek(seek);
        }
    }

    pub fn pointer_up(&mut self, pointer_id: i32, capture: &mut dyn PointerCapture) {
        self.scrub.pointer_up(pointer_id, capture);
    }

    pub fn pointer_cancel(&mut self, pointer_id: i32, capture: &mut dyn PointerCapture) {
        self.scrub.pointer_cancel(pointer_id, capture);
    }

    /// Keyboard seek on the focused surface. Returns whether the key was
    /// consumed.
    pub fn key_press(&mut self, key: ScrubKey) -> bool {
        let duration = self.scrub_duration();
        let current = lock_media(&self.media).current_time();
        match self.scrub.key(key, current, duration, self.config.seek_step) {
            Some(seek) => {
                self.apply_seek(seek);
                true
            }
            None => false,
        }
    }

    /// Move the element and mirror the position without waiting for its
    /// next `TimeUpdate`.
    fn apply_seek(&mut self, seek: Seek) {
        lock_media(&self.media).set_current_time(seek.time);
        self.playback.current_time = seek.time;
        self.playback.progress = seek.fraction;
        self.animator.set_fill(seek.fraction);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frames and audio
    // ═══════════════════════════════════════════════════════════════════

    /// A display frame arrived.
    pub fn animation_frame(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        let current = lock_media(&self.media).current_time();
        self.animator.on_frame(current, self.playback.known_duration())
    }

    /// Render output audio. Goes through the effects graph once it exists,
    /// straight from the element otherwise.
    pub fn render(&mut self, out: &mut AudioBuffer) {
        if !self.mounted {
            out.clear();
            return;
        }
        if !self.effects.render(out) {
            lock_media(&self.media).render(out, self.config.sample_rate);
        }
    }

    /// Release everything. Later calls are no-ops.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.animator.stop();
        self.effects.teardown();
        lock_media(&self.media).pause();
        log::debug!("player unmounted");
    }

    fn sync_fill(&mut self) {
        if !self.playback.is_playing {
            self.animator.set_fill(self.playback.progress);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Readout
    // ═══════════════════════════════════════════════════════════════════

    pub fn controls(&self) -> ControlAvailability {
        ControlAvailability::from_state(&self.playback, &self.reverb)
    }

    pub fn readout(&self) -> Readout {
        Readout::new(&self.playback, &self.reverb, self.animator.fill(), &self.config)
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn reverb(&self) -> &ReverbState {
        &self.reverb
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn media(&self) -> &SharedMedia<M> {
        &self.media
    }

    pub fn effects(&self) -> &EffectsGraph {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsGraph {
        &mut self.effects
    }

    pub fn animator(&self) -> &ProgressAnimator<S> {
        &self.animator
    }
}

impl<M: MediaElement + 'static, S: FrameScheduler> Drop for NowPlaying<M, S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{NoAudioContext, OfflineContextProvider};
    use crate::media::{MediaErrorCode, PcmData, PcmMedia};
    use crate::scrub::NoCapture;

    /// 100 s of silence at a low rate to keep tests fast.
    fn player() -> NowPlaying<PcmMedia> {
        let media = PcmMedia::with_data(PcmData::new(vec![0.0; 100 * 100], 1, 100.0));
        let config = PlayerConfig {
            sample_rate: 100.0,
            ..PlayerConfig::default()
        };
        let mut player = NowPlaying::new(
            media,
            Box::new(OfflineContextProvider::new(100.0, 64)),
            ManualFrames::new(),
            config,
        );
        player.mount();
        player.pump_events();
        player
    }

    #[test]
    fn test_mount_and_metadata() {
        let player = player();
        assert_eq!(player.playback().duration, Some(100.0));
        assert!(player.controls().scrub);
        assert!(!lock_media(player.media()).preserves_pitch());
    }

    #[test]
    fn test_play_pause_drives_animation() {
        let mut player = player();
        player.toggle_play();
        assert!(player.playback().is_playing);
        assert!(player.animator().is_running());
        assert!(player.effects().is_built());

        player.toggle_play();
        assert!(!player.playback().is_playing);
        assert!(!player.animator().is_running());
        assert_eq!(player.animator().scheduler().outstanding(), 0);
    }

    #[test]
    fn test_rejected_play_rolls_back() {
        let mut player = NowPlaying::new(
            PcmMedia::empty(),
            Box::new(NoAudioContext),
            ManualFrames::new(),
            PlayerConfig::default(),
        );
        player.mount();
        player.toggle_play();
        assert!(!player.playback().is_playing);
        assert!(!player.animator().is_running());
    }

    #[test]
    fn test_reverb_toggle_targets() {
        let mut player = player();
        player.toggle_reverb();
        assert!(player.reverb().enabled);
        let (wet, dry) = player.effects_mut().gain_targets().unwrap();
        assert!((wet - 0.65).abs() < 1e-6);
        assert!((dry - 0.74).abs() < 1e-6);

        player.toggle_reverb();
        assert_eq!(player.effects_mut().gain_targets(), Some((0.0, 1.0)));
    }

    #[test]
    fn test_reverb_unavailable_without_context() {
        let media = PcmMedia::with_data(PcmData::new(vec![0.0; 1_000], 1, 100.0));
        let mut player = NowPlaying::new(
            media,
            Box::new(NoAudioContext),
            ManualFrames::new(),
            PlayerConfig::default(),
        );
        player.mount();
        player.pump_events();
        player.toggle_reverb();
        assert!(!player.reverb().enabled);

        // Playback still works on the direct path.
        player.toggle_play();
        assert!(player.playback().is_playing);
    }

    #[test]
    fn test_mix_and_tail_only_while_enabled() {
        let mut player = player();
        player.set_reverb_mix(0.2);
        assert_eq!(player.reverb().mix, 0.65);

        player.toggle_reverb();
        player.set_reverb_mix(0.5);
        let (wet, dry) = player.effects_mut().gain_targets().unwrap();
        assert!((wet - 0.5).abs() < 1e-6);
        assert!((dry - 0.8).abs() < 1e-6);

        player.toggle_play();
        player.set_reverb_tail(9.0);
        assert_eq!(player.reverb().tail_seconds, 6.0);
        assert_eq!(player.effects().impulse_response().map(|ir| ir.len()), Some(600));
        assert!(player.playback().is_playing);
    }

    #[test]
    fn test_rate_is_clamped_and_mirrored() {
        let mut player = player();
        player.set_playback_rate(2.0);
        assert_eq!(player.playback().playback_rate, 1.3);
        assert_eq!(lock_media(player.media()).playback_rate(), 1.3);
        player.pump_events();
        assert_eq!(player.playback().playback_rate, 1.3);
    }

    #[test]
    fn test_inverted_rate_bounds_do_not_panic() {
        let media = PcmMedia::with_data(PcmData::new(vec![0.0; 1_000], 1, 100.0));
        let config = PlayerConfig {
            min_rate: 1.3,
            max_rate: 0.7,
            ..PlayerConfig::default()
        };
        let mut player = NowPlaying::new(media, Box::new(NoAudioContext), ManualFrames::new(), config);
        player.mount();
        player.pump_events();

        player.set_playback_rate(1.0);
        assert_eq!(player.playback().playback_rate, 1.0);
        player.set_playback_rate(0.1);
        assert_eq!(player.playback().playback_rate, 0.7);
    }

    #[test]
    fn test_click_seek_is_idempotent() {
        let mut player = player();
        let rect = SurfaceRect::new(0.0, 200.0);
        player.pointer_down(1, 50.0, rect, &mut NoCapture);
        player.pointer_up(1, &mut NoCapture);
        assert_eq!(player.playback().current_time, 25.0);
        assert_eq!(player.playback().progress, 0.25);

        player.pump_events();
        player.pointer_down(1, 50.0, rect, &mut NoCapture);
        player.pointer_up(1, &mut NoCapture);
        player.pump_events();
        assert_eq!(player.playback().current_time, 25.0);
        assert_eq!(player.readout().progress_css, "25.000%");
    }

    #[test]
    fn test_keys_use_element_time() {
        let mut player = player();
        lock_media(player.media()).set_current_time(10.0);
        player.pump_events();
        assert!(player.key_press(ScrubKey::ArrowRight));
        assert_eq!(player.playback().current_time, 15.0);
        assert!(player.key_press(ScrubKey::End));
        assert_eq!(player.playback().progress, 1.0);
        assert!(!player.key_press(ScrubKey::Other));
    }

    #[test]
    fn test_error_while_playing_disables_everything() {
        let mut player = player();
        player.toggle_play();
        lock_media(player.media()).fail(Some(MediaErrorCode::Network));
        player.pump_events();

        let state = player.playback();
        assert!(!state.is_playing);
        assert_eq!(state.progress, 0.0);
        assert_eq!(state.current_time, 0.0);
        assert!(state.error_message().is_some());
        assert!(player.controls().all_disabled());
        assert!(!player.animator().is_running());

        // Play is ignored while faulted.
        player.toggle_play();
        assert!(!player.playback().is_playing);
    }

    #[test]
    fn test_unmount_while_playing() {
        let mut player = player();
        player.toggle_play();
        player.unmount();
        assert_eq!(player.animator().scheduler().outstanding(), 0);
        assert_eq!(
            player.effects().context_state(),
            Some(crate::context::ContextState::Closed)
        );

        let before = player.playback().clone();
        assert!(!player.animation_frame());
        assert_eq!(player.pump_events(), 0);
        player.toggle_play();
        assert_eq!(player.playback(), &before);
    }
}
