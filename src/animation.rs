// src/animation.rs
//
// Per-frame progress animation.
//
// While playing, the waveform fill is recomputed every display frame from
// the element's position instead of waiting for the coarse `TimeUpdate`
// events. The loop holds at most one outstanding frame request and is
// cancelled on every exit path (pause, end, error, unmount).

use std::collections::BTreeSet;

/// Opaque id of a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u32);

/// Source of display-frame callbacks.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// A requested frame was delivered and is no longer pending.
    fn frame_fired(&mut self, _handle: FrameHandle) {}
}

/// Frames delivered by the host calling back into the player.
///
/// Tracks outstanding requests so a leaked loop is observable.
#[derive(Debug, Default)]
pub struct ManualFrames {
    next: u32,
    pending: BTreeSet<FrameHandle>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet delivered or cancelled.
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next = self.next.wrapping_add(1);
        let handle = FrameHandle(self.next);
        self.pending.insert(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.pending.remove(&handle);
    }

    fn frame_fired(&mut self, handle: FrameHandle) {
        self.pending.remove(&handle);
    }
}

/// Drives the waveform fill.
#[derive(Debug)]
pub struct ProgressAnimator<S: FrameScheduler> {
    scheduler: S,
    pending: Option<FrameHandle>,
    fill: f64,
}

impl<S: FrameScheduler> ProgressAnimator<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            pending: None,
            fill: 0.0,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Current fill fraction in `[0, 1]`.
    #[inline]
    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// Set the fill directly (used while not playing).
    pub fn set_fill(&mut self, fraction: f64) {
        self.fill = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Fill as the CSS custom property value.
    pub fn css_progress(&self) -> String {
        format!("{:.3}%", self.fill * 100.0)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Start the loop if it is not already running.
    pub fn start(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    /// Cancel the outstanding frame, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// A frame arrived. Recomputes the fill and requests the next frame.
    ///
    /// Frames that arrive after `stop` are ignored. An unknown duration
    /// leaves the fill alone but keeps the loop alive.
    pub fn on_frame(&mut self, current_time: f64, duration: Option<f64>) -> bool {
        let Some(fired) = self.pending.take() else {
            return false;
        };
        self.scheduler.frame_fired(fired);
        if let Some(duration) = duration {
            self.set_fill(current_time / duration);
        }
        self.pending = Some(self.scheduler.request_frame());
        true
    }
}

impl<S: FrameScheduler> Drop for ProgressAnimator<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_keeps_one_request() {
        let mut anim = ProgressAnimator::new(ManualFrames::new());
        anim.start();
        anim.start();
        assert_eq!(anim.scheduler().outstanding(), 1);

        assert!(anim.on_frame(30.0, Some(120.0)));
        assert_eq!(anim.scheduler().outstanding(), 1);
        assert_eq!(anim.fill(), 0.25);
        assert_eq!(anim.css_progress(), "25.000%");
        assert!(anim.is_running());
    }

    #[test]
    fn test_stop_cancels_and_ignores_late_frames() {
        let mut anim = ProgressAnimator::new(ManualFrames::new());
        anim.start();
        anim.stop();
        assert_eq!(anim.scheduler().outstanding(), 0);
        assert!(!anim.on_frame(10.0, Some(20.0)));
        assert_eq!(anim.fill(), 0.0);
        assert_eq!(anim.scheduler().outstanding(), 0);
    }

    #[test]
    fn test_unknown_duration_keeps_fill() {
        let mut anim = ProgressAnimator::new(ManualFrames::new());
        anim.set_fill(0.4);
        anim.start();
        assert!(anim.on_frame(10.0, None));
        assert_eq!(anim.fill(), 0.4);
    }

    #[test]
    fn test_fill_is_clamped() {
        let mut anim = ProgressAnimator::new(ManualFrames::new());
        anim.set_fill(1.7);
        assert_eq!(anim.fill(), 1.0);
        anim.set_fill(f64::NAN);
        assert_eq!(anim.css_progress(), "0.000%");
    }
}
