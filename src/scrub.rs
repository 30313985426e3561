//! Waveform scrub surface.
//!
//! Pointer and keyboard seeking over the waveform. The surface is a small
//! state machine (`Idle → Dragging → Idle`); it computes seek targets but
//! does not move the media itself, so the player applies them and mirrors
//! the result optimistically.

/// Horizontal extent of the surface in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub width: f64,
}

impl SurfaceRect {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrubPhase {
    #[default]
    Idle,
    Dragging { pointer_id: i32 },
}

/// Exclusive pointer routing. Both calls may fail; scrubbing continues
/// without capture when they do.
pub trait PointerCapture {
    fn set_pointer_capture(&mut self, pointer_id: i32) -> Result<(), String>;
    fn release_pointer_capture(&mut self, pointer_id: i32) -> Result<(), String>;
}

/// A host without pointer capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn set_pointer_capture(&mut self, _pointer_id: i32) -> Result<(), String> {
        Err("pointer capture unsupported".into())
    }

    fn release_pointer_capture(&mut self, _pointer_id: i32) -> Result<(), String> {
        Err("pointer capture unsupported".into())
    }
}

/// Keys the surface reacts to while focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubKey {
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Other,
}

impl ScrubKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Self {
        match key {
            "ArrowLeft" => ScrubKey::ArrowLeft,
            "ArrowRight" => ScrubKey::ArrowRight,
            "Home" => ScrubKey::Home,
            "End" => ScrubKey::End,
            _ => ScrubKey::Other,
        }
    }
}

/// A seek the player should apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seek {
    /// Target position in seconds.
    pub time: f64,
    /// Target position as a fraction of the duration.
    pub fraction: f64,
}

/// Fraction of the surface under `x`, clamped to `[0, 1]`.
///
/// A zero-width surface maps everything to 0.
pub fn seek_fraction(x: f64, rect: SurfaceRect) -> f64 {
    if !(rect.width.is_finite() && rect.width > 0.0) || !x.is_finite() {
        return 0.0;
    }
    let relative = (x - rect.left).clamp(0.0, rect.width);
    relative / rect.width
}

#[derive(Debug, Default)]
pub struct ScrubSurface {
    phase: ScrubPhase,
}

impl ScrubSurface {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn phase(&self) -> ScrubPhase {
        self.phase
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, ScrubPhase::Dragging { .. })
    }

    /// Start a drag and seek to the pointer. `duration` is `None` when the
    /// surface is disabled.
    pub fn pointer_down(
        &mut self,
        pointer_id: i32,
        x: f64,
        rect: SurfaceRect,
        duration: Option<f64>,
        capture: &mut dyn PointerCapture,
    ) -> Option<Seek> {
        let duration = duration?;
        self.phase = ScrubPhase::Dragging { pointer_id };
        if let Err(e) = capture.set_pointer_capture(pointer_id) {
            log::debug!("pointer capture unavailable: {e}");
        }
        Some(Self::seek_at(x, rect, duration))
    }

    /// Continue a drag. Moves outside a drag are ignored.
    pub fn pointer_move(&mut self, x: f64, rect: SurfaceRect, duration: Option<f64>) -> Option<Seek> {
        if !self.is_dragging() {
            return None;
        }
        Some(Self::seek_at(x, rect, duration?))
    }

    /// End a drag.
    pub fn pointer_up(&mut self, pointer_id: i32, capture: &mut dyn PointerCapture) {
        self.end(pointer_id, capture);
    }

    /// Abort a drag. Same as release; the last seek stays applied.
    pub fn pointer_cancel(&mut self, pointer_id: i32, capture: &mut dyn PointerCapture) {
        self.end(pointer_id, capture);
    }

    fn end(&mut self, pointer_id: i32, capture: &mut dyn PointerCapture) {
        if !self.is_dragging() {
            return;
        }
        self.phase = ScrubPhase::Idle;
        if let Err(e) = capture.release_pointer_capture(pointer_id) {
            log::debug!("pointer release failed: {e}");
        }
    }

    /// Discrete keyboard seek from `current_time`.
    pub fn key(&self, key: ScrubKey, current_time: f64, duration: Option<f64>, step: f64) -> Option<Seek> {
        let duration = duration?;
        let time = match key {
            ScrubKey::ArrowLeft => (current_time - step).clamp(0.0, duration),
            ScrubKey::ArrowRight => (current_time + step).clamp(0.0, duration),
            ScrubKey::Home => 0.0,
            ScrubKey::End => duration,
            ScrubKey::Other => return None,
        };
        Some(Seek {
            time,
            fraction: time / duration,
        })
    }

    fn seek_at(x: f64, rect: SurfaceRect, duration: f64) -> Seek {
        let fraction = seek_fraction(x, rect);
        Seek {
            time: fraction * duration,
            fraction,
        }
    }
}
