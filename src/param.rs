// src/param.rs
//
// Automatable node parameter.
//
// Mirrors the subset of Web Audio `AudioParam` semantics the player needs:
// an immediate value set and an exponential approach toward a target
// (`setTargetAtTime`). Gain changes are always routed through the approach
// so that toggling the reverb never steps the signal.

/// Pending exponential approach.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetRamp {
    target: f32,
    start_time: f64,
    time_constant: f64,
}

/// A smoothed scalar parameter evaluated per sample.
#[derive(Debug, Clone)]
pub struct AudioParam {
    value: f32,
    ramp: Option<TargetRamp>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Current (already smoothed) value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// The value this parameter is heading toward.
    #[inline]
    pub fn target(&self) -> f32 {
        self.ramp.map_or(self.value, |r| r.target)
    }

    /// Jump to `value` immediately, cancelling any approach in flight.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    /// Start approaching `target` from `start_time` (context seconds).
    ///
    /// After one `time_constant` the remaining distance is about 37%, after
    /// five it is below 1%. A non-positive time constant jumps directly.
    pub fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        if !(time_constant > 0.0) {
            self.set_value(target);
            return;
        }
        self.ramp = Some(TargetRamp {
            target,
            start_time,
            time_constant,
        });
    }

    /// Advance by one sample at context time `time`.
    #[inline]
    pub fn tick(&mut self, time: f64, sample_rate: f64) -> f32 {
        if let Some(ramp) = self.ramp {
            if time >= ramp.start_time {
                let coeff = (-1.0 / (ramp.time_constant * sample_rate)).exp() as f32;
                self.value = ramp.target + (self.value - ramp.target) * coeff;
                if (self.value - ramp.target).abs() < 1.0e-6 {
                    self.value = ramp.target;
                    self.ramp = None;
                }
            }
        }
        self.value
    }

    /// Whether an approach is still in flight.
    #[inline]
    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }
}
