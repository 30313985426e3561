// Smoothed gain stage.

use crate::audio_buffer::AudioBuffer;
use crate::node::{Node, ProcessContext};
use crate::param::AudioParam;

use super::params;

/// Linear gain driven by an [`AudioParam`], evaluated per sample.
pub struct GainNode {
    gain: AudioParam,
}

impl GainNode {
    pub fn new(initial: f32) -> Self {
        Self {
            gain: AudioParam::new(initial),
        }
    }

    /// Current smoothed gain.
    pub fn gain(&self) -> f32 {
        self.gain.value()
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Node for GainNode {
    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

    fn process(
        &mut self,
        ctx: &ProcessContext,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) -> bool {
        // Settled at silence: skip the per-sample work.
        if !self.gain.is_ramping() && self.gain.value().abs() < 1.0e-5 {
            output.clear();
            return true;
        }

        let frames = ctx.frames.min(output.frames).min(input.frames);
        let channels = output.channels.min(input.channels);
        for i in 0..frames {
            let g = self.gain.tick(ctx.frame_time(i), ctx.sample_rate);
            for ch in 0..channels {
                output.data[ch * output.frames + i] = input.data[ch * input.frames + i] * g;
            }
        }

        false
    }

    fn set_param(&mut self, param_id: u32, value: f32) {
        if param_id == params::GAIN {
            self.gain.set_value(value);
        }
    }

    fn param_mut(&mut self, param_id: u32) -> Option<&mut AudioParam> {
        (param_id == params::GAIN).then_some(&mut self.gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(node: &mut GainNode, input: &mut [f32], frames: usize, time: f64) -> Vec<f32> {
        let ctx = ProcessContext::new(frames, 1_000.0, time);
        let input = AudioBuffer::new(input, 2);
        let mut out = vec![0.0; frames * 2];
        let mut output = AudioBuffer::new(&mut out, 2);
        node.process(&ctx, &input, &mut output);
        out
    }

    #[test]
    fn test_static_gain_scales_input() {
        let mut node = GainNode::new(0.5);
        let mut input = vec![1.0; 8];
        let out = run(&mut node, &mut input, 4, 0.0);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_ramp_is_click_free() {
        let mut node = GainNode::new(1.0);
        node.param_mut(params::GAIN)
            .unwrap()
            .set_target_at_time(0.0, 0.0, 0.05);

        let mut input = vec![1.0; 200];
        let out = run(&mut node, &mut input, 100, 0.0);
        let left = &out[..100];
        for pair in left.windows(2) {
            assert!(pair[1] <= pair[0]);
            assert!(pair[0] - pair[1] < 0.05);
        }
        assert!(left[99] < 0.2);
    }

    #[test]
    fn test_silent_gain_reports_silence() {
        let mut node = GainNode::new(0.0);
        let ctx = ProcessContext::new(4, 1_000.0, 0.0);
        let mut inp = vec![1.0; 8];
        let input = AudioBuffer::new(&mut inp, 2);
        let mut out = vec![9.0; 8];
        let mut output = AudioBuffer::new(&mut out, 2);
        assert!(node.process(&ctx, &input, &mut output));
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
