// src/node.rs

use std::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::impulse::ImpulseResponse;
use crate::param::AudioParam;

/// Context passed to nodes during processing.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    /// Number of frames to process
    pub frames: usize,

    /// Sample rate
    pub sample_rate: f64,

    /// Context time (seconds) of the first frame in this block
    pub time: f64,
}

impl ProcessContext {
    pub fn new(frames: usize, sample_rate: f64, time: f64) -> Self {
        Self {
            frames,
            sample_rate,
            time,
        }
    }

    /// Context time of frame `i` within this block.
    #[inline]
    pub fn frame_time(&self, i: usize) -> f64 {
        self.time + i as f64 / self.sample_rate
    }
}

/// Core DSP node trait.
///
/// Nodes:
/// - do NOT know about the player or its UI state
/// - do NOT reconnect themselves
/// - ONLY process audio for the given context
pub trait Node: Send {
    /// Called once when the graph is prepared.
    fn prepare(&mut self, sample_rate: f64, max_block: usize);

    /// Process one block.
    ///
    /// `input` holds the sum of every upstream node (silence for sources).
    /// Returns `true` if the output is silent.
    fn process(&mut self, ctx: &ProcessContext, input: &AudioBuffer, output: &mut AudioBuffer)
        -> bool;

    /// Number of output channels.
    fn num_channels(&self) -> usize {
        2
    }

    /// Set a parameter value immediately.
    fn set_param(&mut self, param_id: u32, value: f32);

    /// Smoothed parameter access, for nodes that expose automatable params.
    fn param_mut(&mut self, _param_id: u32) -> Option<&mut AudioParam> {
        None
    }

    /// Replace the impulse response (convolution nodes only).
    fn set_impulse_response(&mut self, _ir: Arc<ImpulseResponse>) {}

    /// Reset node state.
    fn reset(&mut self) {}
}
