// Convolution reverb stage.
//
// Uniformly partitioned overlap-save convolution. The impulse response is
// cut into `PARTITION`-frame segments, each transformed once when the
// response is installed. Every completed input partition is transformed,
// pushed into a frequency-domain delay line, multiplied against all
// segment spectra and transformed back. Output lags input by exactly one
// partition.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio_buffer::AudioBuffer;
use crate::impulse::ImpulseResponse;
use crate::node::{Node, ProcessContext};

/// Partition length in frames (also the node's latency).
pub const PARTITION: usize = 128;

const FFT_SIZE: usize = PARTITION * 2;

/// Shared forward/inverse plans for one FFT size.
#[derive(Clone)]
struct FftPair {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl FftPair {
    fn new() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(FFT_SIZE),
            inverse: planner.plan_fft_inverse(FFT_SIZE),
        }
    }
}

/// Convolution state for one channel.
struct PartitionedConvolver {
    fft: FftPair,
    /// Spectra of the impulse response segments.
    segments: Vec<Vec<Complex<f32>>>,
    /// Frequency-domain delay line of past input partitions (ring).
    history: Vec<Vec<Complex<f32>>>,
    history_pos: usize,
    /// Previous and current input partition, time domain.
    window: Vec<f32>,
    /// Output of the last completed partition.
    out_block: Vec<f32>,
    fill: usize,
    scratch: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
}

impl PartitionedConvolver {
    fn new(fft: FftPair, ir: &[f32], scale: f32) -> Self {
        let mut conv = Self {
            fft,
            segments: Vec::new(),
            history: Vec::new(),
            history_pos: 0,
            window: vec![0.0; FFT_SIZE],
            out_block: vec![0.0; PARTITION],
            fill: 0,
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            accum: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        };
        conv.load(ir, scale);
        conv
    }

    /// Install a new response. Delay-line state restarts from silence.
    fn load(&mut self, ir: &[f32], scale: f32) {
        self.segments = ir
            .chunks(PARTITION)
            .map(|chunk| {
                let mut spectrum = vec![Complex::new(0.0, 0.0); FFT_SIZE];
                for (dst, &src) in spectrum.iter_mut().zip(chunk) {
                    dst.re = src * scale;
                }
                self.fft.forward.process(&mut spectrum);
                spectrum
            })
            .collect();
        if self.segments.is_empty() {
            self.segments.push(vec![Complex::new(0.0, 0.0); FFT_SIZE]);
        }
        self.history = vec![vec![Complex::new(0.0, 0.0); FFT_SIZE]; self.segments.len()];
        self.history_pos = 0;
    }

    fn reset(&mut self) {
        for h in &mut self.history {
            h.fill(Complex::new(0.0, 0.0));
        }
        self.window.fill(0.0);
        self.out_block.fill(0.0);
        self.fill = 0;
    }

    #[inline]
    fn process_sample(&mut self, x: f32) -> f32 {
        self.window[PARTITION + self.fill] = x;
        let y = self.out_block[self.fill];
        self.fill += 1;
        if self.fill == PARTITION {
            self.run_partition();
            self.fill = 0;
        }
        y
    }

    fn run_partition(&mut self) {
        let count = self.segments.len();

        for (dst, &src) in self.scratch.iter_mut().zip(&self.window) {
            *dst = Complex::new(src, 0.0);
        }
        self.fft.forward.process(&mut self.scratch);
        self.history[self.history_pos].copy_from_slice(&self.scratch);

        self.accum.fill(Complex::new(0.0, 0.0));
        for (p, segment) in self.segments.iter().enumerate() {
            let slot = (self.history_pos + count - p) % count;
            for ((acc, x), h) in self.accum.iter_mut().zip(&self.history[slot]).zip(segment) {
                *acc += x * h;
            }
        }
        self.fft.inverse.process(&mut self.accum);

        // Overlap-save: only the second half is free of wrap-around.
        let scale = 1.0 / FFT_SIZE as f32;
        for (dst, src) in self.out_block.iter_mut().zip(&self.accum[PARTITION..]) {
            *dst = src.re * scale;
        }

        self.window.copy_within(PARTITION.., 0);
        self.history_pos = (self.history_pos + 1) % count;
    }
}

/// Stereo convolution node with a hot-swappable impulse response.
///
/// Channel `n` of the input is convolved with channel `n` of the response
/// (a mono response serves both channels). Responses are loudness
/// normalized unless built with [`ConvolverNode::unnormalized`].
pub struct ConvolverNode {
    ir: Arc<ImpulseResponse>,
    normalize: bool,
    channels: Vec<PartitionedConvolver>,
    /// Remaining frames of tail after the input went quiet.
    tail_remaining: usize,
}

impl ConvolverNode {
    pub fn new(ir: Arc<ImpulseResponse>) -> Self {
        Self::build(ir, true)
    }

    /// Convolve with the response exactly as given.
    pub fn unnormalized(ir: Arc<ImpulseResponse>) -> Self {
        Self::build(ir, false)
    }

    fn build(ir: Arc<ImpulseResponse>, normalize: bool) -> Self {
        let fft = FftPair::new();
        let scale = Self::scale_for(&ir, normalize);
        let channels = (0..2)
            .map(|ch| PartitionedConvolver::new(fft.clone(), ir.channel(ch), scale))
            .collect();
        Self {
            ir,
            normalize,
            channels,
            tail_remaining: 0,
        }
    }

    fn scale_for(ir: &ImpulseResponse, normalize: bool) -> f32 {
        if normalize { ir.normalization_scale() } else { 1.0 }
    }

    /// The response currently installed.
    pub fn impulse_response(&self) -> &Arc<ImpulseResponse> {
        &self.ir
    }
}

impl Node for ConvolverNode {
    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {
        self.reset();
    }

    fn process(
        &mut self,
        ctx: &ProcessContext,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) -> bool {
        let input_silent = input.data.iter().all(|&s| s == 0.0);
        if input_silent && self.tail_remaining == 0 {
            output.clear();
            return true;
        }
        if !input_silent {
            self.tail_remaining = self.ir.len() + PARTITION * 2;
        }

        let frames = ctx.frames.min(output.frames).min(input.frames);
        for (ch, conv) in self.channels.iter_mut().enumerate().take(output.channels) {
            let src_ch = ch.min(input.channels.saturating_sub(1));
            for i in 0..frames {
                let x = input.data[src_ch * input.frames + i];
                output.data[ch * output.frames + i] = conv.process_sample(x);
            }
        }
        self.tail_remaining = self.tail_remaining.saturating_sub(frames);

        false
    }

    fn set_param(&mut self, _param_id: u32, _value: f32) {}

    fn set_impulse_response(&mut self, ir: Arc<ImpulseResponse>) {
        let scale = Self::scale_for(&ir, self.normalize);
        for (ch, conv) in self.channels.iter_mut().enumerate() {
            conv.load(ir.channel(ch), scale);
        }
        self.ir = ir;
    }

    fn reset(&mut self) {
        for conv in &mut self.channels {
            conv.reset();
        }
        self.tail_remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
        let mut y = vec![0.0; x.len()];
        for n in 0..x.len() {
            for (k, &hk) in h.iter().enumerate() {
                if n >= k {
                    y[n] += x[n - k] * hk;
                }
            }
        }
        y
    }

    fn render(node: &mut ConvolverNode, signal: &[f32], block: usize) -> Vec<f32> {
        let mut left = Vec::with_capacity(signal.len());
        for chunk in signal.chunks(block) {
            let frames = chunk.len();
            let mut inp = vec![0.0; frames * 2];
            inp[..frames].copy_from_slice(chunk);
            inp[frames..].copy_from_slice(chunk);
            let input = AudioBuffer::new(&mut inp, 2);
            let mut out = vec![0.0; frames * 2];
            let mut output = AudioBuffer::new(&mut out, 2);
            node.process(&ProcessContext::new(frames, 48_000.0, 0.0), &input, &mut output);
            left.extend_from_slice(&out[..frames]);
        }
        left
    }

    #[test]
    fn test_matches_direct_convolution_after_latency() {
        let h: Vec<f32> = (0..300).map(|i| ((i * 7 % 13) as f32 - 6.0) / 10.0).collect();
        let ir = ImpulseResponse::from_channels(48_000.0, vec![h.clone(), h.clone()]);
        let mut node = ConvolverNode::unnormalized(Arc::new(ir));

        let x: Vec<f32> = (0..1_000).map(|i| ((i * 31 % 17) as f32 - 8.0) / 8.0).collect();
        // Odd block size so partitions straddle render blocks.
        let y = render(&mut node, &x, 100);
        let expected = direct_convolution(&x, &h);

        for n in PARTITION..x.len() {
            let want = expected[n - PARTITION];
            let diff = (y[n] - want).abs();
            assert!(diff < 1e-3 * (1.0 + want.abs()), "frame {n}: {} vs {}", y[n], expected[n - PARTITION]);
        }
        assert!(y[..PARTITION].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_swap_changes_response() {
        let ir = ImpulseResponse::from_channels(48_000.0, vec![vec![1.0]]);
        let mut node = ConvolverNode::unnormalized(Arc::new(ir));

        let mut impulse = vec![0.0; 512];
        impulse[0] = 1.0;
        let y = render(&mut node, &impulse, 64);
        assert!((y[PARTITION] - 1.0).abs() < 1e-4);

        let half = ImpulseResponse::from_channels(48_000.0, vec![vec![0.5]]);
        node.set_impulse_response(Arc::new(half));
        node.reset();
        let y = render(&mut node, &impulse, 64);
        assert!((y[PARTITION] - 0.5).abs() < 1e-4);
        assert_eq!(node.impulse_response().len(), 1);
    }

    #[test]
    fn test_normalized_response_is_scaled() {
        let ir = Arc::new(ImpulseResponse::from_channels(48_000.0, vec![vec![1.0]]));
        let scale = ir.normalization_scale();
        let mut node = ConvolverNode::new(ir);

        let mut impulse = vec![0.0; 512];
        impulse[0] = 1.0;
        let y = render(&mut node, &impulse, 128);
        assert!((y[PARTITION] - scale).abs() < 1e-4 * (1.0 + scale));
    }

    #[test]
    fn test_quiet_after_tail() {
        let ir = ImpulseResponse::from_channels(48_000.0, vec![vec![0.5; 10]]);
        let mut node = ConvolverNode::unnormalized(Arc::new(ir));
        let mut signal = vec![0.0; 2_048];
        signal[0] = 1.0;
        let y = render(&mut node, &signal, 128);
        assert!(y[1_024..].iter().all(|&s| s.abs() < 1e-6));
    }
}
