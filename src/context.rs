// src/context.rs
//
// Audio-processing context: a clock, a lifecycle and the graph it renders.

use crate::audio_buffer::AudioBuffer;
use crate::config::{DEFAULT_MAX_BLOCK, DEFAULT_SAMPLE_RATE};
use crate::error::ContextError;
use crate::graph::Graph;

/// Lifecycle of an [`AudioContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing audio (autoplay policies start here).
    Suspended,
    Running,
    /// Released. Terminal.
    Closed,
}

/// Owns the signal graph and advances its clock while running.
pub struct AudioContext {
    sample_rate: f64,
    state: ContextState,
    frames_rendered: u64,
    graph: Graph,
}

impl AudioContext {
    /// A suspended context with an empty graph.
    pub fn new(sample_rate: f64, max_block: usize) -> Self {
        Self {
            sample_rate,
            state: ContextState::Suspended,
            frames_rendered: 0,
            graph: Graph::new(max_block),
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[inline]
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Context time in seconds (advances only while running).
    #[inline]
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    /// Start or continue producing audio.
    pub fn resume(&mut self) -> Result<(), ContextError> {
        match self.state {
            ContextState::Closed => Err(ContextError::Closed),
            ContextState::Suspended => {
                log::debug!("audio context resumed at {:.3}s", self.current_time());
                self.state = ContextState::Running;
                Ok(())
            }
            ContextState::Running => Ok(()),
        }
    }

    /// Release the context. Idempotent.
    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            log::debug!("audio context closed");
            self.state = ContextState::Closed;
            self.graph.reset();
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Render `out.frames` frames of the graph's output.
    ///
    /// Suspended and closed contexts render silence and do not advance the
    /// clock.
    pub fn render(&mut self, out: &mut AudioBuffer) {
        out.clear();
        if self.state != ContextState::Running {
            return;
        }

        let mut offset = 0;
        while offset < out.frames {
            let n = (out.frames - offset).min(self.graph.max_block);
            let time = self.current_time();
            self.graph.process(n, time);

            if let Some(block) = self.graph.output_buffer(n) {
                for ch in 0..out.channels {
                    let src = block.channel(ch.min(block.channels.saturating_sub(1)));
                    let start = ch * out.frames + offset;
                    out.data[start..start + n].copy_from_slice(&src[..n]);
                }
            }

            self.frames_rendered += n as u64;
            offset += n;
        }
    }
}

/// Source of audio contexts. A platform without audio support yields none.
pub trait ContextProvider {
    fn acquire(&mut self) -> Option<AudioContext>;
}

/// Contexts rendered on demand by the host (tests, offline bounce, wasm
/// callbacks driven from script).
#[derive(Debug, Clone, Copy)]
pub struct OfflineContextProvider {
    pub sample_rate: f64,
    pub max_block: usize,
}

impl OfflineContextProvider {
    pub fn new(sample_rate: f64, max_block: usize) -> Self {
        Self {
            sample_rate,
            max_block,
        }
    }
}

impl Default for OfflineContextProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_MAX_BLOCK)
    }
}

impl ContextProvider for OfflineContextProvider {
    fn acquire(&mut self) -> Option<AudioContext> {
        Some(AudioContext::new(self.sample_rate, self.max_block))
    }
}

/// A platform with no audio-processing capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudioContext;

impl ContextProvider for NoAudioContext {
    fn acquire(&mut self) -> Option<AudioContext> {
        log::warn!("no audio context available; effects disabled");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, ProcessContext};
    use crate::nodes::DestinationNode;

    struct ConstantNode(f32);

    impl Node for ConstantNode {
        fn prepare(&mut self, _: f64, _: usize) {}

        fn process(&mut self, _: &ProcessContext, _: &AudioBuffer, output: &mut AudioBuffer) -> bool {
            output.data.fill(self.0);
            false
        }

        fn set_param(&mut self, _: u32, _: f32) {}
    }

    fn constant_context(value: f32) -> AudioContext {
        let mut ctx = AudioContext::new(1_000.0, 64);
        let graph = ctx.graph_mut();
        let src = graph.add_node(Box::new(ConstantNode(value)));
        let dst = graph.add_node(Box::new(DestinationNode::new()));
        graph.connect(src, dst);
        graph.output_node = Some(dst);
        graph.prepare(1_000.0);
        ctx
    }

    #[test]
    fn test_suspended_context_is_silent_and_frozen() {
        let mut ctx = constant_context(0.5);
        let mut data = vec![1.0; 200];
        ctx.render(&mut AudioBuffer::new(&mut data, 2));
        assert!(data.iter().all(|&s| s == 0.0));
        assert_eq!(ctx.current_time(), 0.0);
    }

    #[test]
    fn test_running_context_renders_in_blocks() {
        let mut ctx = constant_context(0.5);
        ctx.resume().unwrap();
        let mut data = vec![0.0; 300];
        ctx.render(&mut AudioBuffer::new(&mut data, 2));
        assert!(data.iter().all(|&s| s == 0.5));
        assert!((ctx.current_time() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_closed_context_cannot_resume() {
        let mut ctx = constant_context(0.5);
        ctx.close();
        ctx.close();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert_eq!(ctx.resume(), Err(ContextError::Closed));
    }

    #[test]
    fn test_providers() {
        assert!(OfflineContextProvider::default().acquire().is_some());
        assert!(NoAudioContext.acquire().is_none());
    }
}
