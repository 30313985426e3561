//! Audio processing graph with topological evaluation.
//!
//! The graph owns nodes and their buffers and processes them in dependency
//! order. Edges are fixed once built: the effects controller wires the graph
//! a single time and only reparameterizes it afterwards.

use std::sync::Arc;

use crate::{
    audio_buffer::AudioBuffer,
    impulse::ImpulseResponse,
    node::{Node, ProcessContext},
    param::AudioParam,
};

/// Channel count of the summing scratch buffer.
const MAX_CHANNELS: usize = 2;

/// Storage for one node's output.
pub struct NodeBuffer {
    pub channels: usize,
    pub data: Vec<f32>,
}

impl NodeBuffer {
    pub fn new(channels: usize, max_block: usize) -> Self {
        Self {
            channels,
            data: vec![0.0; channels * max_block],
        }
    }

    /// Mutable planar view over the first `frames` frames.
    #[inline]
    pub fn as_buffer(&mut self, frames: usize) -> AudioBuffer<'_> {
        AudioBuffer {
            channels: self.channels,
            frames,
            data: &mut self.data[..self.channels * frames],
        }
    }
}

/// One node in the graph
pub struct GraphNode {
    pub node: Box<dyn Node>,
    pub inputs: Vec<usize>,
    pub silent: bool,
}

/// The audio graph
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub buffers: Vec<NodeBuffer>,
    pub output_node: Option<usize>,
    pub max_block: usize,
    pub sample_rate: f64,

    /// Topologically sorted evaluation order (computed in prepare)
    eval_order: Vec<usize>,

    /// Summed inputs for the node being processed
    input_scratch: Vec<f32>,
}

impl Graph {
    pub fn new(max_block: usize) -> Self {
        let max_block = max_block.max(1);
        Self {
            nodes: Vec::new(),
            buffers: Vec::new(),
            output_node: None,
            max_block,
            sample_rate: 48_000.0,
            eval_order: Vec::new(),
            input_scratch: vec![0.0; MAX_CHANNELS * max_block],
        }
    }

    /// Add a node to the graph. Returns the node index.
    pub fn add_node(&mut self, node: Box<dyn Node>) -> usize {
        let channels = node.num_channels().clamp(1, MAX_CHANNELS);
        let idx = self.nodes.len();

        self.nodes.push(GraphNode {
            node,
            inputs: Vec::new(),
            silent: false,
        });
        self.buffers.push(NodeBuffer::new(channels, self.max_block));

        idx
    }

    /// Add an edge: src -> dst. Repeated edges are ignored.
    pub fn connect(&mut self, src: usize, dst: usize) {
        if src >= self.nodes.len() || dst >= self.nodes.len() || src == dst {
            return;
        }
        if !self.nodes[dst].inputs.contains(&src) {
            self.nodes[dst].inputs.push(src);
        }
    }

    /// Prepare all nodes and compute evaluation order
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.eval_order = self.topological_sort();

        for (node, buf) in self.nodes.iter_mut().zip(&mut self.buffers) {
            node.node.prepare(sample_rate, self.max_block);
            node.silent = false;
            buf.data.fill(0.0);
        }
    }

    /// Compute topological sort of the graph (Kahn's algorithm)
    fn topological_sort(&self) -> Vec<usize> {
        let n = self.nodes.len();
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|node| node.inputs.len()).collect();

        let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (idx, node) in self.nodes.iter().enumerate() {
            for &input in &node.inputs {
                out_edges[input].push(idx);
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).rev().collect();
        let mut result = Vec::with_capacity(n);

        while let Some(idx) = queue.pop() {
            result.push(idx);
            for &dependent in &out_edges[idx] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push(dependent);
                }
            }
        }

        // A cycle leaves nodes unprocessed. Append them so nothing is lost;
        // their output is one block stale.
        if result.len() < n {
            debug_assert!(false, "graph contains a cycle");
            for i in 0..n {
                if !result.contains(&i) {
                    result.push(i);
                }
            }
        }

        result
    }

    /// Evaluation order, sources first.
    pub fn eval_order(&self) -> &[usize] {
        &self.eval_order
    }

    /// Process one block of at most `max_block` frames starting at context time `time`.
    pub fn process(&mut self, frames: usize, time: f64) {
        let frames = frames.min(self.max_block);
        let ctx = ProcessContext::new(frames, self.sample_rate, time);

        for i in 0..self.eval_order.len() {
            let idx = self.eval_order[i];
            self.process_node(idx, &ctx);
        }
    }

    fn process_node(&mut self, idx: usize, ctx: &ProcessContext) {
        let frames = ctx.frames;
        let Self {
            nodes,
            buffers,
            input_scratch,
            ..
        } = self;

        // Sum every upstream output into the scratch input.
        let scratch = &mut input_scratch[..MAX_CHANNELS * frames];
        scratch.fill(0.0);
        let mut input = AudioBuffer::new(scratch, MAX_CHANNELS);
        for &src in &nodes[idx].inputs {
            if nodes[src].silent {
                continue;
            }
            let src_buf = &mut buffers[src];
            let view = src_buf.as_buffer(frames);
            input.mix_from(&view);
        }

        let mut output = buffers[idx].as_buffer(frames);
        output.clear();

        let graph_node = &mut nodes[idx];
        graph_node.silent = graph_node.node.process(ctx, &input, &mut output);
    }

    /// Set a parameter on a node by graph index.
    #[inline]
    pub fn set_param(&mut self, node_idx: usize, param_id: u32, value: f32) {
        if let Some(node) = self.nodes.get_mut(node_idx) {
            node.node.set_param(param_id, value);
        }
    }

    /// Smoothed parameter on a node by graph index.
    pub fn param_mut(&mut self, node_idx: usize, param_id: u32) -> Option<&mut AudioParam> {
        self.nodes
            .get_mut(node_idx)
            .and_then(|node| node.node.param_mut(param_id))
    }

    /// Swap the impulse response held by a convolution node.
    pub fn set_impulse_response(&mut self, node_idx: usize, ir: Arc<ImpulseResponse>) {
        if let Some(node) = self.nodes.get_mut(node_idx) {
            node.node.set_impulse_response(ir);
        }
    }

    /// Reset all nodes
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.node.reset();
            node.silent = false;
        }
        for buf in &mut self.buffers {
            buf.data.fill(0.0);
        }
    }

    /// Output of the designated output node for the last processed block.
    pub fn output_buffer(&mut self, frames: usize) -> Option<AudioBuffer<'_>> {
        let frames = frames.min(self.max_block);
        let idx = self.output_node?;
        self.buffers.get_mut(idx).map(|b| b.as_buffer(frames))
    }
}
