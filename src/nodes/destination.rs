// Final output stage.

use crate::audio_buffer::AudioBuffer;
use crate::node::{Node, ProcessContext};

/// Graph sink. Connections into it are summed by the graph, so the node
/// only has to pass its input through.
#[derive(Default)]
pub struct DestinationNode;

impl DestinationNode {
    pub fn new() -> Self {
        Self
    }
}

impl Node for DestinationNode {
    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) -> bool {
        output.copy_from(input);
        false
    }

    fn set_param(&mut self, _param_id: u32, _value: f32) {}
}
