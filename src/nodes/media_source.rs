// Media element source stage.
//
// Pulls rendered frames from the shared media element, the way a
// `MediaElementAudioSourceNode` taps an `<audio>` tag. Once this node
// exists the element's audio only reaches the output through the graph.

use crate::audio_buffer::AudioBuffer;
use crate::media::{MediaElement, SharedMedia, lock_media};
use crate::node::{Node, ProcessContext};

pub struct MediaSourceNode<M: MediaElement> {
    media: SharedMedia<M>,
}

impl<M: MediaElement> MediaSourceNode<M> {
    pub fn new(media: SharedMedia<M>) -> Self {
        Self { media }
    }
}

impl<M: MediaElement> Node for MediaSourceNode<M> {
    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

    fn process(
        &mut self,
        ctx: &ProcessContext,
        _input: &AudioBuffer,
        output: &mut AudioBuffer,
    ) -> bool {
        let produced = lock_media(&self.media).render(output, ctx.sample_rate);
        produced == 0
    }

    fn set_param(&mut self, _param_id: u32, _value: f32) {}
}
