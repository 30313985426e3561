//! Effects graph controller.
//!
//! Builds the dry/wet reverb path the first time it is needed and only
//! reparameterizes it afterwards:
//!
//! ```text
//!            ┌──▶ dry gain ───────────────┐
//! source ────┤                            ├──▶ destination
//!            └──▶ convolver ──▶ wet gain ─┘
//! ```
//!
//! Construction needs a processing context. When the platform has none, or
//! a media fault is active, the controller stays unbuilt and the element
//! keeps playing directly. That is a capability loss, not an error.

use std::sync::Arc;

use crate::audio_buffer::AudioBuffer;
use crate::config::PlayerConfig;
use crate::context::{AudioContext, ContextProvider, ContextState};
use crate::impulse::ImpulseResponse;
use crate::media::{MediaElement, SharedMedia};
use crate::nodes::{ConvolverNode, DestinationNode, GainNode, MediaSourceNode, params};
use crate::state::ReverbState;

/// Graph indexes of the fixed stages, plus the response the convolver
/// currently holds.
#[derive(Debug, Clone)]
pub struct SignalGraph {
    pub source: usize,
    pub dry: usize,
    pub wet: usize,
    pub convolver: usize,
    pub destination: usize,
    pub impulse: Arc<ImpulseResponse>,
}

pub struct EffectsGraph {
    provider: Box<dyn ContextProvider>,
    context: Option<AudioContext>,
    signal: Option<SignalGraph>,
    config: PlayerConfig,
    torn_down: bool,
}

impl EffectsGraph {
    pub fn new(provider: Box<dyn ContextProvider>, config: &PlayerConfig) -> Self {
        Self {
            provider,
            context: None,
            signal: None,
            config: config.clone(),
            torn_down: false,
        }
    }

    /// Build the graph if it does not exist yet. Returns whether the graph
    /// is available.
    pub fn ensure<M: MediaElement + 'static>(
        &mut self,
        media: &SharedMedia<M>,
        reverb: &ReverbState,
    ) -> bool {
        if self.torn_down {
            return false;
        }
        if self.signal.is_some() {
            return true;
        }

        if self.context.is_none() {
            self.context = self.provider.acquire();
        }
        let Some(ctx) = self.context.as_mut() else {
            log::debug!("no processing context; reverb unavailable");
            return false;
        };

        let sample_rate = ctx.sample_rate();
        let tail = reverb.tail_seconds;
        let impulse = Arc::new(ImpulseResponse::hall(
            sample_rate,
            tail,
            self.config.decay_for(tail),
        ));

        let graph = ctx.graph_mut();
        let source = graph.add_node(Box::new(MediaSourceNode::new(Arc::clone(media))));
        let dry = graph.add_node(Box::new(GainNode::new(1.0)));
        let wet = graph.add_node(Box::new(GainNode::new(0.0)));
        let convolver = graph.add_node(Box::new(ConvolverNode::new(Arc::clone(&impulse))));
        let destination = graph.add_node(Box::new(DestinationNode::new()));

        graph.connect(source, dry);
        graph.connect(source, convolver);
        graph.connect(convolver, wet);
        graph.connect(dry, destination);
        graph.connect(wet, destination);
        graph.output_node = Some(destination);
        graph.prepare(sample_rate);

        log::debug!(
            "signal graph built at {sample_rate} Hz, impulse {} frames",
            impulse.len()
        );

        self.signal = Some(SignalGraph {
            source,
            dry,
            wet,
            convolver,
            destination,
            impulse,
        });
        true
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.signal.is_some()
    }

    pub fn signal(&self) -> Option<&SignalGraph> {
        self.signal.as_ref()
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(AudioContext::state)
    }

    /// Response the convolver currently holds.
    pub fn impulse_response(&self) -> Option<&Arc<ImpulseResponse>> {
        self.signal.as_ref().map(|s| &s.impulse)
    }

    /// Resume a suspended context. Failure is logged and otherwise ignored.
    pub fn resume(&mut self) {
        if let Some(ctx) = self.context.as_mut() {
            if ctx.state() == ContextState::Suspended {
                if let Err(e) = ctx.resume() {
                    log::warn!("failed to resume audio context: {e}");
                }
            }
        }
    }

    /// Switch the reverb on or off. Gains approach their targets with the
    /// smoothing time constant, never as a step.
    pub fn set_reverb_enabled(&mut self, reverb: &ReverbState) {
        self.resume();
        self.apply_gains(reverb);
    }

    /// Re-aim both gains at the targets for the current settings.
    pub fn apply_gains(&mut self, reverb: &ReverbState) {
        let (Some(ctx), Some(signal)) = (self.context.as_mut(), self.signal.as_ref()) else {
            return;
        };
        let now = ctx.current_time();
        let tau = self.config.gain_time_constant;
        let wet_target = reverb.wet_target() as f32;
        let dry_target = reverb.dry_target(self.config.dry_duck) as f32;

        let graph = ctx.graph_mut();
        if let Some(wet) = graph.param_mut(signal.wet, params::GAIN) {
            wet.set_target_at_time(wet_target, now, tau);
        }
        if let Some(dry) = graph.param_mut(signal.dry, params::GAIN) {
            dry.set_target_at_time(dry_target, now, tau);
        }
    }

    /// Regenerate the impulse response for a new tail and swap it in.
    pub fn set_tail(&mut self, tail_seconds: f64) {
        let (Some(ctx), Some(signal)) = (self.context.as_mut(), self.signal.as_mut()) else {
            return;
        };
        let impulse = Arc::new(ImpulseResponse::hall(
            ctx.sample_rate(),
            tail_seconds,
            self.config.decay_for(tail_seconds),
        ));
        log::debug!("impulse regenerated: {:.1}s, {} frames", tail_seconds, impulse.len());
        ctx.graph_mut()
            .set_impulse_response(signal.convolver, Arc::clone(&impulse));
        signal.impulse = impulse;
    }

    /// Targets the (wet, dry) gains are heading for.
    pub fn gain_targets(&mut self) -> Option<(f32, f32)> {
        let ctx = self.context.as_mut()?;
        let signal = self.signal.as_ref()?;
        let graph = ctx.graph_mut();
        let wet = graph.param_mut(signal.wet, params::GAIN)?.target();
        let dry = graph.param_mut(signal.dry, params::GAIN)?.target();
        Some((wet, dry))
    }

    /// Render through the graph. Returns `false` when the graph was never
    /// built, in which case the caller renders the element directly.
    pub fn render(&mut self, out: &mut AudioBuffer) -> bool {
        match (self.context.as_mut(), self.signal.is_some()) {
            (Some(ctx), true) => {
                ctx.render(out);
                true
            }
            _ => false,
        }
    }

    /// Release the context. Nothing can be built afterwards.
    pub fn teardown(&mut self) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.close();
        }
        self.signal = None;
        self.torn_down = true;
    }
}
