// src/nodes/mod.rs
//
// Processing stages of the player's signal graph.

mod convolver;
mod destination;
mod gain;
mod media_source;

pub use convolver::*;
pub use destination::*;
pub use gain::*;
pub use media_source::*;

// ═══════════════════════════════════════════════════════════════════
// Parameter IDs (per-node-type)
// ═══════════════════════════════════════════════════════════════════

pub mod params {
    // Gain params
    pub const GAIN: u32 = 0;
}
