// src/state/mod.rs
//
// Declarative state layer for the player UI.
//
// These structures are what the controls render from. The player mutates
// them in response to user input and media events; the effects graph only
// ever reads the reverb state.
//
// Key principles:
// - All structures are serializable (for hosts that mirror them to script)
// - Derived values (messages, gain targets) are computed, never stored

mod playback;
mod reverb;

pub use playback::*;
pub use reverb::*;
