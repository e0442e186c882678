// ctrl2esc Transform Module
// Remap state machine: policy table, per-session state and transition function

pub mod engine;
pub mod policy;
pub mod state;

pub use engine::{remap, RemapEngine, RemapOutput, MAX_OUTPUT_EVENTS};
pub use policy::{KeySwap, RemapPolicy, TrackedModifier};
pub use state::ModifierState;
