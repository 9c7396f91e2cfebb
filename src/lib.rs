//! Lane Runner - A three-lane endless runner
//!
//! Core modules:
//! - `sim`: Run simulation (rapier physics, track, obstacle waves, player, game phases)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences (volumes, controls)
//! - `input`: Keyboard/touch mapping to tick input
//! - `audio`: Sound cue playback
//! - `platform`: Browser/native platform abstraction
//! - `web`: JS host bridge (wasm32 only)

pub mod audio;
pub mod input;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use settings::Settings;
pub use sim::{Runner, TickInput};
pub use tuning::RunnerConfig;

/// Simulation timing constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one tick per display frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the clock accepts (seconds); longer stalls are dropped
    pub const MAX_FRAME_DT: f32 = 0.1;
}
