//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logging (console on web, env_logger on native)
//! - Frame timing (variable frames to fixed ticks)

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};

/// Install the logger and panic hook for the current platform
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::warn!("Logger already initialized");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    if env_logger::try_init().is_err() {
        log::warn!("Logger already initialized");
    }
}

/// Turns variable frame times into a number of fixed simulation ticks
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    accumulator: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks to run for a frame that took `frame_dt` seconds
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut ticks = 0;
        while self.accumulator >= SIM_DT && ticks < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            ticks += 1;
        }
        ticks
    }

    /// Forget pending time (tab hidden, game paused)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tick_per_fixed_frame() {
        let mut clock = FrameClock::new();
        let ticks: u32 = (0..60).map(|_| clock.advance(SIM_DT)).sum();
        assert_eq!(ticks, 60);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut clock = FrameClock::new();
        assert!(clock.advance(5.0) <= MAX_SUBSTEPS);
        clock.reset();
        assert_eq!(clock.advance(0.0), 0);
        assert_eq!(clock.advance(-1.0), 0);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(SIM_DT / 2.0), 0);
        assert_eq!(clock.advance(SIM_DT / 2.0 + 1e-4), 1);
    }
}
