//! Keyboard and touch mapping to tick input
//!
//! Hosts capture raw events and feed them here; only lane intents and the
//! pause toggle reach the simulation.

use crate::sim::{LaneDirection, TickInput};

/// What a raw input event asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Lane(LaneDirection),
    TogglePause,
}

/// Map a `KeyboardEvent.key` value
pub fn key_to_intent(key: &str) -> Option<Intent> {
    match key {
        "ArrowLeft" | "a" | "A" => Some(Intent::Lane(LaneDirection::Left)),
        "ArrowRight" | "d" | "D" => Some(Intent::Lane(LaneDirection::Right)),
        "Escape" => Some(Intent::TogglePause),
        _ => None,
    }
}

/// Map a finished touch gesture. Mostly-horizontal swipes longer than
/// `threshold` pixels change lane.
pub fn swipe_to_intent(dx: f32, dy: f32, threshold: f32) -> Option<Intent> {
    if dx.abs() <= dy.abs() || dx.abs() <= threshold {
        return None;
    }
    let direction = if dx > 0.0 {
        LaneDirection::Right
    } else {
        LaneDirection::Left
    };
    Some(Intent::Lane(direction))
}

/// Collects intents between ticks
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    pending: TickInput,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intent: Intent) {
        match intent {
            // The controller ignores a second change mid-transition anyway
            Intent::Lane(direction) => {
                self.pending.lane_change.get_or_insert(direction);
            }
            // Two presses within one frame cancel out
            Intent::TogglePause => self.pending.toggle_pause = !self.pending.toggle_pause,
        }
    }

    /// Input for the next tick; the buffer starts empty again
    pub fn take(&mut self) -> TickInput {
        std::mem::take(&mut self.pending)
    }
}
