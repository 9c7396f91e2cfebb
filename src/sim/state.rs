//! Game phase state machine
//!
//! Transitions return `true` when they fired. Requests that do not apply to
//! the current phase are ignored.

use serde::{Deserialize, Serialize};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Run built, waiting for start
    #[default]
    Idle,
    /// World scrolling, input accepted
    Running,
    /// Game is paused
    Paused,
    /// Player crashed; only physics keeps stepping
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameState {
    phase: GamePhase,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::Frozen
    }

    pub fn is_paused(&self) -> bool {
        self.phase == GamePhase::Paused
    }

    pub fn game_started(&self) -> bool {
        self.phase != GamePhase::Idle
    }

    fn transition(&mut self, from: &[GamePhase], to: GamePhase) -> bool {
        if !from.contains(&self.phase) {
            log::debug!("Ignoring {:?} -> {:?}", self.phase, to);
            return false;
        }
        log::info!("Game phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
        true
    }

    pub fn start(&mut self) -> bool {
        self.transition(&[GamePhase::Idle], GamePhase::Running)
    }

    pub fn pause(&mut self) -> bool {
        self.transition(&[GamePhase::Running], GamePhase::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(&[GamePhase::Paused], GamePhase::Running)
    }

    /// Crash. Fires at most once per run.
    pub fn freeze(&mut self) -> bool {
        self.transition(
            &[GamePhase::Idle, GamePhase::Running, GamePhase::Paused],
            GamePhase::Frozen,
        )
    }

    /// Back to Idle after a crash
    pub fn restart(&mut self) -> bool {
        self.transition(&[GamePhase::Frozen], GamePhase::Idle)
    }
}
