//! Fire-and-forget output for the render, audio and UI collaborators
//!
//! The simulation never calls collaborators directly. It queues commands in
//! an [`Outbox`] which the host drains once per frame.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::obstacles::ObstacleKind;
use super::physics::RenderId;

/// World transform of a renderable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

/// What the renderer should create for a new id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Renderable {
    GroundTile { width: f32, length: f32 },
    Player { radius: f32, height: f32 },
    Obstacle { kind: ObstacleKind, size: Vec3 },
}

/// Scene graph mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneCommand {
    Add {
        id: RenderId,
        renderable: Renderable,
        transform: Transform,
    },
    Remove {
        id: RenderId,
    },
    SetTransform {
        id: RenderId,
        transform: Transform,
    },
    /// Highlight the obstacle the player crashed into
    MarkHit {
        id: RenderId,
    },
}

/// Sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCue {
    LaneSwitch,
    Collision,
    BackgroundStart,
    BackgroundStop,
}

/// Game lifecycle notifications for menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiEvent {
    /// Physics and character are ready; the start menu can be shown
    LoadingComplete,
    Started,
    Paused,
    Resumed,
    /// Collision ended the run (hide in-game controls)
    GameOver,
    /// Delay after game over elapsed
    ShowGameOverMenu,
    Restarted,
}

/// Per-frame queue of collaborator output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outbox {
    pub scene: Vec<SceneCommand>,
    pub audio: Vec<AudioCue>,
    pub ui: Vec<UiEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn scene(&mut self, command: SceneCommand) {
        self.scene.push(command);
    }

    #[inline]
    pub fn cue(&mut self, cue: AudioCue) {
        self.audio.push(cue);
    }

    #[inline]
    pub fn notify(&mut self, event: UiEvent) {
        self.ui.push(event);
    }

    /// Hand everything queued so far to the caller
    pub fn take(&mut self) -> Outbox {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_empty() && self.audio.is_empty() && self.ui.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains() {
        let mut outbox = Outbox::new();
        outbox.cue(AudioCue::LaneSwitch);
        outbox.notify(UiEvent::Started);
        outbox.scene(SceneCommand::Remove { id: RenderId(7) });

        let drained = outbox.take();
        assert_eq!(drained.audio, vec![AudioCue::LaneSwitch]);
        assert_eq!(drained.ui, vec![UiEvent::Started]);
        assert_eq!(drained.scene.len(), 1);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_commands_serialize_for_js_hosts() {
        let command = SceneCommand::SetTransform {
            id: RenderId(3),
            transform: Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
        };
        let json = serde_json::to_string(&command).unwrap();
        assert!(json.contains("SetTransform"));
        let back: SceneCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, command);
    }
}
