//! Player character controller
//!
//! The player never moves along z; the world scrolls past. Lane changes ease
//! the body toward the target lane center by a fixed fraction of the remaining
//! distance each tick. After a crash the body is handed to the physics engine.

use glam::Vec3;

use super::events::{AudioCue, Outbox, Renderable, SceneCommand, Transform};
use super::lane::{Lane, LaneDirection};
use super::physics::{
    AxisLocks, BodyDesc, BodyHandle, BodyKind, ColliderDesc, EntityKind, PhysicsError,
    PhysicsWorld, RenderId, RenderIds,
};
use crate::tuning::RunnerConfig;

#[derive(Debug, Clone)]
pub struct PlayerController {
    id: RenderId,
    body: BodyHandle,
    lane: Lane,
    /// Lateral position driven by the controller
    x: f32,
    target_x: f32,
    transitioning: bool,
    dynamic: bool,
}

impl PlayerController {
    /// Build the player body in the center lane and announce it to the scene
    pub fn spawn(
        config: &RunnerConfig,
        physics: &mut PhysicsWorld,
        ids: &mut RenderIds,
        outbox: &mut Outbox,
    ) -> Result<Self, PhysicsError> {
        let id = ids.next_id();
        let lane = Lane::Center;
        let x = lane.x(&config.player_lane_centers);
        let position = Vec3::new(x, config.player_spawn_y, 0.0);

        let body = physics.create_body_with(
            BodyDesc::new(BodyKind::Dynamic, position)
                .with_locks(AxisLocks::LANE_LOCKED)
                .with_linear_damping(0.0)
                .with_additional_mass(config.player_additional_mass),
        )?;
        let collider = physics.attach_collider(
            body,
            ColliderDesc::Capsule {
                radius: config.player_radius,
                height: config.player_height,
            },
        )?;
        physics.register_entity(id, body, collider, EntityKind::Player)?;

        outbox.scene(SceneCommand::Add {
            id,
            renderable: Renderable::Player {
                radius: config.player_radius,
                height: config.player_height,
            },
            transform: Transform::from_position(position),
        });
        log::info!("Player spawned as {id:?}");

        Ok(Self {
            id,
            body,
            lane,
            x,
            target_x: x,
            transitioning: false,
            dynamic: false,
        })
    }

    pub fn id(&self) -> RenderId {
        self.id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn target_x(&self) -> f32 {
        self.target_x
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Start moving to the neighbouring lane. Returns false when ignored.
    pub fn request_lane_change(
        &mut self,
        direction: LaneDirection,
        config: &RunnerConfig,
        outbox: &mut Outbox,
    ) -> bool {
        if self.transitioning || self.dynamic {
            return false;
        }
        let Some(lane) = self.lane.shifted(direction) else {
            return false;
        };

        self.lane = lane;
        self.target_x = lane.x(&config.player_lane_centers);
        self.transitioning = true;
        outbox.cue(AudioCue::LaneSwitch);
        log::debug!("Lane change to {lane:?}");
        true
    }

    /// Advance the lane transition and hold the player at z = 0
    pub fn update(&mut self, config: &RunnerConfig, physics: &mut PhysicsWorld) -> Result<(), PhysicsError> {
        if self.dynamic {
            return Ok(());
        }

        if self.transitioning {
            self.x += (self.target_x - self.x) * config.transition_speed;
            if (self.target_x - self.x).abs() < config.transition_epsilon {
                self.x = self.target_x;
                self.transitioning = false;
            }
            let current = physics.translation(self.body)?;
            physics.set_kinematic_target(self.body, Vec3::new(self.x, current.y, 0.0))?;
        }

        let position = physics.translation(self.body)?;
        if position.z.abs() > config.z_drift_tolerance {
            log::debug!("Player drifted to z={:.3}; resetting", position.z);
            physics.set_translation(self.body, Vec3::new(position.x, position.y, 0.0))?;
        }
        Ok(())
    }

    /// Hand the body to the physics engine. Returns false if already dynamic.
    pub fn switch_to_dynamic(&mut self, physics: &mut PhysicsWorld) -> Result<bool, PhysicsError> {
        if self.dynamic {
            return Ok(false);
        }
        physics.convert_to_dynamic(self.body)?;
        physics.set_locks(self.body, AxisLocks::NONE)?;
        self.dynamic = true;
        self.transitioning = false;
        Ok(true)
    }

    pub fn despawn(self, physics: &mut PhysicsWorld, outbox: &mut Outbox) {
        physics.unregister_entity(self.id);
        outbox.scene(SceneCommand::Remove { id: self.id });
    }
}
