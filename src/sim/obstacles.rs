//! Obstacle waves
//!
//! A wave is planned as a batch of slots at decreasing z. Every slot blocks
//! one or two lanes, chosen among the lanes that are still free over the
//! slot's z-interval, so the player always has at least one open lane.
//! Obstacles scroll toward the player and every one that passes the removal
//! line triggers a fresh wave further down the track.

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::{Outbox, Renderable, SceneCommand, Transform};
use super::lane::{Lane, LaneOccupancy, ZInterval};
use super::physics::{
    BodyHandle, BodyKind, ColliderDesc, EntityKind, PhysicsError, PhysicsWorld, RenderId, RenderIds,
};
use crate::tuning::{ObstacleProfile, RunnerConfig};

/// Obstacle footprint class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Short,
    Long,
}

impl ObstacleKind {
    pub fn profile(self, config: &RunnerConfig) -> ObstacleProfile {
        match self {
            ObstacleKind::Short => config.short_obstacle,
            ObstacleKind::Long => config.long_obstacle,
        }
    }
}

/// One slot of a planned wave
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlan {
    pub kind: ObstacleKind,
    /// Spawn z of the slot's obstacles
    pub z: f32,
    /// Stretch of track the slot occupies in its blocked lanes
    pub interval: ZInterval,
    pub blocked: Vec<Lane>,
    /// No lane was free and one had to be forced open
    pub forced: bool,
}

/// Output of [`plan_wave`]
#[derive(Debug, Clone, PartialEq)]
pub struct WavePlan {
    pub slots: Vec<SlotPlan>,
    /// Where the following wave starts
    pub next_wave_spawn_z: f32,
}

impl WavePlan {
    pub fn obstacle_count(&self) -> usize {
        self.slots.iter().map(|slot| slot.blocked.len()).sum()
    }
}

/// Counters for degraded planning paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveDiagnostics {
    pub waves_planned: u64,
    /// Slots where every lane was already taken
    pub forced_free_lanes: u64,
    /// Waves skipped because the live obstacle cap was reached
    pub waves_skipped: u64,
}

/// Plan one wave starting at `start_z`. Pure apart from the RNG.
pub fn plan_wave<R: Rng + ?Sized>(
    rng: &mut R,
    start_z: f32,
    config: &RunnerConfig,
    diagnostics: &mut WaveDiagnostics,
) -> WavePlan {
    let mut occupancy = LaneOccupancy::new();
    let mut slots = Vec::with_capacity(config.obstacles_per_wave);
    let mut cursor = start_z;

    for _ in 0..config.obstacles_per_wave {
        let kind = if rng.random_bool(0.5) {
            ObstacleKind::Short
        } else {
            ObstacleKind::Long
        };
        let depth = kind.profile(config).depth;
        let interval = ZInterval::new(cursor, cursor + depth);
        let mut free = occupancy.free_lanes(&interval);

        let (blocked, forced) = match free.len() {
            0 => {
                let keep = Lane::ALL[rng.random_range(0..Lane::ALL.len())];
                diagnostics.forced_free_lanes += 1;
                log::warn!(
                    "No free lane over [{:.1}, {:.1}); forcing {keep:?} open",
                    interval.start,
                    interval.end
                );
                (others(keep), true)
            }
            1 => (others(free[0]), false),
            n => {
                let wanted = if rng.random_bool(config.single_block_chance) {
                    1
                } else {
                    2
                };
                free.shuffle(rng);
                free.truncate(wanted.min(n - 1));
                (free, false)
            }
        };

        for &lane in &blocked {
            occupancy.occupy(lane, interval);
        }
        slots.push(SlotPlan {
            kind,
            z: cursor,
            interval,
            blocked,
            forced,
        });
        cursor -= depth + config.gap_between_obstacles;
    }

    diagnostics.waves_planned += 1;
    let plan = WavePlan {
        slots,
        next_wave_spawn_z: cursor - config.gap_between_waves,
    };
    log::debug!(
        "Planned wave at z={start_z:.1}: {} obstacles, next wave at z={:.1}",
        plan.obstacle_count(),
        plan.next_wave_spawn_z
    );
    plan
}

/// Every lane except `keep`, left to right
fn others(keep: Lane) -> Vec<Lane> {
    Lane::ALL.into_iter().filter(|&lane| lane != keep).collect()
}

/// A live obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub id: RenderId,
    pub kind: ObstacleKind,
    pub lane: Lane,
    pub z: f32,
    pub body: BodyHandle,
}

impl Obstacle {
    /// Body center; obstacles rest on the ground
    pub fn position(&self, config: &RunnerConfig) -> Vec3 {
        obstacle_position(self.kind, self.lane, self.z, config)
    }

    pub fn size(&self, config: &RunnerConfig) -> Vec3 {
        obstacle_size(self.kind, config)
    }
}

fn obstacle_position(kind: ObstacleKind, lane: Lane, z: f32, config: &RunnerConfig) -> Vec3 {
    Vec3::new(
        lane.x(&config.lane_centers),
        kind.profile(config).height / 2.0,
        z,
    )
}

fn obstacle_size(kind: ObstacleKind, config: &RunnerConfig) -> Vec3 {
    let profile = kind.profile(config);
    Vec3::new(config.obstacle_width, profile.height, profile.depth)
}

/// Owns the live obstacles and the spawn cursor
pub struct WaveGenerator {
    obstacles: Vec<Obstacle>,
    next_wave_spawn_z: f32,
    rng: Pcg32,
    diagnostics: WaveDiagnostics,
}

impl WaveGenerator {
    pub fn new(seed: u64, config: &RunnerConfig) -> Self {
        Self {
            obstacles: Vec::new(),
            next_wave_spawn_z: config.first_wave_z,
            rng: Pcg32::seed_from_u64(seed),
            diagnostics: WaveDiagnostics::default(),
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn next_wave_spawn_z(&self) -> f32 {
        self.next_wave_spawn_z
    }

    pub fn diagnostics(&self) -> WaveDiagnostics {
        self.diagnostics
    }

    /// Spawn the opening waves of a run
    pub fn init_waves(
        &mut self,
        config: &RunnerConfig,
        physics: &mut PhysicsWorld,
        ids: &mut RenderIds,
        outbox: &mut Outbox,
    ) -> Result<(), PhysicsError> {
        for _ in 0..config.initial_waves {
            self.spawn_wave(config, physics, ids, outbox)?;
        }
        log::info!(
            "Spawned {} initial waves ({} obstacles)",
            config.initial_waves,
            self.obstacles.len()
        );
        Ok(())
    }

    /// Plan the next wave and create its obstacles. Returns the number spawned.
    pub fn spawn_wave(
        &mut self,
        config: &RunnerConfig,
        physics: &mut PhysicsWorld,
        ids: &mut RenderIds,
        outbox: &mut Outbox,
    ) -> Result<usize, PhysicsError> {
        let plan = plan_wave(
            &mut self.rng,
            self.next_wave_spawn_z,
            config,
            &mut self.diagnostics,
        );

        for slot in &plan.slots {
            for &lane in &slot.blocked {
                self.spawn_obstacle(slot.kind, lane, slot.z, config, physics, ids, outbox)?;
            }
        }
        self.next_wave_spawn_z = plan.next_wave_spawn_z;
        Ok(plan.obstacle_count())
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_obstacle(
        &mut self,
        kind: ObstacleKind,
        lane: Lane,
        z: f32,
        config: &RunnerConfig,
        physics: &mut PhysicsWorld,
        ids: &mut RenderIds,
        outbox: &mut Outbox,
    ) -> Result<(), PhysicsError> {
        let id = ids.next_id();
        let position = obstacle_position(kind, lane, z, config);
        let size = obstacle_size(kind, config);

        let body = physics.create_body(BodyKind::Kinematic, position)?;
        let collider = physics.attach_collider(
            body,
            ColliderDesc::Box {
                width: size.x,
                height: size.y,
                depth: size.z,
            },
        )?;
        physics.register_entity(id, body, collider, EntityKind::Obstacle)?;

        outbox.scene(SceneCommand::Add {
            id,
            renderable: Renderable::Obstacle { kind, size },
            transform: Transform::from_position(position),
        });
        self.obstacles.push(Obstacle {
            id,
            kind,
            lane,
            z,
            body,
        });
        Ok(())
    }

    /// Scroll obstacles forward, recycle the ones past the removal line and
    /// spawn one wave per recycled obstacle. Returns how many were removed.
    pub fn update(
        &mut self,
        config: &RunnerConfig,
        physics: &mut PhysicsWorld,
        ids: &mut RenderIds,
        outbox: &mut Outbox,
    ) -> Result<usize, PhysicsError> {
        for obstacle in &mut self.obstacles {
            obstacle.z += config.game_speed;
            physics.set_kinematic_target(obstacle.body, obstacle.position(config))?;
        }

        let (passed, live): (Vec<Obstacle>, Vec<Obstacle>) = self
            .obstacles
            .iter()
            .partition(|obstacle| obstacle.z > config.remove_distance);
        self.obstacles = live;

        for obstacle in &passed {
            physics.unregister_entity(obstacle.id);
            outbox.scene(SceneCommand::Remove { id: obstacle.id });
        }

        for _ in 0..passed.len() {
            if let Some(cap) = config.max_live_obstacles
                && self.obstacles.len() >= cap
            {
                self.diagnostics.waves_skipped += 1;
                log::debug!("Live obstacle cap {cap} reached; skipping wave");
                continue;
            }
            self.spawn_wave(config, physics, ids, outbox)?;
        }
        Ok(passed.len())
    }

    /// Remove every obstacle from physics and the scene
    pub fn teardown(&mut self, physics: &mut PhysicsWorld, outbox: &mut Outbox) {
        for obstacle in self.obstacles.drain(..) {
            physics.unregister_entity(obstacle.id);
            outbox.scene(SceneCommand::Remove { id: obstacle.id });
        }
    }
}
