//! Fixed timestep run loop
//!
//! [`Runner`] owns one run: the physics world, track, obstacle waves, player
//! and phase machine. The host calls [`Runner::tick`] once per frame and then
//! drains [`Runner::take_outbox`].

use std::sync::mpsc::Receiver;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::{AudioCue, Outbox, SceneCommand, UiEvent};
use super::lane::LaneDirection;
use super::obstacles::WaveGenerator;
use super::physics::{BodyKind, ColliderDesc, CollisionPair, PhysicsError, PhysicsWorld, RenderId, RenderIds};
use super::player::PlayerController;
use super::state::{GamePhase, GameState};
use super::track::Track;
use crate::tuning::{ConfigError, RunnerConfig};

/// Errors raised while building a run
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    /// Lane-change intent (arrow keys / swipe)
    pub lane_change: Option<LaneDirection>,
    /// Pause toggle (Escape)
    pub toggle_pause: bool,
}

/// Invisible floor the player stands on
const GROUND_SIZE: Vec3 = Vec3::new(20.0, 1.0, 200.0);

/// Mix the run counter into the seed so restarts get fresh layouts
fn run_seed(seed: u64, run_index: u64) -> u64 {
    seed ^ run_index.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

pub struct Runner {
    config: RunnerConfig,
    seed: u64,
    run_index: u64,
    state: GameState,
    physics: PhysicsWorld,
    collisions: Receiver<CollisionPair>,
    ids: RenderIds,
    track: Track,
    waves: WaveGenerator,
    /// Present once the character is loaded
    player: Option<PlayerController>,
    outbox: Outbox,
    ticks: u64,
    /// Ticks left until the game-over menu is shown
    menu_countdown: Option<u32>,
}

impl Runner {
    /// Build the world and track. Obstacles and the player follow once the
    /// host reports the character as loaded.
    pub fn new(config: RunnerConfig, seed: u64) -> Result<Self, RunnerError> {
        config.validate()?;

        let mut physics = PhysicsWorld::new();
        physics.init(Vec3::from_array(config.gravity));
        let (_, collisions) = physics.subscribe();

        // Not registered: contacts with the floor are never reported
        let ground = physics.create_body(BodyKind::Fixed, Vec3::new(0.0, -GROUND_SIZE.y / 2.0, 0.0))?;
        physics.attach_collider(
            ground,
            ColliderDesc::Box {
                width: GROUND_SIZE.x,
                height: GROUND_SIZE.y,
                depth: GROUND_SIZE.z,
            },
        )?;

        let mut ids = RenderIds::default();
        let mut outbox = Outbox::new();
        let track = Track::new(&config, &mut ids, &mut outbox);
        let waves = WaveGenerator::new(run_seed(seed, 0), &config);

        log::info!("Runner created (seed {seed})");
        Ok(Self {
            config,
            seed,
            run_index: 0,
            state: GameState::new(),
            physics,
            collisions,
            ids,
            track,
            waves,
            player: None,
            outbox,
            ticks: 0,
            menu_countdown: None,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase()
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn waves(&self) -> &WaveGenerator {
        &self.waves
    }

    pub fn player(&self) -> Option<&PlayerController> {
        self.player.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Hand queued scene, audio and UI output to the host
    pub fn take_outbox(&mut self) -> Outbox {
        self.outbox.take()
    }

    pub fn is_loaded(&self) -> bool {
        self.player.is_some()
    }

    /// The character model is available: spawn the player and opening waves
    pub fn mark_character_loaded(&mut self) -> Result<(), PhysicsError> {
        if self.player.is_some() {
            return Ok(());
        }
        self.populate()?;
        self.outbox.notify(UiEvent::LoadingComplete);
        Ok(())
    }

    fn populate(&mut self) -> Result<(), PhysicsError> {
        self.player = Some(PlayerController::spawn(
            &self.config,
            &mut self.physics,
            &mut self.ids,
            &mut self.outbox,
        )?);
        self.waves
            .init_waves(&self.config, &mut self.physics, &mut self.ids, &mut self.outbox)
    }

    pub fn start(&mut self) -> bool {
        if self.player.is_none() {
            log::warn!("Start requested before the character loaded");
            return false;
        }
        if !self.state.start() {
            return false;
        }
        self.outbox.cue(AudioCue::BackgroundStart);
        self.outbox.notify(UiEvent::Started);
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.state.pause() {
            return false;
        }
        self.outbox.cue(AudioCue::BackgroundStop);
        self.outbox.notify(UiEvent::Paused);
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.state.resume() {
            return false;
        }
        self.outbox.cue(AudioCue::BackgroundStart);
        self.outbox.notify(UiEvent::Resumed);
        true
    }

    /// Escape key: flip between Running and Paused, ignored otherwise
    pub fn toggle_pause(&mut self) -> bool {
        match self.state.phase() {
            GamePhase::Running => self.pause(),
            GamePhase::Paused => self.resume(),
            GamePhase::Idle | GamePhase::Frozen => false,
        }
    }

    /// Tear the crashed run down and build a fresh one in Idle
    pub fn restart(&mut self) -> Result<bool, PhysicsError> {
        if !self.state.is_game_over() {
            return Ok(false);
        }

        self.waves.teardown(&mut self.physics, &mut self.outbox);
        if let Some(player) = self.player.take() {
            player.despawn(&mut self.physics, &mut self.outbox);
        }
        self.track.teardown(&mut self.outbox);
        self.collisions.try_iter().for_each(drop);
        self.menu_countdown = None;

        self.run_index += 1;
        self.track = Track::new(&self.config, &mut self.ids, &mut self.outbox);
        self.waves = WaveGenerator::new(run_seed(self.seed, self.run_index), &self.config);
        self.populate()?;

        self.state.restart();
        self.outbox.notify(UiEvent::Restarted);
        log::info!("Run {} ready", self.run_index);
        Ok(true)
    }

    /// Advance the game by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Result<(), PhysicsError> {
        self.ticks += 1;

        if input.toggle_pause {
            self.toggle_pause();
        }

        match self.state.phase() {
            GamePhase::Running => self.tick_running(input, dt),
            GamePhase::Frozen => {
                self.tick_frozen(dt);
                Ok(())
            }
            GamePhase::Idle | GamePhase::Paused => Ok(()),
        }
    }

    fn tick_running(&mut self, input: &TickInput, dt: f32) -> Result<(), PhysicsError> {
        let Some(player) = self.player.as_mut() else {
            log::warn!("Running without a player");
            return Ok(());
        };

        if let Some(direction) = input.lane_change {
            player.request_lane_change(direction, &self.config, &mut self.outbox);
        }

        self.track.update(&self.config, &mut self.outbox);
        self.waves
            .update(&self.config, &mut self.physics, &mut self.ids, &mut self.outbox)?;
        player.update(&self.config, &mut self.physics)?;
        self.physics.step(dt);
        self.sync_scene();

        if let Some(obstacle) = self.player_hit() {
            self.freeze(obstacle)?;
        }
        Ok(())
    }

    fn tick_frozen(&mut self, dt: f32) {
        self.physics.step(dt);
        self.sync_scene();
        self.collisions.try_iter().for_each(drop);

        match self.menu_countdown {
            Some(0 | 1) => {
                self.menu_countdown = None;
                self.outbox.notify(UiEvent::ShowGameOverMenu);
            }
            Some(remaining) => self.menu_countdown = Some(remaining - 1),
            None => {}
        }
    }

    /// First entity the player collided with during the last step
    fn player_hit(&self) -> Option<RenderId> {
        let player = self.player.as_ref()?.id();
        self.collisions
            .try_iter()
            .fold(None, |hit, pair| hit.or(pair.other(player)))
    }

    fn freeze(&mut self, obstacle: RenderId) -> Result<(), PhysicsError> {
        if !self.state.freeze() {
            return Ok(());
        }
        log::info!("Player hit {obstacle:?} after {} ticks", self.ticks);

        self.outbox.cue(AudioCue::Collision);
        self.outbox.cue(AudioCue::BackgroundStop);
        self.outbox.notify(UiEvent::GameOver);
        self.outbox.scene(SceneCommand::MarkHit { id: obstacle });

        if let Some(player) = self.player.as_mut() {
            player.switch_to_dynamic(&mut self.physics)?;
            self.physics
                .apply_impulse(player.body(), Vec3::from_array(self.config.knockback_impulse))?;
            self.physics.apply_torque_impulse(
                player.body(),
                Vec3::from_array(self.config.knockback_torque),
            )?;
        }
        self.menu_countdown = Some(self.config.game_over_menu_delay_ticks);
        Ok(())
    }

    /// Forward every registered body's transform to the renderer
    fn sync_scene(&mut self) {
        for (id, transform) in self.physics.transforms() {
            self.outbox.scene(SceneCommand::SetTransform { id, transform });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn loaded_runner(seed: u64) -> Runner {
        let mut runner = Runner::new(RunnerConfig::default(), seed).unwrap();
        runner.mark_character_loaded().unwrap();
        runner.take_outbox();
        runner
    }

    fn idle() -> TickInput {
        TickInput::default()
    }

    fn first_obstacle(runner: &Runner) -> RenderId {
        runner.waves().obstacles()[0].id
    }

    #[test]
    fn test_start_waits_for_character() {
        let mut runner = Runner::new(RunnerConfig::default(), 1).unwrap();
        let outbox = runner.take_outbox();
        assert_eq!(outbox.scene.len(), 5);
        assert!(!runner.start());
        assert!(runner.waves().obstacles().is_empty());

        runner.mark_character_loaded().unwrap();
        let outbox = runner.take_outbox();
        assert_eq!(outbox.ui, vec![UiEvent::LoadingComplete]);
        assert!(runner.is_loaded());
        assert!(!runner.waves().obstacles().is_empty());
        // Player plus obstacles; tiles and ground are not registered
        assert_eq!(
            runner.physics().entity_count(),
            runner.waves().obstacles().len() + 1
        );

        assert!(runner.start());
        let outbox = runner.take_outbox();
        assert_eq!(outbox.ui, vec![UiEvent::Started]);
        assert_eq!(outbox.audio, vec![AudioCue::BackgroundStart]);
    }

    #[test]
    fn test_idle_and_paused_do_not_advance() {
        let mut runner = loaded_runner(2);
        runner.tick(&idle(), SIM_DT).unwrap();
        assert_eq!(runner.track().tiles()[0].z, 0.0);

        runner.start();
        runner.tick(&idle(), SIM_DT).unwrap();
        assert!((runner.track().tiles()[0].z - 0.3).abs() < 1e-6);
        let obstacle_z = runner.waves().obstacles()[0].z;

        let toggle = TickInput {
            toggle_pause: true,
            ..Default::default()
        };
        runner.tick(&toggle, SIM_DT).unwrap();
        assert_eq!(runner.phase(), GamePhase::Paused);
        runner.tick(&idle(), SIM_DT).unwrap();
        assert_eq!(runner.waves().obstacles()[0].z, obstacle_z);

        // Toggling again resumes and the same tick advances
        runner.tick(&toggle, SIM_DT).unwrap();
        assert_eq!(runner.phase(), GamePhase::Running);
        assert!(runner.waves().obstacles()[0].z > obstacle_z);
    }

    #[test]
    fn test_toggle_pause_ignored_before_start() {
        let mut runner = loaded_runner(3);
        let toggle = TickInput {
            toggle_pause: true,
            ..Default::default()
        };
        runner.tick(&toggle, SIM_DT).unwrap();
        assert_eq!(runner.phase(), GamePhase::Idle);
        assert!(runner.take_outbox().ui.is_empty());
    }

    #[test]
    fn test_lane_input_only_while_running() {
        let mut runner = loaded_runner(4);
        let left = TickInput {
            lane_change: Some(LaneDirection::Left),
            ..Default::default()
        };
        runner.tick(&left, SIM_DT).unwrap();
        assert!(!runner.player().unwrap().is_transitioning());

        runner.start();
        runner.tick(&left, SIM_DT).unwrap();
        assert!(runner.player().unwrap().is_transitioning());
        assert!(runner.take_outbox().audio.contains(&AudioCue::LaneSwitch));
    }

    #[test]
    fn test_freeze_side_effects() {
        let mut runner = loaded_runner(5);
        runner.start();
        runner.take_outbox();
        let obstacle = first_obstacle(&runner);

        runner.freeze(obstacle).unwrap();
        assert!(runner.state().is_game_over());
        assert!(runner.player().unwrap().is_dynamic());
        let outbox = runner.take_outbox();
        assert_eq!(
            outbox.audio,
            vec![AudioCue::Collision, AudioCue::BackgroundStop]
        );
        assert_eq!(outbox.ui, vec![UiEvent::GameOver]);
        assert!(outbox.scene.contains(&SceneCommand::MarkHit { id: obstacle }));

        // Edge-triggered
        runner.freeze(obstacle).unwrap();
        assert!(runner.take_outbox().is_empty());

        // Only physics runs while frozen
        let tile_z = runner.track().tiles()[0].z;
        let player_y = runner
            .physics()
            .translation(runner.player().unwrap().body())
            .unwrap()
            .y;
        runner.tick(&idle(), SIM_DT).unwrap();
        assert_eq!(runner.track().tiles()[0].z, tile_z);
        let lifted = runner
            .physics()
            .translation(runner.player().unwrap().body())
            .unwrap()
            .y;
        assert!(lifted > player_y, "knockback should lift the player");
    }

    #[test]
    fn test_game_over_menu_after_delay() {
        let mut runner = loaded_runner(6);
        runner.start();
        runner.freeze(first_obstacle(&runner)).unwrap();
        runner.take_outbox();

        let delay = runner.config().game_over_menu_delay_ticks;
        let mut shown_at = Vec::new();
        for tick in 1..=delay + 30 {
            runner.tick(&idle(), SIM_DT).unwrap();
            if runner.take_outbox().ui.contains(&UiEvent::ShowGameOverMenu) {
                shown_at.push(tick);
            }
        }
        assert_eq!(shown_at, vec![delay]);
    }

    #[test]
    fn test_standing_still_eventually_crashes() {
        let mut runner = loaded_runner(7);
        runner.start();
        let mut hit = None;
        for _ in 0..3000 {
            runner.tick(&idle(), SIM_DT).unwrap();
            let outbox = runner.take_outbox();
            hit = outbox.scene.iter().find_map(|command| match command {
                SceneCommand::MarkHit { id } => Some(*id),
                _ => None,
            });
            if hit.is_some() {
                break;
            }
        }

        let hit = hit.expect("center lane is blocked sooner or later");
        assert_eq!(runner.phase(), GamePhase::Frozen);
        assert!(runner.waves().obstacles().iter().any(|o| o.id == hit));
    }

    #[test]
    fn test_restart_rebuilds_run() {
        let mut runner = loaded_runner(8);
        assert!(!runner.restart().unwrap());

        runner.start();
        for _ in 0..50 {
            runner.tick(&idle(), SIM_DT).unwrap();
        }
        runner.freeze(first_obstacle(&runner)).unwrap();
        let old_player = runner.player().unwrap().id();
        runner.take_outbox();

        assert!(runner.restart().unwrap());
        assert_eq!(runner.phase(), GamePhase::Idle);
        let outbox = runner.take_outbox();
        assert_eq!(outbox.ui, vec![UiEvent::Restarted]);
        assert!(outbox.scene.contains(&SceneCommand::Remove { id: old_player }));

        let player = runner.player().unwrap();
        assert_ne!(player.id(), old_player);
        assert!(!player.is_dynamic());
        assert_eq!(runner.track().tiles()[0].z, 0.0);
        assert!(runner
            .waves()
            .obstacles()
            .iter()
            .all(|o| o.z <= runner.config().first_wave_z));
        assert_eq!(
            runner.physics().entity_count(),
            runner.waves().obstacles().len() + 1
        );
        // Ground plus every registered entity
        assert_eq!(
            runner.physics().body_count(),
            runner.physics().entity_count() + 1
        );

        assert!(runner.start());
    }

    #[test]
    fn test_same_seed_same_run() {
        let layout = |runner: &Runner| -> Vec<(u64, f32, usize)> {
            runner
                .waves()
                .obstacles()
                .iter()
                .map(|o| (o.id.0, o.z, o.lane.index()))
                .collect()
        };
        let mut a = loaded_runner(99);
        let mut b = loaded_runner(99);
        a.start();
        b.start();
        for _ in 0..200 {
            a.tick(&idle(), SIM_DT).unwrap();
            b.tick(&idle(), SIM_DT).unwrap();
        }
        assert_eq!(layout(&a), layout(&b));
        assert_ne!(
            layout(&loaded_runner(99)),
            layout(&loaded_runner(100))
        );
    }
}
