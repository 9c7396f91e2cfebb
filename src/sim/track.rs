//! Looping ground ring
//!
//! Tiles scroll toward the camera and jump to the back of the ring once they
//! are fully behind it. Tiles have no physics body; the player stands on a
//! separate fixed ground collider.

use glam::Vec3;

use super::events::{Outbox, Renderable, SceneCommand, Transform};
use super::physics::{RenderId, RenderIds};
use crate::tuning::RunnerConfig;

/// One ground segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackTile {
    pub id: RenderId,
    pub z: f32,
}

impl TrackTile {
    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.z)
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    tiles: Vec<TrackTile>,
}

impl Track {
    /// Lay out the ring, tile `i` at `z = -i * tile_length`
    pub fn new(config: &RunnerConfig, ids: &mut RenderIds, outbox: &mut Outbox) -> Self {
        let tiles: Vec<TrackTile> = (0..config.tile_count)
            .map(|i| TrackTile {
                id: ids.next_id(),
                z: -(i as f32) * config.tile_length,
            })
            .collect();

        for tile in &tiles {
            outbox.scene(SceneCommand::Add {
                id: tile.id,
                renderable: Renderable::GroundTile {
                    width: config.track_width,
                    length: config.tile_length,
                },
                transform: Transform::from_position(tile.position()),
            });
        }
        Self { tiles }
    }

    pub fn tiles(&self) -> &[TrackTile] {
        &self.tiles
    }

    /// Scroll every tile by one tick
    pub fn update(&mut self, config: &RunnerConfig, outbox: &mut Outbox) {
        let ring = config.ring_length();
        for tile in &mut self.tiles {
            tile.z += config.game_speed;
            if tile.z > config.tile_length {
                tile.z -= ring;
            }
            outbox.scene(SceneCommand::SetTransform {
                id: tile.id,
                transform: Transform::from_position(tile.position()),
            });
        }
    }

    pub fn teardown(&mut self, outbox: &mut Outbox) {
        for tile in self.tiles.drain(..) {
            outbox.scene(SceneCommand::Remove { id: tile.id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn new_track(config: &RunnerConfig) -> (Track, Outbox) {
        let mut outbox = Outbox::new();
        let track = Track::new(config, &mut RenderIds::default(), &mut outbox);
        (track, outbox)
    }

    #[test]
    fn test_initial_layout() {
        let config = RunnerConfig::default();
        let (track, outbox) = new_track(&config);
        let zs: Vec<f32> = track.tiles().iter().map(|t| t.z).collect();
        assert_eq!(zs, vec![0.0, -40.0, -80.0, -120.0, -160.0]);
        assert_eq!(outbox.scene.len(), 5);
    }

    #[test]
    fn test_front_tile_wraps_to_back() {
        let config = RunnerConfig::default();
        let (mut track, mut outbox) = new_track(&config);
        // 0.3 per tick: the front tile passes z = 40 after 134 ticks
        for _ in 0..134 {
            track.update(&config, &mut outbox);
        }
        let front = track.tiles()[0].z;
        assert!(front < -150.0, "front tile should wrap, got {front}");
        assert_eq!(track.tiles().len(), 5);
    }

    #[test]
    fn test_teardown_removes_tiles() {
        let config = RunnerConfig::default();
        let (mut track, mut outbox) = new_track(&config);
        outbox.take();
        track.teardown(&mut outbox);
        assert!(track.tiles().is_empty());
        assert_eq!(outbox.scene.len(), 5);
    }

    proptest! {
        #[test]
        fn prop_recycle_preserves_ring_phase(ticks in 0usize..3000) {
            let config = RunnerConfig::default();
            let ring = config.ring_length();
            let (mut track, mut outbox) = new_track(&config);
            let start: Vec<f32> = track.tiles().iter().map(|t| t.z).collect();

            for _ in 0..ticks {
                track.update(&config, &mut outbox);
            }
            outbox.take();

            let travelled = ticks as f32 * config.game_speed;
            for (tile, z0) in track.tiles().iter().zip(start) {
                prop_assert!(tile.z <= config.tile_length && tile.z >= config.tile_length - ring - 1e-3);
                let phase = (tile.z - z0 - travelled).rem_euclid(ring);
                prop_assert!(phase < 0.1 || ring - phase < 0.1, "phase drift {}", phase);
            }
        }
    }
}
