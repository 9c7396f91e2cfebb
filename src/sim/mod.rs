//! Run simulation
//!
//! Everything that decides what happens during a run lives here:
//! - Fixed timestep only; rapier steps at the tick rate
//! - Seeded RNG only
//! - Stable iteration order (entities keyed by render id)
//! - No rendering or platform dependencies; output goes through an [`Outbox`]

pub mod events;
pub mod lane;
pub mod obstacles;
pub mod physics;
pub mod player;
pub mod state;
pub mod tick;
pub mod track;

pub use events::{AudioCue, Outbox, Renderable, SceneCommand, Transform, UiEvent};
pub use lane::{Lane, LaneDirection, LaneOccupancy, ZInterval};
pub use obstacles::{Obstacle, ObstacleKind, WaveDiagnostics, WaveGenerator, WavePlan, plan_wave};
pub use physics::{
    AxisLocks, BodyDesc, BodyHandle, BodyKind, ColliderDesc, CollisionPair, EntityKind,
    PhysicsError, PhysicsWorld, RenderId,
};
pub use player::PlayerController;
pub use state::{GamePhase, GameState};
pub use tick::{Runner, RunnerError, TickInput};
pub use track::{Track, TrackTile};
