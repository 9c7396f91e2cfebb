//! rapier3d physics adapter
//!
//! [`PhysicsWorld`] owns the rapier simulation and the arena of
//! [`PhysicsEntity`] records that bind a renderable ([`RenderId`]) to its
//! rigid body and collider. Each step:
//!
//! 1. Queued targets for lane-locked dynamic bodies are applied.
//! 2. rapier advances by its own fixed timestep.
//! 3. Collision-start events are resolved to render ids and published to
//!    every subscriber.
//! 4. Every registered entity's visual transform is copied from its body.
//!
//! Step 4 is the only place registered transforms are written.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender};

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::Transform;

/// Rigid body handle (rapier-owned)
pub type BodyHandle = RigidBodyHandle;

/// Stable identity of a renderable object, shared by the renderer and physics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderId(pub u64);

/// Hands out unique [`RenderId`]s for one runner
#[derive(Debug, Clone)]
pub struct RenderIds {
    next: u64,
}

impl Default for RenderIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl RenderIds {
    pub fn next_id(&mut self) -> RenderId {
        let id = RenderId(self.next);
        self.next += 1;
        id
    }
}

/// Motion mode of a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Fixed,
    /// Moved only by explicit targets; ignores gravity and forces but collides
    Kinematic,
    /// Fully simulated
    Dynamic,
}

/// Semantic tag of a registered entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Obstacle,
}

/// Collider geometry. Dimensions are full extents, not half extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderDesc {
    Box { width: f32, height: f32, depth: f32 },
    Capsule { radius: f32, height: f32 },
}

/// Per-axis locks, `true` = locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisLocks {
    pub translation: [bool; 3],
    pub rotation: [bool; 3],
}

impl AxisLocks {
    pub const NONE: AxisLocks = AxisLocks {
        translation: [false; 3],
        rotation: [false; 3],
    };

    /// Lane-following player: no rotation, no forward/back drift
    pub const LANE_LOCKED: AxisLocks = AxisLocks {
        translation: [false, false, true],
        rotation: [true; 3],
    };

    /// Topples around Y only
    pub const SPIN_Y_ONLY: AxisLocks = AxisLocks {
        translation: [false; 3],
        rotation: [true, false, true],
    };

    fn to_locked_axes(self) -> LockedAxes {
        let flags = [
            (self.translation[0], LockedAxes::TRANSLATION_LOCKED_X),
            (self.translation[1], LockedAxes::TRANSLATION_LOCKED_Y),
            (self.translation[2], LockedAxes::TRANSLATION_LOCKED_Z),
            (self.rotation[0], LockedAxes::ROTATION_LOCKED_X),
            (self.rotation[1], LockedAxes::ROTATION_LOCKED_Y),
            (self.rotation[2], LockedAxes::ROTATION_LOCKED_Z),
        ];
        flags
            .into_iter()
            .filter(|(locked, _)| *locked)
            .fold(LockedAxes::empty(), |acc, (_, flag)| acc | flag)
    }

    fn from_locked_axes(axes: LockedAxes) -> Self {
        Self {
            translation: [
                axes.contains(LockedAxes::TRANSLATION_LOCKED_X),
                axes.contains(LockedAxes::TRANSLATION_LOCKED_Y),
                axes.contains(LockedAxes::TRANSLATION_LOCKED_Z),
            ],
            rotation: [
                axes.contains(LockedAxes::ROTATION_LOCKED_X),
                axes.contains(LockedAxes::ROTATION_LOCKED_Y),
                axes.contains(LockedAxes::ROTATION_LOCKED_Z),
            ],
        }
    }
}

/// Full description of a body to create
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub locks: AxisLocks,
    pub linear_damping: f32,
    pub additional_mass: f32,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, position: Vec3) -> Self {
        Self {
            kind,
            position,
            rotation: Quat::IDENTITY,
            locks: AxisLocks::NONE,
            linear_damping: 0.0,
            additional_mass: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_locks(mut self, locks: AxisLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_additional_mass(mut self, mass: f32) -> Self {
        self.additional_mass = mass;
        self
    }
}

/// Errors from body and collider operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhysicsError {
    #[error("physics world not initialized")]
    NotInitialized,
    #[error("unknown rigid body {0:?}")]
    UnknownBody(BodyHandle),
    #[error("unknown collider {0:?}")]
    UnknownCollider(ColliderHandle),
}

/// Binding between one renderable and its physics objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsEntity {
    pub body: BodyHandle,
    pub collider: ColliderHandle,
    pub kind: EntityKind,
    /// Visual transform as of the last step
    pub transform: Transform,
}

/// A collision that started during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub a: RenderId,
    pub b: RenderId,
}

impl CollisionPair {
    pub fn involves(&self, id: RenderId) -> bool {
        self.a == id || self.b == id
    }

    /// The participant that is not `id`
    pub fn other(&self, id: RenderId) -> Option<RenderId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Handle returned by [`PhysicsWorld::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// rapier state, present once the world is initialized
struct Simulation {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl Simulation {
    fn new(gravity: Vec3) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }

    fn body(&self, handle: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        self.bodies
            .get(handle)
            .ok_or(PhysicsError::UnknownBody(handle))
    }
}

/// The simulation world plus the entity arena
#[derive(Default)]
pub struct PhysicsWorld {
    sim: Option<Simulation>,
    entities: BTreeMap<RenderId, PhysicsEntity>,
    by_collider: HashMap<ColliderHandle, RenderId>,
    /// Targets for non-kinematic bodies, applied right before the next step
    pending_targets: Vec<(BodyHandle, Vector<Real>)>,
    subscribers: Vec<(SubscriptionId, Sender<CollisionPair>)>,
    next_subscription: u64,
}

impl PhysicsWorld {
    /// An uninitialized world. Call [`PhysicsWorld::init`] before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the rapier world with the given gravity
    pub fn init(&mut self, gravity: Vec3) {
        if self.sim.is_some() {
            log::warn!("Physics world already initialized");
            return;
        }
        self.sim = Some(Simulation::new(gravity));
        log::info!("Physics initialized (gravity {gravity})");
    }

    pub fn is_ready(&self) -> bool {
        self.sim.is_some()
    }

    fn sim(&self) -> Result<&Simulation, PhysicsError> {
        self.sim.as_ref().ok_or(PhysicsError::NotInitialized)
    }

    fn sim_mut(&mut self) -> Result<&mut Simulation, PhysicsError> {
        self.sim.as_mut().ok_or(PhysicsError::NotInitialized)
    }

    // === Bodies and colliders ===

    pub fn create_body(&mut self, kind: BodyKind, position: Vec3) -> Result<BodyHandle, PhysicsError> {
        self.create_body_with(BodyDesc::new(kind, position))
    }

    pub fn create_body_with(&mut self, desc: BodyDesc) -> Result<BodyHandle, PhysicsError> {
        let sim = self.sim_mut()?;
        let builder = match desc.kind {
            BodyKind::Fixed => RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .linear_damping(desc.linear_damping)
                .additional_mass(desc.additional_mass),
        };
        let mut body = builder
            .translation(to_vector(desc.position))
            .locked_axes(desc.locks.to_locked_axes())
            .build();
        body.set_rotation(to_rotation(desc.rotation), false);
        Ok(sim.bodies.insert(body))
    }

    /// Attach a collider that reports collision events
    pub fn attach_collider(
        &mut self,
        body: BodyHandle,
        shape: ColliderDesc,
    ) -> Result<ColliderHandle, PhysicsError> {
        let sim = self.sim_mut()?;
        sim.body(body)?;
        let builder = match shape {
            ColliderDesc::Box {
                width,
                height,
                depth,
            } => ColliderBuilder::cuboid(width / 2.0, height / 2.0, depth / 2.0),
            ColliderDesc::Capsule { radius, height } => ColliderBuilder::capsule_y(height / 2.0, radius),
        };
        let collider = builder
            .active_events(ActiveEvents::COLLISION_EVENTS)
            // Obstacles are kinematic; pairs of them must still report contacts
            .active_collision_types(
                ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_KINEMATIC,
            )
            .build();
        Ok(sim
            .colliders
            .insert_with_parent(collider, body, &mut sim.bodies))
    }

    // === Entity arena ===

    /// Bind `id` to a body/collider pair. Rebinding an id replaces the old pair.
    pub fn register_entity(
        &mut self,
        id: RenderId,
        body: BodyHandle,
        collider: ColliderHandle,
        kind: EntityKind,
    ) -> Result<(), PhysicsError> {
        let sim = self.sim()?;
        let transform = transform_of(sim.body(body)?);
        if sim.colliders.get(collider).is_none() {
            return Err(PhysicsError::UnknownCollider(collider));
        }

        if let Some(existing) = self.entities.get_mut(&id) {
            if existing.body == body && existing.collider == collider {
                existing.kind = kind;
                return Ok(());
            }
            log::warn!("{id:?} already registered; replacing its physics objects");
            let old = *existing;
            self.entities.remove(&id);
            self.by_collider.remove(&old.collider);
            // Handles reused by the new binding stay alive
            self.remove_objects(
                (old.body != body).then_some(old.body),
                (old.collider != collider).then_some(old.collider),
            );
        }

        self.entities.insert(
            id,
            PhysicsEntity {
                body,
                collider,
                kind,
                transform,
            },
        );
        self.by_collider.insert(collider, id);
        Ok(())
    }

    /// Remove collider and body from the simulation, then forget `id`.
    /// Unknown ids are ignored. Returns whether anything was removed.
    pub fn unregister_entity(&mut self, id: RenderId) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };
        self.by_collider.remove(&entity.collider);
        self.remove_objects(Some(entity.body), Some(entity.collider));
        true
    }

    /// Collider first, then the body. A body is removed together with its
    /// remaining colliders unless `collider` is `None`, which means another
    /// binding still owns the collider attached to it.
    fn remove_objects(&mut self, body: Option<BodyHandle>, collider: Option<ColliderHandle>) {
        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        if let Some(collider) = collider {
            sim.colliders
                .remove(collider, &mut sim.island_manager, &mut sim.bodies, false);
        }
        if let Some(body) = body {
            sim.bodies.remove(
                body,
                &mut sim.island_manager,
                &mut sim.colliders,
                &mut sim.impulse_joints,
                &mut sim.multibody_joints,
                collider.is_some(),
            );
            self.pending_targets.retain(|(pending, _)| *pending != body);
        }
    }

    pub fn entity(&self, id: RenderId) -> Option<&PhysicsEntity> {
        self.entities.get(&id)
    }

    /// Render id owning `collider`, if still registered
    pub fn resolve_collider(&self, collider: ColliderHandle) -> Option<RenderId> {
        self.by_collider.get(&collider).copied()
    }

    /// Visual transform of `id` as of the last step
    pub fn transform(&self, id: RenderId) -> Option<Transform> {
        self.entities.get(&id).map(|e| e.transform)
    }

    /// All registered transforms in id order
    pub fn transforms(&self) -> impl Iterator<Item = (RenderId, Transform)> + '_ {
        self.entities.iter().map(|(id, e)| (*id, e.transform))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn body_count(&self) -> usize {
        self.sim.as_ref().map_or(0, |sim| sim.bodies.len())
    }

    pub fn collider_count(&self) -> usize {
        self.sim.as_ref().map_or(0, |sim| sim.colliders.len())
    }

    // === Collision observers ===

    /// Register a collision observer. Each collision start is sent once.
    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<CollisionPair>) {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((id, tx));
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    fn publish(&mut self, pair: CollisionPair) {
        // Dropped receivers unsubscribe themselves
        self.subscribers.retain(|(_, tx)| tx.send(pair).is_ok());
    }

    /// Resolve a raw rapier event. Only starts with both sides registered count.
    fn resolve_event(&self, event: CollisionEvent) -> Option<CollisionPair> {
        let CollisionEvent::Started(h1, h2, _) = event else {
            return None;
        };
        match (self.resolve_collider(h1), self.resolve_collider(h2)) {
            (Some(a), Some(b)) => Some(CollisionPair { a, b }),
            _ => {
                log::trace!("Skipping collision with unregistered collider ({h1:?}, {h2:?})");
                None
            }
        }
    }

    // === Motion ===

    /// Queue the position `body` assumes on the next step
    pub fn set_kinematic_target(&mut self, body: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        let target = to_vector(position);
        let sim = self.sim.as_mut().ok_or(PhysicsError::NotInitialized)?;
        let rb = sim.body_mut(body)?;
        if rb.is_kinematic() {
            rb.set_next_kinematic_translation(target);
        } else if rb.is_dynamic() {
            self.pending_targets.push((body, target));
        } else {
            log::warn!("Ignoring kinematic target for fixed body {body:?}");
        }
        Ok(())
    }

    /// Teleport `body` immediately
    pub fn set_translation(&mut self, body: BodyHandle, position: Vec3) -> Result<(), PhysicsError> {
        self.sim_mut()?
            .body_mut(body)?
            .set_translation(to_vector(position), true);
        Ok(())
    }

    pub fn set_locks(&mut self, body: BodyHandle, locks: AxisLocks) -> Result<(), PhysicsError> {
        self.sim_mut()?
            .body_mut(body)?
            .set_locked_axes(locks.to_locked_axes(), true);
        Ok(())
    }

    /// Make `body` dynamic, free to spin around Y but not tip over on X/Z
    pub fn convert_to_dynamic(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        let rb = self.sim_mut()?.body_mut(body)?;
        rb.set_body_type(RigidBodyType::Dynamic, true);
        let mut locks = AxisLocks::from_locked_axes(rb.locked_axes());
        locks.rotation = AxisLocks::SPIN_Y_ONLY.rotation;
        rb.set_locked_axes(locks.to_locked_axes(), true);
        Ok(())
    }

    pub fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) -> Result<(), PhysicsError> {
        self.sim_mut()?
            .body_mut(body)?
            .apply_impulse(to_vector(impulse), true);
        Ok(())
    }

    pub fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) -> Result<(), PhysicsError> {
        self.sim_mut()?
            .body_mut(body)?
            .apply_torque_impulse(to_vector(torque), true);
        Ok(())
    }

    // === Queries ===

    pub fn translation(&self, body: BodyHandle) -> Result<Vec3, PhysicsError> {
        let t = self.sim()?.body(body)?.translation();
        Ok(Vec3::new(t.x, t.y, t.z))
    }

    pub fn rotation(&self, body: BodyHandle) -> Result<Quat, PhysicsError> {
        Ok(from_rotation(self.sim()?.body(body)?.rotation()))
    }

    pub fn body_kind(&self, body: BodyHandle) -> Result<BodyKind, PhysicsError> {
        let rb = self.sim()?.body(body)?;
        Ok(match rb.body_type() {
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::Fixed => BodyKind::Fixed,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                BodyKind::Kinematic
            }
        })
    }

    pub fn locks(&self, body: BodyHandle) -> Result<AxisLocks, PhysicsError> {
        Ok(AxisLocks::from_locked_axes(self.sim()?.body(body)?.locked_axes()))
    }

    // === Stepping ===

    /// Advance one fixed timestep. `dt` is informational: rapier integrates
    /// with its own fixed step so that motion is tied to the tick rate.
    pub fn step(&mut self, dt: f32) {
        let Some(sim) = self.sim.as_mut() else {
            log::warn!("Physics world not initialized; step skipped");
            return;
        };
        log::trace!(
            "Physics step (frame dt {dt:.4}, fixed dt {:.4})",
            sim.integration_params.dt
        );

        for (handle, target) in self.pending_targets.drain(..) {
            if let Some(rb) = sim.bodies.get_mut(handle) {
                rb.set_translation(target, true);
            }
        }

        let (collision_send, collision_recv) =
            rapier3d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier3d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        sim.pipeline.step(
            &sim.gravity,
            &sim.integration_params,
            &mut sim.island_manager,
            &mut sim.broad_phase,
            &mut sim.narrow_phase,
            &mut sim.bodies,
            &mut sim.colliders,
            &mut sim.impulse_joints,
            &mut sim.multibody_joints,
            &mut sim.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut started: Vec<CollisionPair> = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let Some(pair) = self.resolve_event(event) {
                started.push(pair);
            }
        }
        // Channel order is not stable; publish in id order
        started.sort_by_key(|pair| (pair.a.min(pair.b), pair.a.max(pair.b)));
        for pair in started {
            self.publish(pair);
        }

        self.sync_transforms();
    }

    fn sync_transforms(&mut self) {
        let Some(sim) = self.sim.as_ref() else {
            return;
        };
        for entity in self.entities.values_mut() {
            if let Some(rb) = sim.bodies.get(entity.body) {
                entity.transform = transform_of(rb);
            }
        }
    }
}

#[inline]
fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

#[inline]
fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

#[inline]
fn from_rotation(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

fn transform_of(rb: &RigidBody) -> Transform {
    let t = rb.translation();
    Transform {
        position: Vec3::new(t.x, t.y, t.z),
        rotation: from_rotation(rb.rotation()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.init(Vec3::new(0.0, -9.81, 0.0));
        world
    }

    fn register_box(world: &mut PhysicsWorld, id: u64, kind: BodyKind, pos: Vec3) -> BodyHandle {
        let body = world.create_body(kind, pos).unwrap();
        let collider = world
            .attach_collider(
                body,
                ColliderDesc::Box {
                    width: 1.0,
                    height: 1.0,
                    depth: 1.0,
                },
            )
            .unwrap();
        world
            .register_entity(RenderId(id), body, collider, EntityKind::Obstacle)
            .unwrap();
        body
    }

    #[test]
    fn test_step_before_init_is_noop() {
        let mut world = PhysicsWorld::new();
        assert!(!world.is_ready());
        world.step(1.0 / 60.0);
        assert_eq!(world.body_count(), 0);
        assert_eq!(
            world.create_body(BodyKind::Fixed, Vec3::ZERO),
            Err(PhysicsError::NotInitialized)
        );
    }

    #[test]
    fn test_register_then_unregister() {
        let mut world = world();
        register_box(&mut world, 1, BodyKind::Kinematic, Vec3::ZERO);
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.collider_count(), 1);

        assert!(world.unregister_entity(RenderId(1)));
        assert!(world.entity(RenderId(1)).is_none());
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut world = world();
        assert!(!world.unregister_entity(RenderId(42)));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_reregister_replaces_binding() {
        let mut world = world();
        register_box(&mut world, 1, BodyKind::Kinematic, Vec3::ZERO);
        let second = register_box(&mut world, 1, BodyKind::Kinematic, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.entity(RenderId(1)).unwrap().body, second);
    }

    #[test]
    fn test_reregister_same_body_new_collider_keeps_body() {
        let mut world = world();
        let body = register_box(&mut world, 1, BodyKind::Kinematic, Vec3::new(1.0, 2.0, 3.0));
        let old_collider = world.entity(RenderId(1)).unwrap().collider;
        let new_collider = world
            .attach_collider(body, ColliderDesc::Capsule { radius: 0.25, height: 0.8 })
            .unwrap();

        world
            .register_entity(RenderId(1), body, new_collider, EntityKind::Player)
            .unwrap();

        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.collider_count(), 1);
        assert_eq!(world.translation(body).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.resolve_collider(new_collider), Some(RenderId(1)));
        assert_eq!(world.resolve_collider(old_collider), None);

        assert!(world.unregister_entity(RenderId(1)));
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.collider_count(), 0);
    }

    #[test]
    fn test_kinematic_target_applies_on_step() {
        let mut world = world();
        let body = register_box(&mut world, 1, BodyKind::Kinematic, Vec3::new(0.0, 1.0, -10.0));
        let target = Vec3::new(0.0, 1.0, -9.7);

        world.set_kinematic_target(body, target).unwrap();
        // Not applied until the step
        assert_eq!(world.translation(body).unwrap(), Vec3::new(0.0, 1.0, -10.0));

        world.step(1.0 / 60.0);
        assert!((world.translation(body).unwrap() - target).length() < 1e-4);
        // Kinematic bodies ignore gravity
        world.step(1.0 / 60.0);
        assert!((world.translation(body).unwrap() - target).length() < 1e-4);
        // Visual transform follows the body
        let visual = world.transform(RenderId(1)).unwrap();
        assert!((visual.position - target).length() < 1e-4);
    }

    #[test]
    fn test_dynamic_body_falls_and_fixed_stays() {
        let mut world = world();
        let falling = register_box(&mut world, 1, BodyKind::Dynamic, Vec3::new(0.0, 10.0, 0.0));
        let fixed = register_box(&mut world, 2, BodyKind::Fixed, Vec3::new(5.0, 10.0, 0.0));
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        assert!(world.translation(falling).unwrap().y < 10.0);
        assert_eq!(world.translation(fixed).unwrap(), Vec3::new(5.0, 10.0, 0.0));
    }

    #[test]
    fn test_dynamic_target_queued_until_step() {
        let mut world = world();
        let body = register_box(&mut world, 1, BodyKind::Dynamic, Vec3::new(0.0, 5.0, 0.0));
        world.set_kinematic_target(body, Vec3::new(2.0, 5.0, 0.0)).unwrap();
        assert_eq!(world.translation(body).unwrap().x, 0.0);
        world.step(1.0 / 60.0);
        assert!((world.translation(body).unwrap().x - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_convert_to_dynamic_enables_only_y_rotation() {
        let mut world = world();
        let body = world
            .create_body_with(
                BodyDesc::new(BodyKind::Kinematic, Vec3::ZERO).with_locks(AxisLocks::LANE_LOCKED),
            )
            .unwrap();
        world.convert_to_dynamic(body).unwrap();

        assert_eq!(world.body_kind(body).unwrap(), BodyKind::Dynamic);
        let locks = world.locks(body).unwrap();
        assert_eq!(locks.rotation, [true, false, true]);
        // Translation locks are untouched
        assert_eq!(locks.translation, [false, false, true]);
    }

    #[test]
    fn test_initial_rotation_survives_creation() {
        let mut world = world();
        let rotation = Quat::from_rotation_y(0.5);
        let body = world
            .create_body_with(BodyDesc::new(BodyKind::Fixed, Vec3::ONE).with_rotation(rotation))
            .unwrap();
        assert!(world.rotation(body).unwrap().abs_diff_eq(rotation, 1e-5));
        assert_eq!(world.translation(body).unwrap(), Vec3::ONE);
    }

    #[test]
    fn test_resolve_event_filters_stops_and_unknown() {
        let mut world = world();
        register_box(&mut world, 1, BodyKind::Kinematic, Vec3::ZERO);
        register_box(&mut world, 2, BodyKind::Kinematic, Vec3::new(10.0, 0.0, 0.0));
        let c1 = world.entity(RenderId(1)).unwrap().collider;
        let c2 = world.entity(RenderId(2)).unwrap().collider;

        let started = CollisionEvent::Started(c1, c2, CollisionEventFlags::empty());
        assert_eq!(
            world.resolve_event(started),
            Some(CollisionPair {
                a: RenderId(1),
                b: RenderId(2)
            })
        );

        let stopped = CollisionEvent::Stopped(c1, c2, CollisionEventFlags::empty());
        assert_eq!(world.resolve_event(stopped), None);

        world.unregister_entity(RenderId(2));
        assert_eq!(world.resolve_event(started), None);
    }

    #[test]
    fn test_overlap_publishes_to_subscribers() {
        let mut world = PhysicsWorld::new();
        world.init(Vec3::ZERO);
        let (_sub, rx) = world.subscribe();
        let (other_sub, other_rx) = world.subscribe();

        let ball = world.create_body(BodyKind::Dynamic, Vec3::new(0.0, 0.0, 0.0)).unwrap();
        let capsule = world
            .attach_collider(ball, ColliderDesc::Capsule { radius: 0.25, height: 0.8 })
            .unwrap();
        world
            .register_entity(RenderId(10), ball, capsule, EntityKind::Player)
            .unwrap();
        register_box(&mut world, 20, BodyKind::Kinematic, Vec3::new(0.0, 0.0, -0.5));

        world.unsubscribe(other_sub);
        // Staying in contact does not repeat the start event
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }

        let pairs: Vec<CollisionPair> = rx.try_iter().collect();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].involves(RenderId(10)));
        assert_eq!(pairs[0].other(RenderId(10)), Some(RenderId(20)));
        assert!(other_rx.try_recv().is_err());
    }
}
