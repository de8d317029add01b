// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Public facade
//!
//! [`PhysicsWorld`] ties an engine, a registry, a clock and a host timer
//! together. Engine, registry and clock live behind one `Rc<RefCell<..>>`
//! shared with the timer callback; the callback holds only a weak reference
//! and skips the tick if the world is dropped or already borrowed.
//!
//! Two flavours of every fallible operation exist. The plain methods never
//! fail loudly: they log through the [`LogSink`] and return `None` or
//! `false`. The `try_*` methods return the [`SyncError`] instead.

use crate::clock::{SimulationClock, TimerService};
use crate::config::{ClockSettings, ConfigMerger, ObjectConfig};
use crate::constraint::{ConstraintArgs, ConstraintKind, ConstraintManager, ConstraintRequest};
use crate::engine::{BodyDesc, BodyState, PhysicsEngine, Shape};
use crate::error::{Result, SyncError};
use crate::ident::{BodyId, ConstraintId};
use crate::log::{LogSink, TracingSink};
use crate::math::{Mass, Quaternion, Vector3};
use crate::registry::{TrackedConstraint, WorldRegistry};
use crate::scene::NodeRef;
use crate::sync::WorldSnapshot;
use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Angular damping given to every body
pub const ANGULAR_DAMPING: f64 = 0.8;

/// Shape of a new object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Box whose half-extents are the configured scale
    Box,
    /// Sphere of the configured radius
    Sphere,
    /// Static ground plane, facing +Y
    Ground,
}

impl ShapeKind {
    /// Name as accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Sphere => "sphere",
            ShapeKind::Ground => "ground",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "box" => Ok(ShapeKind::Box),
            "sphere" => Ok(ShapeKind::Sphere),
            "ground" => Ok(ShapeKind::Ground),
            other => Err(SyncError::UnknownShape(other.to_string())),
        }
    }
}

struct WorldInner<E> {
    engine: E,
    registry: WorldRegistry,
    clock: SimulationClock,
}

/// A synchronized physics world
///
/// # Example
///
/// ```
/// use physics_sync::prelude::*;
///
/// let timer = ManualTimer::new();
/// let mut world = PhysicsWorld::new(
///     Vector3::new(0.0, -9.82, 0.0),
///     ReferenceEngine::new(),
///     timer.clone(),
/// );
///
/// let plane = SceneObject::shared("plane", NodeTransform::default());
/// let ball = SceneObject::shared("ball", NodeTransform::at(0.0, 2.0, 0.0));
/// world.create_object(Some(plane.clone()), ShapeKind::Ground, ObjectConfig::default());
/// world.create_object(
///     Some(ball.clone()),
///     ShapeKind::Sphere,
///     ObjectConfig::default().with_body(BodyOverrides {
///         mass: Some(1.0),
///         transform: Some(TransformOverrides {
///             position: Some(Vector3::new(0.0, 2.0, 0.0)),
///             ..Default::default()
///         }),
///         ..Default::default()
///     }),
/// );
///
/// world.start();
/// timer.fire(0.0);
/// timer.fire(16.0);
/// assert!(ball.borrow().transform().y < 2.0);
/// assert_eq!(plane.borrow().transform().y, 0.0);
///
/// world.stop();
/// assert_eq!(ball.borrow().transform().y, 2.0);
/// ```
pub struct PhysicsWorld<E, T>
where
    E: PhysicsEngine + 'static,
    T: TimerService,
{
    inner: Rc<RefCell<WorldInner<E>>>,
    timer: T,
    merger: ConfigMerger,
    sink: Rc<dyn LogSink>,
}

impl<E, T> PhysicsWorld<E, T>
where
    E: PhysicsEngine + 'static,
    T: TimerService,
{
    /// Create a world with default clock settings
    pub fn new(gravity: Vector3, engine: E, timer: T) -> Self {
        Self::build(gravity, engine, timer, ClockSettings::default())
    }

    /// Create a world with custom clock settings
    pub fn with_settings(
        gravity: Vector3,
        engine: E,
        timer: T,
        settings: ClockSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(gravity, engine, timer, settings))
    }

    fn build(gravity: Vector3, mut engine: E, timer: T, settings: ClockSettings) -> Self {
        engine.set_gravity(gravity);
        PhysicsWorld {
            inner: Rc::new(RefCell::new(WorldInner {
                engine,
                registry: WorldRegistry::new(),
                clock: SimulationClock::new(settings),
            })),
            timer,
            merger: ConfigMerger::new(),
            sink: Rc::new(TracingSink),
        }
    }

    /// Replace the log sink
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Rc::new(sink);
        self
    }

    /// Replace the defaults template used for new objects
    pub fn with_defaults(mut self, template: ObjectConfig) -> Self {
        self.merger = ConfigMerger::with_template(template);
        self
    }

    fn inner_mut(&self) -> Result<RefMut<'_, WorldInner<E>>> {
        self.inner.try_borrow_mut().map_err(|_| SyncError::Busy)
    }

    /// Run a read-only query, reporting [`SyncError::Busy`] instead of panicking
    fn read<R>(&self, query: impl FnOnce(&WorldInner<E>) -> R) -> Option<R> {
        match self.inner.try_borrow() {
            Ok(inner) => Some(query(&inner)),
            Err(_) => {
                self.report(&SyncError::Busy);
                None
            }
        }
    }

    fn report(&self, err: &SyncError) {
        let message = match err {
            SyncError::BodyNotFound(_) => "Bodies were not found.".to_string(),
            other => other.to_string(),
        };
        self.sink.log(&message);
    }

    /// Create a body and track it, optionally bound to a node
    ///
    /// `config` is merged against the defaults template first; it is
    /// consumed. Ground planes are always static and face +Y whatever the
    /// configured mass and rotation.
    pub fn try_create_object(
        &mut self,
        node: Option<NodeRef>,
        shape: ShapeKind,
        mut config: ObjectConfig,
    ) -> Result<BodyId> {
        self.merger.merge(&mut config);
        let resolved = config.resolve()?;
        let body = resolved.body;
        let transform = body.transform;

        let is_ground = shape == ShapeKind::Ground;
        let mass = if is_ground {
            Mass::immovable()
        } else {
            Mass::try_new(body.mass).ok_or(SyncError::InvalidMass(body.mass))?
        };

        let quaternion = if is_ground {
            Quaternion::from_axis_angle(Vector3::new(1.0, 0.0, 0.0), -std::f64::consts::FRAC_PI_2)
        } else {
            if !transform.rotation.is_unit() {
                tracing::warn!(
                    norm = transform.rotation.norm(),
                    "initial rotation is not a unit quaternion; the engine will normalize it"
                );
            }
            transform.rotation
        };

        let shape_desc = match shape {
            ShapeKind::Box => Shape::Box {
                half_extents: transform.scale,
            },
            ShapeKind::Sphere => Shape::Sphere {
                radius: body.radius,
            },
            ShapeKind::Ground => Shape::Plane,
        };

        let mut inner = self.inner_mut()?;
        let inner = &mut *inner;
        let handle = inner.engine.add_body(BodyDesc {
            shape: shape_desc,
            mass,
            position: transform.position,
            quaternion,
            angular_damping: ANGULAR_DAMPING,
        });
        let id = inner
            .registry
            .add_body(handle, node, resolved.sync, is_ground);
        tracing::debug!(%id, %shape, %handle, "created object");
        Ok(id)
    }

    /// [`try_create_object`](Self::try_create_object), logging failures
    pub fn create_object(
        &mut self,
        node: Option<NodeRef>,
        shape: ShapeKind,
        config: ObjectConfig,
    ) -> Option<BodyId> {
        self.try_create_object(node, shape, config)
            .map_err(|err| self.report(&err))
            .ok()
    }

    /// Create an object from a shape name: `box`, `sphere` or `ground`
    pub fn create_object_named(
        &mut self,
        node: Option<NodeRef>,
        shape: &str,
        config: ObjectConfig,
    ) -> Option<BodyId> {
        match shape.parse::<ShapeKind>() {
            Ok(shape) => self.create_object(node, shape, config),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    /// Create and attach a constraint between two tracked bodies
    pub fn try_create_constraint(
        &mut self,
        body_a: &BodyId,
        body_b: &BodyId,
        kind: ConstraintKind,
    ) -> Result<ConstraintId> {
        let request = ConstraintRequest {
            body_a: body_a.clone(),
            body_b: body_b.clone(),
            kind,
        };
        self.try_create_request(&request)
    }

    fn try_create_request(&mut self, request: &ConstraintRequest) -> Result<ConstraintId> {
        let id = {
            let mut inner = self.inner_mut()?;
            let inner = &mut *inner;
            ConstraintManager::new(&mut inner.registry, &mut inner.engine).create(request)?
        };
        tracing::debug!(%id, kind = request.kind.name(), "created constraint");
        self.sink.log("Added constraint to world.");
        Ok(id)
    }

    /// [`try_create_constraint`](Self::try_create_constraint), logging failures
    pub fn create_constraint(
        &mut self,
        body_a: &BodyId,
        body_b: &BodyId,
        kind: ConstraintKind,
    ) -> Option<ConstraintId> {
        self.try_create_constraint(body_a, body_b, kind)
            .map_err(|err| self.report(&err))
            .ok()
    }

    /// Create a constraint from a type name and host-shaped arguments
    ///
    /// Type names are `point`, `hinge`, `conetwist` and `lock`.
    pub fn try_create_constraint_from_args(
        &mut self,
        type_name: &str,
        args: &ConstraintArgs,
    ) -> Result<ConstraintId> {
        let request = args.to_request(type_name)?;
        self.try_create_request(&request)
    }

    /// [`try_create_constraint_from_args`](Self::try_create_constraint_from_args),
    /// logging failures
    pub fn create_constraint_from_args(
        &mut self,
        type_name: &str,
        args: &ConstraintArgs,
    ) -> Option<ConstraintId> {
        self.try_create_constraint_from_args(type_name, args)
            .map_err(|err| self.report(&err))
            .ok()
    }

    /// Detach a constraint but keep tracking it
    pub fn try_pause_constraint(&mut self, id: &ConstraintId) -> Result<()> {
        let mut inner = self.inner_mut()?;
        let inner = &mut *inner;
        ConstraintManager::new(&mut inner.registry, &mut inner.engine).pause(id)
    }

    /// [`try_pause_constraint`](Self::try_pause_constraint); false if nothing was paused
    pub fn pause_constraint(&mut self, id: &ConstraintId) -> bool {
        self.try_pause_constraint(id)
            .map_err(|err| self.report(&err))
            .is_ok()
    }

    /// Re-attach a paused constraint
    ///
    /// `Ok(false)` means it was already active and nothing changed.
    pub fn try_resume_constraint(&mut self, id: &ConstraintId) -> Result<bool> {
        let mut inner = self.inner_mut()?;
        let inner = &mut *inner;
        ConstraintManager::new(&mut inner.registry, &mut inner.engine).resume(id)
    }

    /// [`try_resume_constraint`](Self::try_resume_constraint); true only if re-attached
    pub fn resume_constraint(&mut self, id: &ConstraintId) -> bool {
        self.try_resume_constraint(id)
            .map_err(|err| self.report(&err))
            .unwrap_or(false)
    }

    /// Detach a constraint; with `full_wipe` also forget and free it
    pub fn try_remove_constraint(&mut self, id: &ConstraintId, full_wipe: bool) -> Result<()> {
        let mut inner = self.inner_mut()?;
        let inner = &mut *inner;
        ConstraintManager::new(&mut inner.registry, &mut inner.engine).remove(id, full_wipe)
    }

    /// [`try_remove_constraint`](Self::try_remove_constraint); false if nothing was removed
    pub fn remove_constraint(&mut self, id: &ConstraintId, full_wipe: bool) -> bool {
        self.try_remove_constraint(id, full_wipe)
            .map_err(|err| self.report(&err))
            .is_ok()
    }

    /// Snapshot every body and begin stepping on the host timer
    ///
    /// Returns false if the world was already running.
    pub fn try_start(&mut self) -> Result<bool> {
        let (generation, interval_ms) = {
            let mut inner = self.inner_mut()?;
            let inner = &mut *inner;
            let Some(generation) = inner.clock.start(&inner.engine, inner.registry.bodies()) else {
                return Ok(false);
            };
            (generation, inner.clock.settings().interval_ms)
        };

        let weak = Rc::downgrade(&self.inner);
        let handle = self.timer.set_interval(
            interval_ms,
            Box::new(move |timestamp| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let Ok(mut inner) = shared.try_borrow_mut() else {
                    tracing::warn!(timestamp, "world busy, skipping tick");
                    return;
                };
                let inner = &mut *inner;
                inner
                    .clock
                    .tick(generation, timestamp, &mut inner.engine, inner.registry.bodies());
            }),
        );

        self.inner_mut()?.clock.attach_timer(handle);
        tracing::info!(generation, interval_ms, "simulation started");
        Ok(true)
    }

    /// [`try_start`](Self::try_start), logging failures
    pub fn start(&mut self) -> bool {
        self.try_start().map_err(|err| self.report(&err)).unwrap_or(false)
    }

    /// Stop stepping and restore every body to its snapshot
    ///
    /// Returns false if the world was not running.
    pub fn try_stop(&mut self) -> Result<bool> {
        let timer = {
            let mut inner = self.inner_mut()?;
            let inner = &mut *inner;
            match inner.clock.stop(&mut inner.engine, inner.registry.bodies()) {
                Some(timer) => timer,
                None => return Ok(false),
            }
        };
        if let Some(handle) = timer {
            self.timer.clear_interval(handle);
        }
        tracing::info!("simulation stopped");
        Ok(true)
    }

    /// [`try_stop`](Self::try_stop), logging failures
    pub fn stop(&mut self) -> bool {
        self.try_stop().map_err(|err| self.report(&err)).unwrap_or(false)
    }

    /// Whether the clock is running
    ///
    /// Reads as false, with a logged [`SyncError::Busy`], when called while
    /// the world is mid-tick.
    pub fn is_running(&self) -> bool {
        self.read(|inner| inner.clock.is_running()).unwrap_or(false)
    }

    /// World gravity
    pub fn gravity(&self) -> Option<Vector3> {
        self.read(|inner| inner.engine.gravity())
    }

    /// Number of tracked bodies; zero while busy
    pub fn body_count(&self) -> usize {
        self.read(|inner| inner.registry.body_count()).unwrap_or(0)
    }

    /// Identities of every tracked body in creation order; empty while busy
    pub fn body_ids(&self) -> Vec<BodyId> {
        self.read(|inner| {
            inner
                .registry
                .bodies()
                .iter()
                .map(|b| b.id().clone())
                .collect()
        })
        .unwrap_or_default()
    }

    /// Number of tracked constraints, active or paused; zero while busy
    pub fn constraint_count(&self) -> usize {
        self.read(|inner| inner.registry.constraint_count()).unwrap_or(0)
    }

    /// Copy of a tracked constraint
    pub fn find_constraint(&self, id: &ConstraintId) -> Option<TrackedConstraint> {
        self.read(|inner| inner.registry.find_constraint(id).cloned())
            .flatten()
    }

    /// Whether the constraint's engine handle is attached
    pub fn is_constraint_attached(&self, id: &ConstraintId) -> bool {
        self.read(|inner| {
            inner
                .registry
                .find_constraint(id)
                .map_or(false, |c| inner.engine.is_constraint_attached(c.handle()))
        })
        .unwrap_or(false)
    }

    /// Copy of a body's simulation state
    pub fn body_state(&self, id: &BodyId) -> Option<BodyState> {
        self.read(|inner| {
            let handle = inner.registry.find_body(id)?.handle();
            inner.engine.body(handle).copied()
        })
        .flatten()
    }

    /// Mutate a body's simulation state, e.g. to apply a force or a velocity
    pub fn with_body_state_mut<R>(
        &mut self,
        id: &BodyId,
        f: impl FnOnce(&mut BodyState) -> R,
    ) -> Option<R> {
        let mut inner = self.inner_mut().map_err(|err| self.report(&err)).ok()?;
        let inner = &mut *inner;
        let handle = inner.registry.find_body(id)?.handle();
        inner.engine.body_mut(handle).map(f)
    }

    /// Baseline captured by the last start
    pub fn snapshot(&self) -> Option<WorldSnapshot> {
        self.read(|inner| inner.clock.snapshot().cloned()).flatten()
    }
}

impl<E, T> Drop for PhysicsWorld<E, T>
where
    E: PhysicsEngine + 'static,
    T: TimerService,
{
    fn drop(&mut self) {
        let timer = self
            .inner
            .try_borrow()
            .ok()
            .and_then(|inner| inner.clock.timer());
        if let Some(handle) = timer {
            self.timer.clear_interval(handle);
        }
    }
}

impl<E, T> fmt::Debug for PhysicsWorld<E, T>
where
    E: PhysicsEngine + 'static,
    T: TimerService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("PhysicsWorld")
                .field("bodies", &inner.registry.body_count())
                .field("constraints", &inner.registry.constraint_count())
                .field("running", &inner.clock.is_running())
                .finish(),
            Err(_) => f.write_str("PhysicsWorld { <busy> }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimer;
    use crate::config::{BodyOverrides, TransformOverrides};
    use crate::engine::ReferenceEngine;
    use crate::log::RecordingSink;
    use crate::scene::{NodeTransform, SceneNode, SceneObject};

    fn world() -> (PhysicsWorld<ReferenceEngine, ManualTimer>, ManualTimer, RecordingSink) {
        let timer = ManualTimer::new();
        let sink = RecordingSink::new();
        let world = PhysicsWorld::new(
            Vector3::new(0.0, -9.82, 0.0),
            ReferenceEngine::new(),
            timer.clone(),
        )
        .with_sink(sink.clone());
        (world, timer, sink)
    }

    fn at(mass: f64, y: f64) -> ObjectConfig {
        ObjectConfig::default().with_body(BodyOverrides {
            mass: Some(mass),
            transform: Some(TransformOverrides {
                position: Some(Vector3::new(0.0, y, 0.0)),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    #[test]
    fn test_shape_kind_parse() {
        assert_eq!("box".parse::<ShapeKind>(), Ok(ShapeKind::Box));
        assert_eq!("ground".parse::<ShapeKind>(), Ok(ShapeKind::Ground));
        assert_eq!(
            "cone".parse::<ShapeKind>(),
            Err(SyncError::UnknownShape("cone".to_string()))
        );
    }

    #[test]
    fn test_gravity_is_applied_to_engine() {
        let (world, _, _) = world();
        assert_eq!(world.gravity(), Some(Vector3::new(0.0, -9.82, 0.0)));
    }

    #[test]
    fn test_ground_is_static_and_flat() {
        let (mut world, _, _) = world();
        let id = world
            .try_create_object(None, ShapeKind::Ground, at(50.0, 0.0))
            .unwrap();
        let state = world.body_state(&id).unwrap();
        let up = state.quaternion.rotate(Vector3::new(0.0, 0.0, 1.0));
        assert!((up.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_box_uses_scale_as_half_extents() {
        let (mut world, timer, _) = world();
        let floor = world.try_create_object(None, ShapeKind::Ground, ObjectConfig::default());
        assert!(floor.is_ok());
        let config = ObjectConfig::default().with_body(BodyOverrides {
            mass: Some(1.0),
            transform: Some(TransformOverrides {
                position: Some(Vector3::new(0.0, 1.0, 0.0)),
                rotation: Some(Quaternion::identity()),
                scale: Some(Vector3::new(0.5, 0.2, 0.5)),
            }),
            ..Default::default()
        });
        let id = world.try_create_object(None, ShapeKind::Box, config).unwrap();

        world.start();
        for i in 0..120 {
            timer.fire(i as f64 * 16.0);
        }
        let y = world.body_state(&id).unwrap().position.y();
        assert!((y - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_negative_mass_is_rejected_and_logged() {
        let (mut world, _, sink) = world();
        assert_eq!(
            world.try_create_object(None, ShapeKind::Sphere, at(-1.0, 0.0)),
            Err(SyncError::InvalidMass(-1.0))
        );
        assert!(world.create_object(None, ShapeKind::Sphere, at(-1.0, 0.0)).is_none());
        assert!(sink.contains("invalid mass"));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_unknown_shape_name_is_logged() {
        let (mut world, _, sink) = world();
        assert!(world
            .create_object_named(None, "torus", ObjectConfig::default())
            .is_none());
        assert!(sink.contains("torus"));
    }

    #[test]
    fn test_constraint_success_is_logged() {
        let (mut world, _, sink) = world();
        let a = world.create_object(None, ShapeKind::Sphere, at(1.0, 0.0)).unwrap();
        let b = world.create_object(None, ShapeKind::Sphere, at(1.0, 3.0)).unwrap();
        let id = world
            .create_constraint(
                &a,
                &b,
                ConstraintKind::PointToPoint {
                    pivot_a: Vector3::zero(),
                    pivot_b: Vector3::zero(),
                },
            )
            .unwrap();

        assert_eq!(sink.messages(), vec!["Added constraint to world.".to_string()]);
        assert!(world.is_constraint_attached(&id));
    }

    #[test]
    fn test_missing_body_logs_and_changes_nothing() {
        let (mut world, _, sink) = world();
        let a = world.create_object(None, ShapeKind::Sphere, at(1.0, 0.0)).unwrap();
        let ghost = BodyId::from("ghost");

        let lock = ConstraintKind::Lock {
            pivot_a: Vector3::zero(),
            pivot_b: Vector3::zero(),
        };
        assert!(world.create_constraint(&ghost, &a, lock).is_none());
        assert!(sink.contains("Bodies were not found."));
        assert_eq!(world.constraint_count(), 0);
    }

    #[test]
    fn test_pause_resume_flags() {
        let (mut world, _, _) = world();
        let a = world.create_object(None, ShapeKind::Sphere, at(1.0, 0.0)).unwrap();
        let b = world.create_object(None, ShapeKind::Box, at(1.0, 2.0)).unwrap();
        let id = world
            .create_constraint(
                &a,
                &b,
                ConstraintKind::Lock {
                    pivot_a: Vector3::new(0.0, 2.0, 0.0),
                    pivot_b: Vector3::zero(),
                },
            )
            .unwrap();

        assert!(world.pause_constraint(&id));
        assert!(!world.find_constraint(&id).unwrap().is_active());
        assert!(!world.is_constraint_attached(&id));

        assert!(world.resume_constraint(&id));
        assert!(!world.resume_constraint(&id));
        assert!(world.find_constraint(&id).unwrap().is_active());
        assert!(world.is_constraint_attached(&id));
    }

    #[test]
    fn test_lookups_on_missing_constraint_are_logged_no_ops() {
        let (mut world, _, sink) = world();
        let id = ConstraintId::from("bm9wZQ==");
        assert!(!world.pause_constraint(&id));
        assert!(!world.resume_constraint(&id));
        assert!(!world.remove_constraint(&id, true));
        assert_eq!(sink.messages().len(), 3);
    }

    #[test]
    fn test_start_stop_state_machine() {
        let (mut world, timer, _) = world();
        assert!(!world.stop());
        assert!(world.start());
        assert!(!world.start());
        assert!(world.is_running());
        assert_eq!(timer.active_intervals(), 1);

        assert!(world.stop());
        assert!(!world.is_running());
        assert_eq!(timer.active_intervals(), 0);
        assert!(!world.stop());
    }

    #[test]
    fn test_tick_syncs_node() {
        let (mut world, timer, _) = world();
        let node = SceneObject::shared("ball", NodeTransform::at(0.0, 2.0, 0.0));
        world
            .try_create_object(Some(node.clone()), ShapeKind::Sphere, at(1.0, 2.0))
            .unwrap();

        world.start();
        timer.advance(100.0);
        assert!(node.borrow().transform().y < 2.0);
    }

    #[test]
    fn test_drop_clears_timer() {
        let (mut world, timer, _) = world();
        world.start();
        assert_eq!(timer.active_intervals(), 1);
        drop(world);
        assert_eq!(timer.active_intervals(), 0);
        timer.advance(50.0);
    }

    #[test]
    fn test_with_settings_validates() {
        let settings = ClockSettings {
            fixed_time_step: -1.0,
            ..Default::default()
        };
        assert!(PhysicsWorld::with_settings(
            Vector3::zero(),
            ReferenceEngine::new(),
            ManualTimer::new(),
            settings
        )
        .is_err());
    }

    #[test]
    fn test_with_body_state_mut() {
        let (mut world, _, _) = world();
        let id = world.create_object(None, ShapeKind::Sphere, at(1.0, 0.0)).unwrap();
        world.with_body_state_mut(&id, |s| s.velocity = Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(
            world.body_state(&id).unwrap().velocity,
            Vector3::new(1.0, 0.0, 0.0)
        );
        assert!(world
            .with_body_state_mut(&BodyId::from("ghost"), |_| ())
            .is_none());
    }

    type SharedWorld = PhysicsWorld<ReferenceEngine, ManualTimer>;

    /// Node that calls back into the world whenever it is written
    struct Inspector {
        transform: NodeTransform,
        world: std::rc::Weak<RefCell<SharedWorld>>,
        seen_count: Rc<std::cell::Cell<Option<usize>>>,
        mutated: Rc<std::cell::Cell<Option<bool>>>,
    }

    impl SceneNode for Inspector {
        fn transform(&self) -> &NodeTransform {
            &self.transform
        }

        fn transform_mut(&mut self) -> &mut NodeTransform {
            if let Some(world) = self.world.upgrade() {
                if let Ok(mut world) = world.try_borrow_mut() {
                    self.seen_count.set(Some(world.body_count()));
                    let ids = world.body_ids();
                    assert!(ids.is_empty());
                    assert!(world.gravity().is_none());
                    let ghost = BodyId::from("ghost");
                    assert!(world.body_state(&ghost).is_none());
                    let touched = world.with_body_state_mut(&ghost, |_| ());
                    self.mutated.set(Some(touched.is_some()));
                }
            }
            &mut self.transform
        }
    }

    fn inspected_world() -> (
        Rc<RefCell<SharedWorld>>,
        ManualTimer,
        RecordingSink,
        Rc<std::cell::Cell<Option<usize>>>,
        Rc<std::cell::Cell<Option<bool>>>,
    ) {
        let (world, timer, sink) = world();
        let world = Rc::new(RefCell::new(world));
        let seen_count = Rc::new(std::cell::Cell::new(None));
        let mutated = Rc::new(std::cell::Cell::new(None));
        let node: NodeRef = Rc::new(RefCell::new(Inspector {
            transform: NodeTransform::at(0.0, 2.0, 0.0),
            world: Rc::downgrade(&world),
            seen_count: seen_count.clone(),
            mutated: mutated.clone(),
        }));
        world
            .borrow_mut()
            .create_object(Some(node), ShapeKind::Sphere, at(1.0, 2.0))
            .unwrap();
        (world, timer, sink, seen_count, mutated)
    }

    #[test]
    fn test_accessors_during_tick_report_busy() {
        let (world, timer, sink, seen_count, _) = inspected_world();
        assert!(world.borrow_mut().start());

        timer.fire(0.0);
        timer.fire(16.0);

        assert_eq!(seen_count.get(), Some(0));
        assert!(sink.contains(&SyncError::Busy.to_string()));
        // the tick itself still completed
        let ids = world.borrow().body_ids();
        assert!(world.borrow().body_state(&ids[0]).unwrap().position.y() < 2.0);
        assert_eq!(world.borrow().body_count(), 1);
    }

    #[test]
    fn test_body_mutation_during_tick_is_reported() {
        let (world, timer, sink, _, mutated) = inspected_world();
        world.borrow_mut().start();
        sink.clear();

        timer.fire(0.0);
        timer.fire(16.0);

        assert_eq!(mutated.get(), Some(false));
        assert!(sink.contains(&SyncError::Busy.to_string()));
    }
}
