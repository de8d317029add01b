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
//! Constraint lifecycle
//!
//! [`ConstraintManager`] keeps the registry's `is_active` flag and the
//! engine's attachment state in agreement across create, pause, resume and
//! remove. [`ConstraintArgs`] is the loosely-typed host entry point; it is
//! checked once and turned into a [`ConstraintRequest`] before anything is
//! created.

pub use crate::engine::ConstraintKind;

use crate::engine::PhysicsEngine;
use crate::error::{Result, SyncError};
use crate::ident::{BodyId, ConstraintId};
use crate::math::Vector3;
use crate::registry::WorldRegistry;
use serde::Deserialize;

/// Fully checked constraint creation request
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRequest {
    /// First participant
    pub body_a: BodyId,
    /// Second participant
    pub body_b: BodyId,
    /// Kind and parameters
    pub kind: ConstraintKind,
}

/// Host-shaped constraint parameters
///
/// Deserializes from `{"bodyA": .., "bodyB": .., "pivotA": {..}, ..}`.
/// Missing pivots default to the body origin and missing axes to +X.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConstraintArgs {
    /// First participant
    pub body_a: Option<BodyId>,
    /// Second participant
    pub body_b: Option<BodyId>,
    /// Pivot in A's frame
    pub pivot_a: Option<Vector3>,
    /// Pivot in B's frame
    pub pivot_b: Option<Vector3>,
    /// Axis in A's frame (hinge, cone-twist)
    pub axis_a: Option<Vector3>,
    /// Axis in B's frame (hinge, cone-twist)
    pub axis_b: Option<Vector3>,
}

impl ConstraintArgs {
    /// Default constraint axis
    pub const DEFAULT_AXIS: Vector3 = Vector3::new(1.0, 0.0, 0.0);

    /// Check the arguments against a type name
    ///
    /// Accepts `point`, `hinge`, `conetwist` and `lock`.
    ///
    /// ```
    /// use physics_sync::constraint::ConstraintArgs;
    ///
    /// let args: ConstraintArgs = serde_json::from_str(
    ///     r#"{"bodyA": "a", "bodyB": "b", "pivotA": {"x": 0, "y": 2, "z": 0}}"#,
    /// ).unwrap();
    /// let request = args.to_request("lock").unwrap();
    /// assert_eq!(request.kind.name(), "lock");
    /// assert!(args.to_request("weld").is_err());
    /// ```
    pub fn to_request(&self, type_name: &str) -> Result<ConstraintRequest> {
        let pivot_a = self.pivot_a.unwrap_or_else(Vector3::zero);
        let pivot_b = self.pivot_b.unwrap_or_else(Vector3::zero);
        let axis_a = self.axis_a.unwrap_or(Self::DEFAULT_AXIS);
        let axis_b = self.axis_b.unwrap_or(Self::DEFAULT_AXIS);

        let kind = match type_name {
            "point" => ConstraintKind::PointToPoint { pivot_a, pivot_b },
            "hinge" => ConstraintKind::Hinge {
                pivot_a,
                axis_a,
                pivot_b,
                axis_b,
            },
            "conetwist" => ConstraintKind::ConeTwist {
                pivot_a,
                axis_a,
                pivot_b,
                axis_b,
            },
            "lock" => ConstraintKind::Lock { pivot_a, pivot_b },
            other => return Err(SyncError::UnknownConstraintType(other.to_string())),
        };

        Ok(ConstraintRequest {
            body_a: self.body_a.clone().ok_or(SyncError::MissingParameter("bodyA"))?,
            body_b: self.body_b.clone().ok_or(SyncError::MissingParameter("bodyB"))?,
            kind,
        })
    }
}

/// Creates, pauses, resumes and removes constraints
///
/// Borrows the registry and engine for the duration of one operation.
/// Every operation either completes or leaves both untouched.
pub struct ConstraintManager<'a, E: PhysicsEngine + ?Sized> {
    registry: &'a mut WorldRegistry,
    engine: &'a mut E,
}

impl<'a, E: PhysicsEngine + ?Sized> ConstraintManager<'a, E> {
    /// Borrow a registry and its engine
    pub fn new(registry: &'a mut WorldRegistry, engine: &'a mut E) -> Self {
        ConstraintManager { registry, engine }
    }

    /// Create and attach a constraint between two registered bodies
    pub fn create(&mut self, request: &ConstraintRequest) -> Result<ConstraintId> {
        let handle_a = self
            .registry
            .find_body(&request.body_a)
            .ok_or_else(|| SyncError::BodyNotFound(request.body_a.clone()))?
            .handle();
        let handle_b = self
            .registry
            .find_body(&request.body_b)
            .ok_or_else(|| SyncError::BodyNotFound(request.body_b.clone()))?
            .handle();

        let handle = self
            .engine
            .create_constraint(handle_a, handle_b, &request.kind)?;
        if !self.engine.add_constraint(handle) {
            self.engine.destroy_constraint(handle);
            return Err(SyncError::Engine(format!("engine refused to attach {}", handle)));
        }

        match self
            .registry
            .add_constraint(handle, &request.body_a, &request.body_b, request.kind)
        {
            Ok(id) => Ok(id),
            Err(err) => {
                self.engine.destroy_constraint(handle);
                Err(err)
            }
        }
    }

    /// Detach without forgetting; pausing a paused constraint is a no-op
    pub fn pause(&mut self, id: &ConstraintId) -> Result<()> {
        self.registry.remove_constraint(&mut *self.engine, id, false)
    }

    /// Re-attach a paused constraint
    ///
    /// Returns false, changing nothing, when it is already active.
    pub fn resume(&mut self, id: &ConstraintId) -> Result<bool> {
        let constraint = self
            .registry
            .find_constraint(id)
            .ok_or_else(|| SyncError::ConstraintNotFound(id.clone()))?;
        if constraint.is_active() {
            return Ok(false);
        }

        let handle = constraint.handle();
        if !self.engine.add_constraint(handle) {
            return Err(SyncError::Engine(format!(
                "engine no longer knows {}",
                handle
            )));
        }
        self.registry.set_constraint_active(id, true)?;
        Ok(true)
    }

    /// Detach, and with `full_wipe` forget and free
    pub fn remove(&mut self, id: &ConstraintId, full_wipe: bool) -> Result<()> {
        self.registry.remove_constraint(&mut *self.engine, id, full_wipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncPolicy;
    use crate::engine::{
        BodyDesc, BodyHandle, BodyState, ConstraintHandle, ReferenceEngine, Shape,
    };
    use crate::math::{Mass, Quaternion};

    /// Engine that builds constraints but never attaches them
    struct RefusesAttach(ReferenceEngine);

    impl PhysicsEngine for RefusesAttach {
        fn set_gravity(&mut self, gravity: Vector3) {
            self.0.set_gravity(gravity)
        }
        fn gravity(&self) -> Vector3 {
            self.0.gravity()
        }
        fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
            self.0.add_body(desc)
        }
        fn remove_body(&mut self, handle: BodyHandle) -> bool {
            self.0.remove_body(handle)
        }
        fn body(&self, handle: BodyHandle) -> Option<&BodyState> {
            self.0.body(handle)
        }
        fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut BodyState> {
            self.0.body_mut(handle)
        }
        fn create_constraint(
            &mut self,
            body_a: BodyHandle,
            body_b: BodyHandle,
            kind: &ConstraintKind,
        ) -> Result<ConstraintHandle> {
            self.0.create_constraint(body_a, body_b, kind)
        }
        fn add_constraint(&mut self, _handle: ConstraintHandle) -> bool {
            false
        }
        fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
            self.0.remove_constraint(handle)
        }
        fn destroy_constraint(&mut self, handle: ConstraintHandle) {
            self.0.destroy_constraint(handle)
        }
        fn is_constraint_attached(&self, handle: ConstraintHandle) -> bool {
            self.0.is_constraint_attached(handle)
        }
        fn step(&mut self, fixed_dt: f64, real_dt: f64, max_sub_steps: u32) -> u32 {
            self.0.step(fixed_dt, real_dt, max_sub_steps)
        }
    }

    fn setup() -> (ReferenceEngine, WorldRegistry, BodyId, BodyId) {
        let mut engine = ReferenceEngine::new();
        let mut registry = WorldRegistry::new();
        let mut add = |y: f64| {
            let handle = engine.add_body(BodyDesc {
                shape: Shape::Sphere { radius: 0.5 },
                mass: Mass::new(1.0),
                position: Vector3::new(0.0, y, 0.0),
                quaternion: Quaternion::identity(),
                angular_damping: 0.8,
            });
            registry.add_body(handle, None, SyncPolicy::default(), false)
        };
        let a = add(0.0);
        let b = add(3.0);
        (engine, registry, a, b)
    }

    fn lock_between(a: &BodyId, b: &BodyId) -> ConstraintRequest {
        ConstraintRequest {
            body_a: a.clone(),
            body_b: b.clone(),
            kind: ConstraintKind::Lock {
                pivot_a: Vector3::new(0.0, 2.0, 0.0),
                pivot_b: Vector3::zero(),
            },
        }
    }

    #[test]
    fn test_create_attaches_and_tracks() {
        let (mut engine, mut registry, a, b) = setup();
        let id = ConstraintManager::new(&mut registry, &mut engine)
            .create(&lock_between(&a, &b))
            .unwrap();

        let tracked = registry.find_constraint(&id).unwrap();
        assert!(tracked.is_active());
        assert!(engine.is_constraint_attached(tracked.handle()));
    }

    #[test]
    fn test_create_with_unknown_body_changes_nothing() {
        let (mut engine, mut registry, a, _) = setup();
        let ghost = BodyId::from("ghost");
        let err = ConstraintManager::new(&mut registry, &mut engine)
            .create(&lock_between(&ghost, &a))
            .unwrap_err();

        assert_eq!(err, SyncError::BodyNotFound(ghost));
        assert_eq!(registry.constraint_count(), 0);
        assert_eq!(engine.attached_constraint_count(), 0);
    }

    #[test]
    fn test_refused_attach_registers_nothing() {
        let (inner, mut registry, a, b) = setup();
        let mut engine = RefusesAttach(inner);
        let err = ConstraintManager::new(&mut registry, &mut engine)
            .create(&lock_between(&a, &b))
            .unwrap_err();

        assert!(matches!(err, SyncError::Engine(_)));
        assert_eq!(registry.constraint_count(), 0);
        assert_eq!(engine.0.attached_constraint_count(), 0);
    }

    #[test]
    fn test_pause_resume_keeps_flag_and_attachment_in_step() {
        let (mut engine, mut registry, a, b) = setup();
        let mut manager = ConstraintManager::new(&mut registry, &mut engine);
        let id = manager.create(&lock_between(&a, &b)).unwrap();

        manager.pause(&id).unwrap();
        manager.pause(&id).unwrap();
        assert_eq!(manager.resume(&id), Ok(true));
        assert_eq!(manager.resume(&id), Ok(false));

        let tracked = registry.find_constraint(&id).unwrap();
        assert!(tracked.is_active());
        assert!(engine.is_constraint_attached(tracked.handle()));
    }

    #[test]
    fn test_paused_constraint_is_detached() {
        let (mut engine, mut registry, a, b) = setup();
        let mut manager = ConstraintManager::new(&mut registry, &mut engine);
        let id = manager.create(&lock_between(&a, &b)).unwrap();
        manager.pause(&id).unwrap();

        let tracked = registry.find_constraint(&id).unwrap();
        assert!(!tracked.is_active());
        assert!(!engine.is_constraint_attached(tracked.handle()));
    }

    #[test]
    fn test_remove_soft_then_full() {
        let (mut engine, mut registry, a, b) = setup();
        let mut manager = ConstraintManager::new(&mut registry, &mut engine);
        let id = manager.create(&lock_between(&a, &b)).unwrap();

        manager.remove(&id, false).unwrap();
        assert_eq!(manager.resume(&id), Ok(true));
        manager.remove(&id, true).unwrap();
        assert!(matches!(
            manager.resume(&id),
            Err(SyncError::ConstraintNotFound(_))
        ));
        assert_eq!(registry.constraint_count(), 0);
    }

    #[test]
    fn test_args_require_both_bodies() {
        let args = ConstraintArgs {
            body_b: Some(BodyId::from("b")),
            ..Default::default()
        };
        assert_eq!(
            args.to_request("point"),
            Err(SyncError::MissingParameter("bodyA"))
        );
    }

    #[test]
    fn test_args_defaults_per_kind() {
        let args = ConstraintArgs {
            body_a: Some(BodyId::from("a")),
            body_b: Some(BodyId::from("b")),
            pivot_a: Some(Vector3::new(1.0, 0.0, 0.0)),
            ..Default::default()
        };

        match args.to_request("hinge").unwrap().kind {
            ConstraintKind::Hinge {
                pivot_a,
                axis_a,
                pivot_b,
                axis_b,
            } => {
                assert_eq!(pivot_a, Vector3::new(1.0, 0.0, 0.0));
                assert_eq!(pivot_b, Vector3::zero());
                assert_eq!(axis_a, ConstraintArgs::DEFAULT_AXIS);
                assert_eq!(axis_b, ConstraintArgs::DEFAULT_AXIS);
            }
            other => panic!("expected hinge, got {:?}", other),
        }
        assert_eq!(args.to_request("conetwist").unwrap().kind.name(), "conetwist");
        assert_eq!(args.to_request("point").unwrap().kind.name(), "point");
    }

    #[test]
    fn test_unknown_type_checked_before_bodies() {
        assert_eq!(
            ConstraintArgs::default().to_request("spring"),
            Err(SyncError::UnknownConstraintType("spring".to_string()))
        );
    }
}
