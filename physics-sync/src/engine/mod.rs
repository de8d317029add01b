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
//! Rigid-body engine contract
//!
//! The binding layer never integrates motion or solves constraints itself.
//! It drives an engine through the [`PhysicsEngine`] trait: bodies and
//! constraints go in as descriptions and come back as opaque handles, body
//! state is exposed as a mutable [`BodyState`] record, and time advances
//! through [`PhysicsEngine::step`].
//!
//! [`ReferenceEngine`] is a small deterministic implementation used by the
//! tests, benches and demos. Any production engine can be bound instead by
//! implementing the trait.

mod reference;

pub use reference::ReferenceEngine;

use crate::error::Result;
use crate::math::{Mass, Quaternion, Vector3};
use std::fmt;

/// Engine-owned body handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u64);

impl BodyHandle {
    /// Wrap a raw engine key
    pub fn new(raw: u64) -> Self {
        BodyHandle(raw)
    }

    /// Get the raw engine key
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Engine-owned constraint handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(u64);

impl ConstraintHandle {
    /// Wrap a raw engine key
    pub fn new(raw: u64) -> Self {
        ConstraintHandle(raw)
    }

    /// Get the raw engine key
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConstraintHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}

/// Collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Box with the given half-extents
    Box {
        /// Half-extents along the local axes
        half_extents: Vector3,
    },
    /// Sphere
    Sphere {
        /// Radius
        radius: f64,
    },
    /// Infinite plane through the body origin, local normal +Z
    Plane,
}

/// Everything the engine needs to create a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Collision shape
    pub shape: Shape,
    /// Mass; immovable bodies are static
    pub mass: Mass,
    /// Initial position
    pub position: Vector3,
    /// Initial orientation, unnormalized as supplied
    pub quaternion: Quaternion,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f64,
}

/// Mutable simulation state of one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// World position
    pub position: Vector3,
    /// World orientation
    pub quaternion: Quaternion,
    /// Linear velocity
    pub velocity: Vector3,
    /// Linear velocity the body was created with
    pub init_velocity: Vector3,
    /// Angular velocity
    pub angular_velocity: Vector3,
    /// Angular velocity the body was created with
    pub init_angular_velocity: Vector3,
    /// Force accumulated for the next step
    pub force: Vector3,
    /// Torque accumulated for the next step
    pub torque: Vector3,
}

impl BodyState {
    /// State at rest at the given pose
    pub fn at_rest(position: Vector3, quaternion: Quaternion) -> Self {
        BodyState {
            position,
            quaternion,
            velocity: Vector3::zero(),
            init_velocity: Vector3::zero(),
            angular_velocity: Vector3::zero(),
            init_angular_velocity: Vector3::zero(),
            force: Vector3::zero(),
            torque: Vector3::zero(),
        }
    }

    /// Zero every velocity, force and torque, keeping the pose
    pub fn reset_motion(&mut self) {
        *self = BodyState::at_rest(self.position, self.quaternion);
    }
}

/// Kind of constraint and the parameters it needs
///
/// Pivots are in the local frame of their body; axes likewise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Ball joint: the two pivots coincide
    PointToPoint {
        /// Pivot on body A
        pivot_a: Vector3,
        /// Pivot on body B
        pivot_b: Vector3,
    },
    /// Pivots coincide and relative rotation is limited to one axis
    Hinge {
        /// Pivot on body A
        pivot_a: Vector3,
        /// Hinge axis on body A
        axis_a: Vector3,
        /// Pivot on body B
        pivot_b: Vector3,
        /// Hinge axis on body B
        axis_b: Vector3,
    },
    /// Pivots coincide; twist about the axis is allowed
    ConeTwist {
        /// Pivot on body A
        pivot_a: Vector3,
        /// Cone axis on body A
        axis_a: Vector3,
        /// Pivot on body B
        pivot_b: Vector3,
        /// Cone axis on body B
        axis_b: Vector3,
    },
    /// Pivots coincide and relative orientation is frozen
    Lock {
        /// Pivot on body A
        pivot_a: Vector3,
        /// Pivot on body B
        pivot_b: Vector3,
    },
}

impl ConstraintKind {
    /// Short name matching the host-facing type strings
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::PointToPoint { .. } => "point",
            ConstraintKind::Hinge { .. } => "hinge",
            ConstraintKind::ConeTwist { .. } => "conetwist",
            ConstraintKind::Lock { .. } => "lock",
        }
    }

    /// Local pivots on A and B
    pub fn pivots(&self) -> (Vector3, Vector3) {
        match *self {
            ConstraintKind::PointToPoint { pivot_a, pivot_b }
            | ConstraintKind::Hinge { pivot_a, pivot_b, .. }
            | ConstraintKind::ConeTwist { pivot_a, pivot_b, .. }
            | ConstraintKind::Lock { pivot_a, pivot_b } => (pivot_a, pivot_b),
        }
    }
}

/// Operations the binding layer needs from a rigid-body engine
///
/// One engine value is one simulation world. Constraints have a two-stage
/// lifecycle: [`create_constraint`](PhysicsEngine::create_constraint) builds
/// a detached constraint, [`add_constraint`](PhysicsEngine::add_constraint)
/// and [`remove_constraint`](PhysicsEngine::remove_constraint) attach and
/// detach it any number of times, and
/// [`destroy_constraint`](PhysicsEngine::destroy_constraint) frees it.
pub trait PhysicsEngine {
    /// Set world gravity
    fn set_gravity(&mut self, gravity: Vector3);

    /// Current world gravity
    fn gravity(&self) -> Vector3;

    /// Create a body and add it to the world
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Remove a body from the world; false if the handle is unknown
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    /// Read a body's state
    fn body(&self, handle: BodyHandle) -> Option<&BodyState>;

    /// Mutate a body's state
    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut BodyState>;

    /// Build a detached constraint between two bodies
    fn create_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        kind: &ConstraintKind,
    ) -> Result<ConstraintHandle>;

    /// Attach a constraint to the world; false if the handle is unknown
    fn add_constraint(&mut self, handle: ConstraintHandle) -> bool;

    /// Detach a constraint from the world; false if the handle is unknown
    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool;

    /// Free a constraint, detaching it first if needed
    fn destroy_constraint(&mut self, handle: ConstraintHandle);

    /// Whether the constraint currently takes part in stepping
    fn is_constraint_attached(&self, handle: ConstraintHandle) -> bool;

    /// Advance the world
    ///
    /// `real_dt` seconds of wall-clock time are consumed in steps of
    /// `fixed_dt`, running at most `max_sub_steps` of them. Returns the number
    /// of steps taken.
    fn step(&mut self, fixed_dt: f64, real_dt: f64, max_sub_steps: u32) -> u32;

    /// Discard wall-clock time not yet consumed by a step
    ///
    /// Called when a run ends so the next run starts from an empty
    /// accumulator. Engines without one need not override it.
    fn reset_pending_time(&mut self) {}

    /// Convert an orientation to Euler angles
    ///
    /// The convention belongs to the engine and is treated as authoritative
    /// by the sync layer. The default is Y-Z-X.
    fn quaternion_to_euler(&self, q: Quaternion) -> Vector3 {
        q.to_euler()
    }
}
