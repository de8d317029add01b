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
//! Deterministic reference engine
//!
//! Each fixed step runs four phases:
//!
//! 1. Force accumulation and semi-implicit Euler integration
//!    (v' = v + a·dt, p' = p + v'·dt), skipping immovable bodies
//! 2. Constraint projection over attached constraints, weighted by inverse mass
//! 3. Contact against planes: bodies are pushed out and inbound velocity removed
//! 4. Force and torque accumulators cleared
//!
//! Phase 1 runs on rayon when the `parallel` feature is enabled.
//!
//! Wall-clock time is consumed with nearest-step rounding: a step runs once
//! at least half a fixed step has accumulated. The accumulator therefore
//! stays within half a step of zero and a single display-rate tick always
//! advances the world.

use super::{
    BodyDesc, BodyHandle, BodyState, ConstraintHandle, ConstraintKind, PhysicsEngine, Shape,
};
use crate::error::{Result, SyncError};
use crate::math::{Axis, Quaternion, Vector3};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
struct RigidBody {
    handle: BodyHandle,
    shape: Shape,
    inv_mass: f64,
    inv_inertia: f64,
    angular_damping: f64,
    state: BodyState,
}

impl RigidBody {
    fn from_desc(handle: BodyHandle, desc: &BodyDesc) -> Self {
        let inv_mass = desc.mass.inverse();
        let inertia = match desc.shape {
            Shape::Sphere { radius } => 0.4 * desc.mass.value() * radius * radius,
            Shape::Box { half_extents } => {
                // mean of the three principal moments
                let h = half_extents;
                (2.0 / 9.0) * desc.mass.value() * (h.x() * h.x() + h.y() * h.y() + h.z() * h.z())
            }
            Shape::Plane => 0.0,
        };
        let inv_inertia = if inv_mass > 0.0 && inertia > 0.0 {
            1.0 / inertia
        } else {
            0.0
        };

        RigidBody {
            handle,
            shape: desc.shape,
            inv_mass,
            inv_inertia,
            angular_damping: desc.angular_damping.clamp(0.0, 1.0),
            state: BodyState::at_rest(desc.position, desc.quaternion.normalized()),
        }
    }

    fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    /// Returns false if the step produced a non-finite state
    fn integrate(&mut self, gravity: Vector3, dt: f64, max_force: f64) -> bool {
        if !self.is_dynamic() {
            return true;
        }

        let mut force = gravity * (1.0 / self.inv_mass) + self.state.force;
        let magnitude = force.length();
        if magnitude > max_force {
            force = force * (max_force / magnitude);
        }

        let s = &mut self.state;
        s.velocity += force * (self.inv_mass * dt);
        s.angular_velocity += s.torque * (self.inv_inertia * dt);
        s.angular_velocity = s.angular_velocity * (1.0 - self.angular_damping).powf(dt);
        s.position += s.velocity * dt;
        s.quaternion = s.quaternion.integrate(s.angular_velocity, dt);

        s.position.is_valid() && s.velocity.is_valid() && s.quaternion.is_valid()
    }

    /// Distance from the body centre to its surface along `normal`
    fn support(&self, normal: Vector3) -> Option<f64> {
        match self.shape {
            Shape::Sphere { radius } => Some(radius),
            Shape::Box { half_extents } => Some(
                Axis::ALL
                    .iter()
                    .map(|&axis| {
                        let local = Vector3::zero().with(axis, half_extents.get(axis));
                        self.state.quaternion.rotate(local).dot(normal).abs()
                    })
                    .sum(),
            ),
            Shape::Plane => None,
        }
    }

    fn resolve_plane(&mut self, origin: Vector3, normal: Vector3) {
        if !self.is_dynamic() {
            return;
        }
        let extent = match self.support(normal) {
            Some(extent) => extent,
            None => return,
        };

        let distance = (self.state.position - origin).dot(normal);
        if distance >= extent {
            return;
        }

        self.state.position += normal * (extent - distance);
        let inbound = self.state.velocity.dot(normal);
        if inbound < 0.0 {
            self.state.velocity = self.state.velocity - normal * inbound;
        }
    }
}

#[derive(Debug, Clone)]
struct Joint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    kind: ConstraintKind,
    attached: bool,
    /// Orientation of B relative to A at creation
    relative_rotation: Quaternion,
}

/// Small rigid-body engine implementing [`PhysicsEngine`]
///
/// Boxes, spheres and planes; point, hinge, cone-twist and lock
/// constraints solved by projection. Not a replacement for a production
/// solver, but fully deterministic, which the tests and demos rely on.
///
/// # Example
///
/// ```
/// use physics_sync::engine::{BodyDesc, PhysicsEngine, ReferenceEngine, Shape};
/// use physics_sync::math::{Mass, Quaternion, Vector3};
///
/// let mut engine = ReferenceEngine::new();
/// engine.set_gravity(Vector3::new(0.0, -9.82, 0.0));
/// let ball = engine.add_body(BodyDesc {
///     shape: Shape::Sphere { radius: 0.5 },
///     mass: Mass::new(1.0),
///     position: Vector3::new(0.0, 2.0, 0.0),
///     quaternion: Quaternion::identity(),
///     angular_damping: 0.8,
/// });
///
/// let steps = engine.step(1.0 / 60.0, 0.016, 3);
/// assert_eq!(steps, 1);
/// assert!(engine.body(ball).unwrap().position.y() < 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct ReferenceEngine {
    gravity: Vector3,
    bodies: Vec<RigidBody>,
    index: HashMap<BodyHandle, usize>,
    joints: BTreeMap<ConstraintHandle, Joint>,
    next_body: u64,
    next_joint: u64,
    accumulator: f64,
    elapsed: f64,
    solver_iterations: usize,
    max_force_magnitude: f64,
}

impl ReferenceEngine {
    /// Default projection passes per step
    pub const DEFAULT_SOLVER_ITERATIONS: usize = 4;

    /// Create an empty world with zero gravity
    pub fn new() -> Self {
        ReferenceEngine {
            gravity: Vector3::zero(),
            bodies: Vec::new(),
            index: HashMap::new(),
            joints: BTreeMap::new(),
            next_body: 0,
            next_joint: 0,
            accumulator: 0.0,
            elapsed: 0.0,
            solver_iterations: Self::DEFAULT_SOLVER_ITERATIONS,
            max_force_magnitude: 1e10,
        }
    }

    /// Set the number of constraint projection passes per step
    pub fn with_solver_iterations(mut self, iterations: usize) -> Self {
        self.solver_iterations = iterations.max(1);
        self
    }

    /// Simulated seconds advanced so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of constraints currently attached
    pub fn attached_constraint_count(&self) -> usize {
        self.joints.values().filter(|j| j.attached).count()
    }

    fn internal_step(&mut self, dt: f64) {
        let gravity = self.gravity;
        let max_force = self.max_force_magnitude;

        #[cfg(feature = "parallel")]
        let invalid = self
            .bodies
            .par_iter_mut()
            .map(|body| body.integrate(gravity, dt, max_force))
            .filter(|ok| !ok)
            .count();

        #[cfg(not(feature = "parallel"))]
        let invalid = self
            .bodies
            .iter_mut()
            .map(|body| body.integrate(gravity, dt, max_force))
            .filter(|ok| !ok)
            .count();

        if invalid > 0 {
            tracing::warn!(bodies = invalid, "integration produced non-finite state");
        }

        for _ in 0..self.solver_iterations {
            for joint in self.joints.values().filter(|j| j.attached) {
                let (Some(&ia), Some(&ib)) =
                    (self.index.get(&joint.body_a), self.index.get(&joint.body_b))
                else {
                    continue;
                };
                if let Some((a, b)) = pair_mut(&mut self.bodies, ia, ib) {
                    solve_joint(a, b, joint);
                }
            }
        }

        let planes: Vec<(Vector3, Vector3)> = self
            .bodies
            .iter()
            .filter(|b| matches!(b.shape, Shape::Plane))
            .map(|b| {
                let normal = b.state.quaternion.rotate(Vector3::new(0.0, 0.0, 1.0));
                (b.state.position, normal)
            })
            .collect();

        for body in &mut self.bodies {
            for &(origin, normal) in &planes {
                body.resolve_plane(origin, normal);
            }
            body.state.force = Vector3::zero();
            body.state.torque = Vector3::zero();
        }

        self.elapsed += dt;
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Two distinct mutable bodies out of one slice
fn pair_mut(
    bodies: &mut [RigidBody],
    i: usize,
    j: usize,
) -> Option<(&mut RigidBody, &mut RigidBody)> {
    if i == j || i >= bodies.len() || j >= bodies.len() {
        return None;
    }
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        Some((&mut left[i], &mut right[0]))
    } else {
        let (left, right) = bodies.split_at_mut(i);
        Some((&mut right[0], &mut left[j]))
    }
}

fn solve_joint(a: &mut RigidBody, b: &mut RigidBody, joint: &Joint) {
    let total = a.inv_mass + b.inv_mass;
    if total <= 0.0 {
        return;
    }
    let wa = a.inv_mass / total;
    let wb = b.inv_mass / total;

    if let ConstraintKind::Lock { .. } = joint.kind {
        if b.is_dynamic() {
            b.state.quaternion = (a.state.quaternion * joint.relative_rotation).normalized();
        } else {
            a.state.quaternion =
                (b.state.quaternion * joint.relative_rotation.conjugate()).normalized();
        }
    }

    let (pivot_a, pivot_b) = joint.kind.pivots();
    let world_a = a.state.position + a.state.quaternion.rotate(pivot_a);
    let world_b = b.state.position + b.state.quaternion.rotate(pivot_b);
    let error = world_b - world_a;
    a.state.position += error * wa;
    b.state.position = b.state.position - error * wb;

    match joint.kind {
        ConstraintKind::Lock { .. } => {
            // mass-weighted common velocity
            let velocity = a.state.velocity * wb + b.state.velocity * wa;
            let spin = a.state.angular_velocity * wb + b.state.angular_velocity * wa;
            for body in [a, b] {
                if body.is_dynamic() {
                    body.state.velocity = velocity;
                    body.state.angular_velocity = spin;
                }
            }
        }
        ConstraintKind::Hinge { axis_a, .. } => {
            remove_separating_velocity(a, b, error, wa, wb);
            let axis = a.state.quaternion.rotate(axis_a).normalized();
            let relative = b.state.angular_velocity - a.state.angular_velocity;
            let off_axis = relative - axis * relative.dot(axis);
            a.state.angular_velocity += off_axis * wa;
            b.state.angular_velocity = b.state.angular_velocity - off_axis * wb;
        }
        ConstraintKind::PointToPoint { .. } | ConstraintKind::ConeTwist { .. } => {
            remove_separating_velocity(a, b, error, wa, wb);
        }
    }
}

fn remove_separating_velocity(a: &mut RigidBody, b: &mut RigidBody, error: Vector3, wa: f64, wb: f64) {
    if error.length() < 1e-12 {
        return;
    }
    let n = error.normalized();
    let separating = (b.state.velocity - a.state.velocity).dot(n);
    a.state.velocity += n * (separating * wa);
    b.state.velocity = b.state.velocity - n * (separating * wb);
}

impl PhysicsEngine for ReferenceEngine {
    fn set_gravity(&mut self, gravity: Vector3) {
        self.gravity = gravity;
    }

    fn gravity(&self) -> Vector3 {
        self.gravity
    }

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle::new(self.next_body);
        self.next_body += 1;
        self.index.insert(handle, self.bodies.len());
        self.bodies.push(RigidBody::from_desc(handle, &desc));
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(slot) = self.index.remove(&handle) else {
            return false;
        };
        self.bodies.swap_remove(slot);
        if let Some(moved) = self.bodies.get(slot) {
            self.index.insert(moved.handle, slot);
        }

        let before = self.joints.len();
        self.joints
            .retain(|_, joint| joint.body_a != handle && joint.body_b != handle);
        let dropped = before - self.joints.len();
        if dropped > 0 {
            tracing::debug!(%handle, dropped, "dropped constraints of removed body");
        }
        true
    }

    fn body(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.index.get(&handle).map(|&i| &self.bodies[i].state)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut BodyState> {
        let i = *self.index.get(&handle)?;
        Some(&mut self.bodies[i].state)
    }

    fn create_constraint(
        &mut self,
        body_a: BodyHandle,
        body_b: BodyHandle,
        kind: &ConstraintKind,
    ) -> Result<ConstraintHandle> {
        if body_a == body_b {
            return Err(SyncError::Engine(format!(
                "constraint needs two distinct bodies, got {} twice",
                body_a
            )));
        }
        let qa = self
            .body(body_a)
            .ok_or_else(|| SyncError::Engine(format!("unknown body {}", body_a)))?
            .quaternion;
        let qb = self
            .body(body_b)
            .ok_or_else(|| SyncError::Engine(format!("unknown body {}", body_b)))?
            .quaternion;

        let handle = ConstraintHandle::new(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(
            handle,
            Joint {
                body_a,
                body_b,
                kind: *kind,
                attached: false,
                relative_rotation: qa.conjugate() * qb,
            },
        );
        Ok(handle)
    }

    fn add_constraint(&mut self, handle: ConstraintHandle) -> bool {
        match self.joints.get_mut(&handle) {
            Some(joint) => {
                joint.attached = true;
                true
            }
            None => false,
        }
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) -> bool {
        match self.joints.get_mut(&handle) {
            Some(joint) => {
                joint.attached = false;
                true
            }
            None => false,
        }
    }

    fn destroy_constraint(&mut self, handle: ConstraintHandle) {
        self.joints.remove(&handle);
    }

    fn is_constraint_attached(&self, handle: ConstraintHandle) -> bool {
        self.joints.get(&handle).map_or(false, |j| j.attached)
    }

    fn step(&mut self, fixed_dt: f64, real_dt: f64, max_sub_steps: u32) -> u32 {
        if fixed_dt <= 0.0 || !fixed_dt.is_finite() {
            tracing::warn!(fixed_dt, "ignoring step with invalid fixed time step");
            return 0;
        }
        // a clock running backwards or standing still adds nothing
        if real_dt <= 0.0 || !real_dt.is_finite() {
            return 0;
        }

        self.accumulator += real_dt;
        let mut steps = 0;
        while self.accumulator >= fixed_dt * 0.5 && steps < max_sub_steps {
            self.internal_step(fixed_dt);
            self.accumulator -= fixed_dt;
            steps += 1;
        }

        if self.accumulator >= fixed_dt * 0.5 {
            // backlog beyond the sub-step cap is dropped
            tracing::debug!(
                backlog = self.accumulator,
                max_sub_steps,
                "dropping simulation backlog"
            );
            self.accumulator %= fixed_dt;
        }

        steps
    }

    fn reset_pending_time(&mut self) {
        self.accumulator = 0.0;
    }
}
