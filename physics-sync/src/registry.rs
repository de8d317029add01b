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
//! Tracked bodies and constraints
//!
//! The registry owns the bookkeeping that ties engine handles to durable
//! identities and external nodes. Lookups are linear scans in insertion
//! order; worlds hold tens of bodies, not thousands.

use crate::config::SyncPolicy;
use crate::engine::{BodyHandle, ConstraintHandle, ConstraintKind, PhysicsEngine};
use crate::error::{Result, SyncError};
use crate::ident::{BodyId, ConstraintId, IdentityAllocator};
use crate::scene::NodeRef;
use std::fmt;

/// A body known to the world
#[derive(Clone)]
pub struct TrackedBody {
    id: BodyId,
    handle: BodyHandle,
    node: Option<NodeRef>,
    sync: SyncPolicy,
    is_ground: bool,
}

impl TrackedBody {
    /// Durable identity
    pub fn id(&self) -> &BodyId {
        &self.id
    }

    /// Engine handle
    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    /// Bound external node, if any
    pub fn node(&self) -> Option<&NodeRef> {
        self.node.as_ref()
    }

    /// Sync policy
    pub fn sync(&self) -> &SyncPolicy {
        &self.sync
    }

    /// Whether the body is a ground plane
    pub fn is_ground(&self) -> bool {
        self.is_ground
    }
}

impl fmt::Debug for TrackedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedBody")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("has_node", &self.node.is_some())
            .field("sync", &self.sync)
            .field("is_ground", &self.is_ground)
            .finish()
    }
}

/// A constraint known to the world
///
/// `is_active` is true exactly when the engine handle is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedConstraint {
    id: ConstraintId,
    handle: ConstraintHandle,
    body_a: BodyId,
    body_b: BodyId,
    kind: ConstraintKind,
    is_active: bool,
}

impl TrackedConstraint {
    /// Derived identity
    pub fn id(&self) -> &ConstraintId {
        &self.id
    }

    /// Engine handle
    pub fn handle(&self) -> ConstraintHandle {
        self.handle
    }

    /// First participant
    pub fn body_a(&self) -> &BodyId {
        &self.body_a
    }

    /// Second participant
    pub fn body_b(&self) -> &BodyId {
        &self.body_b
    }

    /// Constraint kind and parameters
    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Whether the constraint is attached to the engine
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Owns every tracked body and constraint of one world
#[derive(Debug, Default)]
pub struct WorldRegistry {
    allocator: IdentityAllocator,
    bodies: Vec<TrackedBody>,
    constraints: Vec<TrackedConstraint>,
}

impl WorldRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a body and return its new identity
    pub fn add_body(
        &mut self,
        handle: BodyHandle,
        node: Option<NodeRef>,
        sync: SyncPolicy,
        is_ground: bool,
    ) -> BodyId {
        let id = self.allocator.new_body_id();
        self.bodies.push(TrackedBody {
            id: id.clone(),
            handle,
            node,
            sync,
            is_ground,
        });
        id
    }

    /// Look up a body
    pub fn find_body(&self, id: &BodyId) -> Option<&TrackedBody> {
        self.bodies.iter().find(|b| &b.id == id)
    }

    /// Every tracked body in creation order
    pub fn bodies(&self) -> &[TrackedBody] {
        &self.bodies
    }

    /// Number of tracked bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Look up a constraint
    pub fn find_constraint(&self, id: &ConstraintId) -> Option<&TrackedConstraint> {
        self.constraints.iter().find(|c| &c.id == id)
    }

    /// Every tracked constraint in creation order
    pub fn constraints(&self) -> &[TrackedConstraint] {
        &self.constraints
    }

    /// Number of tracked constraints, active or not
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Track an already attached constraint between two registered bodies
    ///
    /// The identity is derived from the ordered pair. When that identity is
    /// already taken, a sequence number starting at 2 is folded in, so every
    /// tracked constraint keeps a distinct identity.
    pub fn add_constraint(
        &mut self,
        handle: ConstraintHandle,
        body_a: &BodyId,
        body_b: &BodyId,
        kind: ConstraintKind,
    ) -> Result<ConstraintId> {
        for id in [body_a, body_b] {
            if self.find_body(id).is_none() {
                return Err(SyncError::BodyNotFound(id.clone()));
            }
        }

        let id = self.free_constraint_id(body_a, body_b);
        self.constraints.push(TrackedConstraint {
            id: id.clone(),
            handle,
            body_a: body_a.clone(),
            body_b: body_b.clone(),
            kind,
            is_active: true,
        });
        Ok(id)
    }

    fn free_constraint_id(&self, body_a: &BodyId, body_b: &BodyId) -> ConstraintId {
        let plain = IdentityAllocator::constraint_id(body_a, body_b);
        if self.find_constraint(&plain).is_none() {
            return plain;
        }

        let mut sequence = 2;
        loop {
            let candidate = IdentityAllocator::sequenced_constraint_id(body_a, body_b, sequence);
            if self.find_constraint(&candidate).is_none() {
                tracing::debug!(
                    %body_a,
                    %body_b,
                    sequence,
                    "ordered pair already constrained, using sequenced identity"
                );
                return candidate;
            }
            sequence += 1;
        }
    }

    /// Detach a constraint, and forget it when `full_wipe` is set
    ///
    /// The engine handle is always detached and the entry marked inactive.
    /// With `full_wipe` the entry is dropped and the engine frees the handle.
    ///
    /// If the engine refuses the detach, a soft removal fails with
    /// [`SyncError::Engine`] and leaves the entry as it was; a full wipe
    /// still drops the stale entry.
    pub fn remove_constraint<E: PhysicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        id: &ConstraintId,
        full_wipe: bool,
    ) -> Result<()> {
        let index = self
            .constraints
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| SyncError::ConstraintNotFound(id.clone()))?;

        let handle = self.constraints[index].handle;
        if !engine.remove_constraint(handle) {
            if full_wipe {
                self.constraints.remove(index);
                tracing::warn!(%id, %handle, "engine no longer knows constraint, dropped stale entry");
                return Ok(());
            }
            return Err(SyncError::Engine(format!("engine no longer knows {}", handle)));
        }
        self.constraints[index].is_active = false;

        if full_wipe {
            self.constraints.remove(index);
            engine.destroy_constraint(handle);
        }
        Ok(())
    }

    /// Flip the stored active flag without touching the engine
    pub fn set_constraint_active(&mut self, id: &ConstraintId, active: bool) -> Result<()> {
        let constraint = self
            .constraints
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| SyncError::ConstraintNotFound(id.clone()))?;
        constraint.is_active = active;
        Ok(())
    }
}
