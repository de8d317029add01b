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
//! Transform synchronization
//!
//! Copies simulation state onto external nodes and back. Every read and
//! write goes through [`SyncPolicy::for_each_target`], so a field the policy
//! disables is never touched in either direction.
//!
//! | property   | axis | node field  | source                      |
//! |------------|------|-------------|-----------------------------|
//! | `position` | `x`  | `x`         | body position x             |
//! | `rotation` | `x`  | `rotationX` | engine Euler conversion, x  |
//!
//! and likewise for `y` and `z`.
//!
//! A node that the host is currently borrowing is skipped for that pass with
//! a warning rather than panicking inside the tick.

use crate::config::{SyncPolicy, SyncProperty};
use crate::engine::PhysicsEngine;
use crate::ident::BodyId;
use crate::math::{Axis, Quaternion, Vector3};
use crate::registry::TrackedBody;
use crate::scene::{NodeRef, TransformField};

/// Captured state of one body
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    body: BodyId,
    position: Vector3,
    quaternion: Quaternion,
    external: Vec<(TransformField, f64)>,
}

impl SnapshotEntry {
    /// Body the entry belongs to
    pub fn body(&self) -> &BodyId {
        &self.body
    }

    /// Simulation position at capture time
    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// Simulation orientation at capture time
    pub fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    /// Policy-enabled node fields and their values at capture time
    pub fn external(&self) -> &[(TransformField, f64)] {
        &self.external
    }
}

/// Baseline of every body, captured when the clock starts
///
/// Values are copied, so later simulation steps never alter the baseline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl WorldSnapshot {
    /// Entries in body creation order
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// Entry for one body
    pub fn get(&self, id: &BodyId) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| &e.body == id)
    }

    /// Number of captured bodies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write one body's simulation transform to its node
///
/// Returns the number of fields written. Bodies without a node write
/// nothing.
pub fn apply<E: PhysicsEngine + ?Sized>(engine: &E, body: &TrackedBody) -> usize {
    let Some(node) = body.node() else {
        return 0;
    };
    let Some(state) = engine.body(body.handle()) else {
        tracing::warn!(body = %body.id(), "engine has no state for tracked body");
        return 0;
    };
    let euler = engine.quaternion_to_euler(state.quaternion);
    let position = state.position;

    write_node(node, body, body.sync(), |property, axis| match property {
        SyncProperty::Position => position.get(axis),
        SyncProperty::Rotation => euler.get(axis),
    })
}

/// [`apply`] over every body; returns the total number of fields written
pub fn apply_all<E: PhysicsEngine + ?Sized>(engine: &E, bodies: &[TrackedBody]) -> usize {
    bodies.iter().map(|body| apply(engine, body)).sum()
}

/// Capture the baseline of every body
///
/// Node fields are read under each body's own policy; simulation position
/// and orientation are copied by value.
pub fn snapshot<E: PhysicsEngine + ?Sized>(engine: &E, bodies: &[TrackedBody]) -> WorldSnapshot {
    let entries = bodies
        .iter()
        .filter_map(|body| {
            let state = engine.body(body.handle())?;
            let mut external = Vec::new();
            if let Some(node) = body.node() {
                match node.try_borrow() {
                    Ok(node) => body.sync().for_each_target(|property, axis| {
                        let field = TransformField::for_target(property, axis);
                        external.push((field, node.transform().get(field)));
                    }),
                    Err(_) => {
                        tracing::warn!(body = %body.id(), "node busy, snapshot has no node fields")
                    }
                }
            }
            Some(SnapshotEntry {
                body: body.id().clone(),
                position: state.position,
                quaternion: state.quaternion,
                external,
            })
        })
        .collect();

    WorldSnapshot { entries }
}

/// Return one body to its baseline
///
/// Zeroes every velocity, force and torque, restores the captured pose and
/// writes the captured node fields back. Returns false if the engine no
/// longer knows the body.
pub fn restore<E: PhysicsEngine + ?Sized>(
    engine: &mut E,
    body: &TrackedBody,
    entry: &SnapshotEntry,
) -> bool {
    let Some(state) = engine.body_mut(body.handle()) else {
        return false;
    };
    state.reset_motion();
    state.position = entry.position;
    state.quaternion = entry.quaternion;

    if let Some(node) = body.node() {
        match node.try_borrow_mut() {
            Ok(mut node) => {
                let transform = node.transform_mut();
                for &(field, value) in &entry.external {
                    transform.set(field, value);
                }
            }
            Err(_) => tracing::warn!(body = %body.id(), "node busy, skipping restore"),
        }
    }
    true
}

/// [`restore`] every body that has a snapshot entry
///
/// Bodies created after the snapshot was taken are left as they are.
/// Returns the number of bodies restored.
pub fn restore_all<E: PhysicsEngine + ?Sized>(
    engine: &mut E,
    bodies: &[TrackedBody],
    snapshot: &WorldSnapshot,
) -> usize {
    let mut restored = 0;
    for body in bodies {
        if let Some(entry) = snapshot.get(body.id()) {
            if restore(engine, body, entry) {
                restored += 1;
            }
        }
    }
    restored
}

fn write_node(
    node: &NodeRef,
    body: &TrackedBody,
    policy: &SyncPolicy,
    value: impl Fn(SyncProperty, Axis) -> f64,
) -> usize {
    let mut node = match node.try_borrow_mut() {
        Ok(node) => node,
        Err(_) => {
            tracing::warn!(body = %body.id(), "node busy, skipping sync");
            return 0;
        }
    };
    let transform = node.transform_mut();
    let mut written = 0;
    policy.for_each_target(|property, axis| {
        transform.set(TransformField::for_target(property, axis), value(property, axis));
        written += 1;
    });
    written
}
