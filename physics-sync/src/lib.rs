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
//! # Physics Sync
//!
//! A binding layer that keeps a rigid-body simulation synchronized with an
//! externally owned scene graph, behind a stable identity-based API.
//!
//! ## Features
//!
//! - **Identity-based API**: bodies get random UUIDs, constraints derived ids
//! - **Defaults merging**: partial configs filled from a nested template
//! - **Policy-driven sync**: per-property, per-axis masks onto scene nodes
//! - **Fixed-timestep clock**: host-timer driven, with snapshot and reset
//! - **Constraint lifecycle**: create, pause, resume and remove
//! - **Pluggable engine**: any engine implementing [`PhysicsEngine`]; a
//!   deterministic [`ReferenceEngine`] ships with the crate
//! - **Parallelization**: optional Rayon integration in the reference engine
//!
//! ## Example
//!
//! ```rust
//! use physics_sync::prelude::*;
//!
//! let timer = ManualTimer::new();
//! let mut world = PhysicsWorld::new(
//!     Vector3::new(0.0, -9.82, 0.0),
//!     ReferenceEngine::new(),
//!     timer.clone(),
//! );
//!
//! let node = SceneObject::shared("sphere", NodeTransform::at(0.0, 2.0, 0.0));
//! let config: ObjectConfig = serde_json::from_str(
//!     r#"{"body": {"mass": 1, "transform": {"position": {"x": 0, "y": 2, "z": 0}}}}"#,
//! ).unwrap();
//! let sphere = world.create_object(Some(node.clone()), ShapeKind::Sphere, config);
//! assert!(sphere.is_some());
//!
//! world.start();
//! timer.advance(100.0);
//! assert!(node.borrow().transform().y < 2.0);
//! ```

#![warn(missing_docs)]

/// Vectors, quaternions and mass
pub mod math;

/// Error taxonomy
pub mod error;

/// Body and constraint identities
pub mod ident;

/// Object configuration, defaults merging and clock settings
pub mod config;

/// External scene nodes
pub mod scene;

/// Host log sink
pub mod log;

/// Rigid-body engine contract and reference engine
pub mod engine;

/// Tracked bodies and constraints
pub mod registry;

/// Transform synchronization, snapshot and restore
pub mod sync;

/// Fixed-timestep clock and host timers
pub mod clock;

/// Constraint lifecycle
pub mod constraint;

/// Public facade
pub mod world;

pub use engine::{PhysicsEngine, ReferenceEngine};
pub use error::{Result, SyncError};
pub use world::{PhysicsWorld, ShapeKind};

/// Everything a host typically needs
pub mod prelude {
    pub use crate::clock::{ManualTimer, TimerHandle, TimerService};
    pub use crate::config::{
        BodyOverrides, ClockSettings, ObjectConfig, PropertySyncOverrides, SyncOverrides,
        SyncProperty, TransformOverrides,
    };
    pub use crate::constraint::{ConstraintArgs, ConstraintKind};
    pub use crate::engine::{PhysicsEngine, ReferenceEngine};
    pub use crate::error::SyncError;
    pub use crate::ident::{BodyId, ConstraintId};
    pub use crate::log::{LogSink, RecordingSink, TracingSink};
    pub use crate::math::{Axis, Quaternion, Vector3};
    pub use crate::scene::{NodeRef, NodeTransform, SceneNode, SceneObject};
    pub use crate::world::{PhysicsWorld, ShapeKind};
}
