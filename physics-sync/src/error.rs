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
//! Error taxonomy for the binding layer
//!
//! None of these errors is fatal. The public [`PhysicsWorld`](crate::PhysicsWorld)
//! methods log them through the configured sink and return an absent result;
//! the `try_*` variants hand them back to callers that want a hard signal.

use crate::ident::{BodyId, ConstraintId};
use thiserror::Error;

/// Errors raised by registry, constraint and facade operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// A shape name did not match any known shape
    #[error("unknown shape type '{0}'")]
    UnknownShape(String),

    /// A constraint type name did not match any known constraint kind
    #[error("unknown constraint type '{0}'")]
    UnknownConstraintType(String),

    /// A required parameter was missing from loosely-typed input
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    /// Configuration could not be resolved into a complete value
    #[error("configuration field '{0}' is unset after merging")]
    IncompleteConfig(&'static str),

    /// A body mass was negative or not finite
    #[error("invalid mass {0}: must be non-negative and finite")]
    InvalidMass(f64),

    /// Clock settings failed validation
    #[error("invalid clock settings: {0}")]
    InvalidSettings(String),

    /// No body is registered under this identity
    #[error("body {0} is not registered")]
    BodyNotFound(BodyId),

    /// No constraint is registered under this identity
    #[error("constraint {0} is not registered")]
    ConstraintNotFound(ConstraintId),

    /// The engine refused to build or address a handle
    #[error("engine rejected the request: {0}")]
    Engine(String),

    /// The world is mid-way through a step or sync pass
    #[error("world is busy with a sync pass; defer structural changes")]
    Busy,
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, SyncError>;
