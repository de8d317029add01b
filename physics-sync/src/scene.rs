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
//! External scene nodes
//!
//! The scene graph is owned by the host. The world only needs a mutable
//! [`NodeTransform`] record per node; [`SceneNode`] is the seam through which
//! it is reached. Nodes are shared with the host as [`NodeRef`].

use crate::config::SyncProperty;
use crate::math::Axis;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a host-owned node
pub type NodeRef = Rc<RefCell<dyn SceneNode>>;

/// One numeric field of a [`NodeTransform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformField {
    /// Position X
    X,
    /// Position Y
    Y,
    /// Position Z
    Z,
    /// Euler angle about X
    RotationX,
    /// Euler angle about Y
    RotationY,
    /// Euler angle about Z
    RotationZ,
}

impl TransformField {
    /// Field written for a (property, axis) sync target
    ///
    /// Position maps to the bare axis, rotation to `rotation` plus the
    /// capitalized axis.
    pub fn for_target(property: SyncProperty, axis: Axis) -> Self {
        match (property, axis) {
            (SyncProperty::Position, Axis::X) => TransformField::X,
            (SyncProperty::Position, Axis::Y) => TransformField::Y,
            (SyncProperty::Position, Axis::Z) => TransformField::Z,
            (SyncProperty::Rotation, Axis::X) => TransformField::RotationX,
            (SyncProperty::Rotation, Axis::Y) => TransformField::RotationY,
            (SyncProperty::Rotation, Axis::Z) => TransformField::RotationZ,
        }
    }

    /// Field name as the host sees it
    pub fn name(&self) -> &'static str {
        match self {
            TransformField::X => "x",
            TransformField::Y => "y",
            TransformField::Z => "z",
            TransformField::RotationX => "rotationX",
            TransformField::RotationY => "rotationY",
            TransformField::RotationZ => "rotationZ",
        }
    }
}

impl fmt::Display for TransformField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transform record of an external node
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeTransform {
    /// Position X
    pub x: f64,
    /// Position Y
    pub y: f64,
    /// Position Z
    pub z: f64,
    /// Euler angle about X, radians
    pub rotation_x: f64,
    /// Euler angle about Y, radians
    pub rotation_y: f64,
    /// Euler angle about Z, radians
    pub rotation_z: f64,
}

impl NodeTransform {
    /// Transform at a position with zero rotation
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        NodeTransform {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    /// Read one field
    pub fn get(&self, field: TransformField) -> f64 {
        match field {
            TransformField::X => self.x,
            TransformField::Y => self.y,
            TransformField::Z => self.z,
            TransformField::RotationX => self.rotation_x,
            TransformField::RotationY => self.rotation_y,
            TransformField::RotationZ => self.rotation_z,
        }
    }

    /// Write one field
    pub fn set(&mut self, field: TransformField, value: f64) {
        let slot = match field {
            TransformField::X => &mut self.x,
            TransformField::Y => &mut self.y,
            TransformField::Z => &mut self.z,
            TransformField::RotationX => &mut self.rotation_x,
            TransformField::RotationY => &mut self.rotation_y,
            TransformField::RotationZ => &mut self.rotation_z,
        };
        *slot = value;
    }
}

/// A host-owned object whose transform follows a body
pub trait SceneNode {
    /// Current transform
    fn transform(&self) -> &NodeTransform;

    /// Mutable transform
    fn transform_mut(&mut self) -> &mut NodeTransform;
}

/// Plain node carrying only a name and a transform
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneObject {
    name: String,
    transform: NodeTransform,
}

impl SceneObject {
    /// Create a node
    pub fn new(name: impl Into<String>, transform: NodeTransform) -> Self {
        SceneObject {
            name: name.into(),
            transform,
        }
    }

    /// Create a node already wrapped for sharing with a world
    pub fn shared(name: impl Into<String>, transform: NodeTransform) -> Rc<RefCell<SceneObject>> {
        Rc::new(RefCell::new(Self::new(name, transform)))
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SceneNode for SceneObject {
    fn transform(&self) -> &NodeTransform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.transform
    }
}
