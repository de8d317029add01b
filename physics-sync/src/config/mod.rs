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
//! Body and sync configuration
//!
//! Callers describe a body with an [`ObjectConfig`]: a tree of optional
//! fields, two levels deep, that mirrors the shape of the defaults template:
//!
//! ```text
//! body ─┬─ mass
//!       ├─ radius
//!       └─ transform ─┬─ position
//!                     ├─ rotation
//!                     └─ scale
//! sync ─┬─ properties   (ordered set)
//!       ├─ axes         (ordered set)
//!       ├─ position ─── enabled / allAxis / x / y / z
//!       └─ rotation ─── enabled / allAxis / x / y / z
//! ```
//!
//! An absent field is `None`; an explicitly falsy field (`false`, `0`) is
//! `Some` and survives merging untouched. [`ConfigMerger`] fills the gaps
//! from a template and [`ObjectConfig::resolve`] turns the merged tree into
//! the complete [`BodyConfig`] and [`SyncPolicy`] used by the world.
//!
//! Every type here deserializes from the camelCase JSON shape hosts already
//! use, e.g. `{"sync": {"rotation": {"enabled": false}}}`.

mod merge;
mod settings;

pub use merge::{merge, ConfigMerger};
pub use settings::ClockSettings;

use crate::error::{Result, SyncError};
use crate::math::{Axis, Quaternion, Vector3};
use serde::Deserialize;
use std::fmt;

/// Transform property kept in sync with the external node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncProperty {
    /// Translation, written to the node's `x`, `y`, `z`
    Position,
    /// Orientation as Euler angles, written to `rotationX`, `rotationY`, `rotationZ`
    Rotation,
}

impl SyncProperty {
    /// All properties in template order
    pub const ALL: [SyncProperty; 2] = [SyncProperty::Position, SyncProperty::Rotation];
}

impl fmt::Display for SyncProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncProperty::Position => f.write_str("position"),
            SyncProperty::Rotation => f.write_str("rotation"),
        }
    }
}

/// Per-property axis mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySync {
    /// Master switch for the property
    pub enabled: bool,
    /// When set, every axis is synced regardless of the per-axis flags
    pub all_axis: bool,
    /// Sync the X axis
    pub x: bool,
    /// Sync the Y axis
    pub y: bool,
    /// Sync the Z axis
    pub z: bool,
}

impl PropertySync {
    /// Every axis enabled
    pub const fn all() -> Self {
        PropertySync {
            enabled: true,
            all_axis: true,
            x: true,
            y: true,
            z: true,
        }
    }

    /// Property switched off
    pub const fn disabled() -> Self {
        PropertySync {
            enabled: false,
            all_axis: false,
            x: false,
            y: false,
            z: false,
        }
    }

    /// The per-axis flag, ignoring `enabled` and `all_axis`
    pub fn axis(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Whether this mask lets `axis` through
    pub fn passes(&self, axis: Axis) -> bool {
        self.enabled && (self.all_axis || self.axis(axis))
    }
}

/// Complete sync policy for one body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Properties to visit, in order
    pub properties: Vec<SyncProperty>,
    /// Axes to visit, in order
    pub axes: Vec<Axis>,
    /// Position mask
    pub position: PropertySync,
    /// Rotation mask
    pub rotation: PropertySync,
}

impl SyncPolicy {
    /// Mask for `property`
    pub fn property(&self, property: SyncProperty) -> &PropertySync {
        match property {
            SyncProperty::Position => &self.position,
            SyncProperty::Rotation => &self.rotation,
        }
    }

    /// Visit every (property, axis) pair the policy enables
    ///
    /// Order follows `properties` then `axes`. Pairs rejected by the mask are
    /// never passed to `visit`.
    pub fn for_each_target(&self, mut visit: impl FnMut(SyncProperty, Axis)) {
        for &property in &self.properties {
            let mask = self.property(property);
            if !mask.enabled {
                continue;
            }
            for &axis in &self.axes {
                if mask.passes(axis) {
                    visit(property, axis);
                }
            }
        }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy {
            properties: SyncProperty::ALL.to_vec(),
            axes: Axis::ALL.to_vec(),
            position: PropertySync::all(),
            rotation: PropertySync::all(),
        }
    }
}

/// Initial pose and scale of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World position
    pub position: Vector3,
    /// Orientation, passed to the engine as given
    pub rotation: Quaternion,
    /// Scale; doubles as box half-extents
    pub scale: Vector3,
}

/// Complete body configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyConfig {
    /// Mass in kilograms; zero makes the body static
    pub mass: f64,
    /// Sphere radius
    pub radius: f64,
    /// Initial transform
    pub transform: Transform,
}

/// Partial per-property mask
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertySyncOverrides {
    /// Master switch
    pub enabled: Option<bool>,
    /// Sync every axis
    pub all_axis: Option<bool>,
    /// X flag
    pub x: Option<bool>,
    /// Y flag
    pub y: Option<bool>,
    /// Z flag
    pub z: Option<bool>,
}

impl From<PropertySync> for PropertySyncOverrides {
    fn from(value: PropertySync) -> Self {
        PropertySyncOverrides {
            enabled: Some(value.enabled),
            all_axis: Some(value.all_axis),
            x: Some(value.x),
            y: Some(value.y),
            z: Some(value.z),
        }
    }
}

/// Partial sync policy
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncOverrides {
    /// Properties to visit
    pub properties: Option<Vec<SyncProperty>>,
    /// Axes to visit
    pub axes: Option<Vec<Axis>>,
    /// Position mask
    pub position: Option<PropertySyncOverrides>,
    /// Rotation mask
    pub rotation: Option<PropertySyncOverrides>,
}

/// Partial transform
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformOverrides {
    /// World position
    pub position: Option<Vector3>,
    /// Orientation
    pub rotation: Option<Quaternion>,
    /// Scale
    pub scale: Option<Vector3>,
}

/// Partial body configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BodyOverrides {
    /// Mass in kilograms
    pub mass: Option<f64>,
    /// Sphere radius
    pub radius: Option<f64>,
    /// Initial transform
    pub transform: Option<TransformOverrides>,
}

/// Caller-supplied configuration for one object
///
/// # Example
///
/// ```
/// use physics_sync::config::{BodyOverrides, ObjectConfig};
///
/// let config = ObjectConfig::default().with_body(BodyOverrides {
///     mass: Some(1.0),
///     ..Default::default()
/// });
/// assert!(config.sync.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ObjectConfig {
    /// Body parameters
    pub body: Option<BodyOverrides>,
    /// Sync policy
    pub sync: Option<SyncOverrides>,
}

impl ObjectConfig {
    /// Build the defaults template
    ///
    /// Returns a fresh owned value on every call, so no two worlds ever share
    /// (or mutate) the same template.
    pub fn defaults() -> Self {
        ObjectConfig {
            body: Some(BodyOverrides {
                mass: Some(0.0),
                radius: Some(1.0),
                transform: Some(TransformOverrides {
                    // Non-unit on purpose; kept as observed in existing scenes.
                    rotation: Some(Quaternion::new(0.0, 0.0, 0.0, 0.5)),
                    position: Some(Vector3::zero()),
                    scale: Some(Vector3::one()),
                }),
            }),
            sync: Some(SyncOverrides {
                properties: Some(SyncProperty::ALL.to_vec()),
                axes: Some(Axis::ALL.to_vec()),
                rotation: Some(PropertySync::all().into()),
                position: Some(PropertySync::all().into()),
            }),
        }
    }

    /// Replace the body branch
    pub fn with_body(mut self, body: BodyOverrides) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the sync branch
    pub fn with_sync(mut self, sync: SyncOverrides) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Convert a fully merged tree into complete values
    ///
    /// Fails with [`SyncError::IncompleteConfig`] naming the first unset
    /// field; this only happens if the tree was not merged against a complete
    /// template first.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let body = self.body.as_ref().ok_or(SyncError::IncompleteConfig("body"))?;
        let transform = body
            .transform
            .as_ref()
            .ok_or(SyncError::IncompleteConfig("body.transform"))?;
        let sync = self.sync.as_ref().ok_or(SyncError::IncompleteConfig("sync"))?;

        let body = BodyConfig {
            mass: body.mass.ok_or(SyncError::IncompleteConfig("body.mass"))?,
            radius: body.radius.ok_or(SyncError::IncompleteConfig("body.radius"))?,
            transform: Transform {
                position: transform
                    .position
                    .ok_or(SyncError::IncompleteConfig("body.transform.position"))?,
                rotation: transform
                    .rotation
                    .ok_or(SyncError::IncompleteConfig("body.transform.rotation"))?,
                scale: transform
                    .scale
                    .ok_or(SyncError::IncompleteConfig("body.transform.scale"))?,
            },
        };

        let sync = SyncPolicy {
            properties: sync
                .properties
                .clone()
                .ok_or(SyncError::IncompleteConfig("sync.properties"))?,
            axes: sync.axes.clone().ok_or(SyncError::IncompleteConfig("sync.axes"))?,
            position: resolve_mask(sync.position.as_ref(), "sync.position")?,
            rotation: resolve_mask(sync.rotation.as_ref(), "sync.rotation")?,
        };

        Ok(ResolvedConfig { body, sync })
    }
}

fn resolve_mask(mask: Option<&PropertySyncOverrides>, field: &'static str) -> Result<PropertySync> {
    let mask = mask.ok_or(SyncError::IncompleteConfig(field))?;
    Ok(PropertySync {
        enabled: mask.enabled.ok_or(SyncError::IncompleteConfig(field))?,
        all_axis: mask.all_axis.ok_or(SyncError::IncompleteConfig(field))?,
        x: mask.x.ok_or(SyncError::IncompleteConfig(field))?,
        y: mask.y.ok_or(SyncError::IncompleteConfig(field))?,
        z: mask.z.ok_or(SyncError::IncompleteConfig(field))?,
    })
}

/// Complete configuration produced by [`ObjectConfig::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Body parameters
    pub body: BodyConfig,
    /// Sync policy
    pub sync: SyncPolicy,
}
