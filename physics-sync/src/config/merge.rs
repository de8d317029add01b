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
//! Defaults merging
//!
//! Rules, applied per field of the template:
//!
//! - absent branch or scalar: copy the template value
//! - present scalar: keep the caller's value, falsy or not
//! - list (`properties`, `axes`): ordered set union, caller's elements first
//! - present object (`transform`, `sync.position`, `sync.rotation`): fill its
//!   own absent keys, one level deep
//!
//! Merging never fails and is idempotent.

use super::{
    BodyOverrides, ObjectConfig, PropertySyncOverrides, SyncOverrides, TransformOverrides,
};

/// Fills absent fields of a partial [`ObjectConfig`] from a template
///
/// The merger owns its template; [`ConfigMerger::new`] builds it from
/// [`ObjectConfig::defaults`].
///
/// # Example
///
/// ```
/// use physics_sync::config::{BodyOverrides, ConfigMerger, ObjectConfig};
///
/// let merger = ConfigMerger::new();
/// let mut config = ObjectConfig::default().with_body(BodyOverrides {
///     mass: Some(0.0),
///     ..Default::default()
/// });
/// merger.merge(&mut config);
///
/// let resolved = config.resolve().unwrap();
/// assert_eq!(resolved.body.mass, 0.0);
/// assert_eq!(resolved.body.radius, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    template: ObjectConfig,
}

impl ConfigMerger {
    /// Create a merger over the standard defaults
    pub fn new() -> Self {
        ConfigMerger {
            template: ObjectConfig::defaults(),
        }
    }

    /// Create a merger over a custom template
    pub fn with_template(template: ObjectConfig) -> Self {
        ConfigMerger { template }
    }

    /// The template this merger fills from
    pub fn template(&self) -> &ObjectConfig {
        &self.template
    }

    /// Merge the template into `partial` in place and return it
    pub fn merge<'a>(&self, partial: &'a mut ObjectConfig) -> &'a mut ObjectConfig {
        merge(partial, &self.template)
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge `template` into `partial` in place and return it
pub fn merge<'a>(partial: &'a mut ObjectConfig, template: &ObjectConfig) -> &'a mut ObjectConfig {
    fill_branch(&mut partial.body, &template.body);
    fill_branch(&mut partial.sync, &template.sync);
    partial
}

/// Key-by-key fill of one node against its template counterpart
trait FillFrom {
    fn fill_from(&mut self, template: &Self);
}

impl FillFrom for BodyOverrides {
    fn fill_from(&mut self, template: &Self) {
        fill_scalar(&mut self.mass, &template.mass);
        fill_scalar(&mut self.radius, &template.radius);
        fill_branch(&mut self.transform, &template.transform);
    }
}

// Leaves only: vectors and quaternions are copied whole.
impl FillFrom for TransformOverrides {
    fn fill_from(&mut self, template: &Self) {
        fill_scalar(&mut self.position, &template.position);
        fill_scalar(&mut self.rotation, &template.rotation);
        fill_scalar(&mut self.scale, &template.scale);
    }
}

impl FillFrom for SyncOverrides {
    fn fill_from(&mut self, template: &Self) {
        fill_set(&mut self.properties, &template.properties);
        fill_set(&mut self.axes, &template.axes);
        fill_branch(&mut self.position, &template.position);
        fill_branch(&mut self.rotation, &template.rotation);
    }
}

impl FillFrom for PropertySyncOverrides {
    fn fill_from(&mut self, template: &Self) {
        fill_scalar(&mut self.enabled, &template.enabled);
        fill_scalar(&mut self.all_axis, &template.all_axis);
        fill_scalar(&mut self.x, &template.x);
        fill_scalar(&mut self.y, &template.y);
        fill_scalar(&mut self.z, &template.z);
    }
}

fn fill_scalar<T: Clone>(slot: &mut Option<T>, template: &Option<T>) {
    if slot.is_none() {
        *slot = template.clone();
    }
}

fn fill_branch<T: FillFrom + Clone>(slot: &mut Option<T>, template: &Option<T>) {
    match slot {
        Some(value) => {
            if let Some(template) = template {
                value.fill_from(template);
            }
        }
        None => *slot = template.clone(),
    }
}

fn fill_set<T: PartialEq + Clone>(slot: &mut Option<Vec<T>>, template: &Option<Vec<T>>) {
    match slot {
        Some(items) => {
            if let Some(template) = template {
                for item in template {
                    if !items.contains(item) {
                        items.push(item.clone());
                    }
                }
            }
        }
        None => *slot = template.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncProperty;
    use crate::math::{Axis, Quaternion, Vector3};

    #[test]
    fn test_empty_config_becomes_template() {
        let mut config = ObjectConfig::default();
        let merger = ConfigMerger::new();
        merger.merge(&mut config);
        assert_eq!(&config, merger.template());
    }

    #[test]
    fn test_falsy_values_are_kept() {
        let mut config = ObjectConfig::default()
            .with_body(BodyOverrides {
                mass: Some(0.0),
                radius: Some(0.0),
                transform: None,
            })
            .with_sync(SyncOverrides {
                position: Some(PropertySyncOverrides {
                    enabled: Some(false),
                    x: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            });
        merge(&mut config, &ObjectConfig::defaults());

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.body.radius, 0.0);
        assert!(!resolved.sync.position.enabled);
        assert!(!resolved.sync.position.x);
        // filled from the template
        assert!(resolved.sync.position.all_axis);
        assert!(resolved.sync.position.y);
    }

    #[test]
    fn test_transform_filled_key_by_key() {
        let mut config = ObjectConfig::default().with_body(BodyOverrides {
            mass: Some(1.0),
            radius: Some(0.01),
            transform: Some(TransformOverrides {
                position: Some(Vector3::new(0.0, 2.0, 0.0)),
                ..Default::default()
            }),
        });
        merge(&mut config, &ObjectConfig::defaults());

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.body.transform.position, Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(resolved.body.transform.rotation, Quaternion::new(0.0, 0.0, 0.0, 0.5));
        assert_eq!(resolved.body.transform.scale, Vector3::one());
    }

    #[test]
    fn test_lists_are_unioned_in_caller_order() {
        let mut config = ObjectConfig::default().with_sync(SyncOverrides {
            properties: Some(vec![SyncProperty::Rotation]),
            axes: Some(vec![Axis::Z, Axis::Y]),
            ..Default::default()
        });
        merge(&mut config, &ObjectConfig::defaults());

        let sync = config.sync.as_ref().unwrap();
        assert_eq!(
            sync.properties,
            Some(vec![SyncProperty::Rotation, SyncProperty::Position])
        );
        assert_eq!(sync.axes, Some(vec![Axis::Z, Axis::Y, Axis::X]));
    }

    #[test]
    fn test_lists_are_not_duplicated() {
        let mut config = ObjectConfig::default().with_sync(SyncOverrides {
            axes: Some(vec![Axis::X, Axis::Y, Axis::Z]),
            ..Default::default()
        });
        merge(&mut config, &ObjectConfig::defaults());
        assert_eq!(
            config.sync.as_ref().unwrap().axes,
            Some(vec![Axis::X, Axis::Y, Axis::Z])
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = ObjectConfig::default().with_sync(SyncOverrides {
            axes: Some(vec![Axis::Y]),
            rotation: Some(PropertySyncOverrides {
                enabled: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        });
        let template = ObjectConfig::defaults();
        merge(&mut once, &template);
        let mut twice = once.clone();
        merge(&mut twice, &template);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_leaves_template_untouched() {
        let merger = ConfigMerger::new();
        let mut config = ObjectConfig::default().with_sync(SyncOverrides {
            axes: Some(vec![Axis::Y]),
            ..Default::default()
        });
        merger.merge(&mut config);
        if let Some(axes) = config.sync.as_mut().and_then(|s| s.axes.as_mut()) {
            axes.clear();
        }
        assert_eq!(merger.template(), &ObjectConfig::defaults());
    }

    #[test]
    fn test_custom_template() {
        let mut template = ObjectConfig::defaults();
        if let Some(body) = template.body.as_mut() {
            body.mass = Some(3.0);
        }
        let merger = ConfigMerger::with_template(template);
        let mut config = ObjectConfig::default();
        merger.merge(&mut config);
        assert_eq!(config.resolve().unwrap().body.mass, 3.0);
    }
}
