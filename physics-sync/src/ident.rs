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
//! Identity allocation
//!
//! Bodies get random UUID v4 identities. Constraint identities are derived:
//! the standard base64 encoding of `"<idA>.<idB>"`, keeping call order, so
//! the same ordered pair always maps to the same identity.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a tracked body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct BodyId(String);

impl BodyId {
    /// Borrow the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BodyId {
    fn from(value: &str) -> Self {
        BodyId(value.to_string())
    }
}

impl From<String> for BodyId {
    fn from(value: String) -> Self {
        BodyId(value)
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a tracked constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(String);

impl ConstraintId {
    /// Borrow the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConstraintId {
    fn from(value: &str) -> Self {
        ConstraintId(value.to_string())
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues body identities and derives constraint identities
///
/// Stateless; uniqueness of body identities is probabilistic and no
/// collision detection is performed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAllocator;

impl IdentityAllocator {
    /// Create an allocator
    pub fn new() -> Self {
        IdentityAllocator
    }

    /// Generate a fresh random body identity
    pub fn new_body_id(&self) -> BodyId {
        BodyId(Uuid::new_v4().to_string())
    }

    /// Derive the identity of a constraint between `a` and `b`
    ///
    /// Argument order matters: `constraint_id(a, b) != constraint_id(b, a)`.
    ///
    /// ```
    /// use physics_sync::ident::{BodyId, IdentityAllocator};
    ///
    /// let id = IdentityAllocator::constraint_id(&BodyId::from("a"), &BodyId::from("b"));
    /// assert_eq!(id.as_str(), "YS5i");
    /// ```
    pub fn constraint_id(a: &BodyId, b: &BodyId) -> ConstraintId {
        let raw = format!("{}.{}", a, b);
        ConstraintId(general_purpose::STANDARD.encode(raw.as_bytes()))
    }

    /// Derive the identity of the `sequence`-th constraint on an ordered pair
    ///
    /// Used when the plain derived identity is already taken.
    pub fn sequenced_constraint_id(a: &BodyId, b: &BodyId, sequence: u32) -> ConstraintId {
        let raw = format!("{}.{}#{}", a, b, sequence);
        ConstraintId(general_purpose::STANDARD.encode(raw.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_body_ids_are_unique() {
        let alloc = IdentityAllocator::new();
        let ids: HashSet<BodyId> = (0..1000).map(|_| alloc.new_body_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_body_id_is_uuid_shaped() {
        let id = IdentityAllocator::new().new_body_id();
        assert_eq!(id.as_str().len(), 36);
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_constraint_id_is_base64_of_pair() {
        let a = BodyId::from("left");
        let b = BodyId::from("right");
        let id = IdentityAllocator::constraint_id(&a, &b);
        let decoded = general_purpose::STANDARD.decode(id.as_str()).unwrap();
        assert_eq!(decoded, b"left.right");
    }

    #[test]
    fn test_constraint_id_is_order_sensitive() {
        let a = BodyId::from("a");
        let b = BodyId::from("b");
        assert_ne!(
            IdentityAllocator::constraint_id(&a, &b),
            IdentityAllocator::constraint_id(&b, &a)
        );
    }

    #[test]
    fn test_constraint_id_is_deterministic() {
        let a = BodyId::from("a");
        let b = BodyId::from("b");
        assert_eq!(
            IdentityAllocator::constraint_id(&a, &b),
            IdentityAllocator::constraint_id(&a, &b)
        );
    }

    #[test]
    fn test_sequenced_id_differs_from_plain() {
        let a = BodyId::from("a");
        let b = BodyId::from("b");
        let plain = IdentityAllocator::constraint_id(&a, &b);
        let second = IdentityAllocator::sequenced_constraint_id(&a, &b, 2);
        let third = IdentityAllocator::sequenced_constraint_id(&a, &b, 3);
        assert_ne!(plain, second);
        assert_ne!(second, third);
    }
}
