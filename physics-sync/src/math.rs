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
//! Value types shared by the binding layer and the engine contract
//!
//! Vectors and quaternions use double-precision floats. They are plain
//! `Copy` values: every operation returns a new value rather than mutating
//! in place, so snapshots can hold them by value.

use serde::Deserialize;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Cartesian axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// The X axis
    X,
    /// The Y axis
    Y,
    /// The Z axis
    Z,
}

impl Axis {
    /// All axes in canonical order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Lowercase axis name (`"x"`, `"y"`, `"z"`)
    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 3D vector used for positions, scales, pivots and axes
///
/// # Examples
///
/// ```
/// use physics_sync::math::{Axis, Vector3};
///
/// let v = Vector3::new(1.0, 2.0, 3.0);
/// assert_eq!(v.get(Axis::Y), 2.0);
/// assert!(v.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Vector3 {
    x: f64,
    y: f64,
    z: f64,
}

impl Vector3 {
    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3 { x, y, z }
    }

    /// The zero vector
    pub const fn zero() -> Self {
        Vector3::new(0.0, 0.0, 0.0)
    }

    /// The unit vector (1, 1, 1), used as the default scale
    pub const fn one() -> Self {
        Vector3::new(1.0, 1.0, 1.0)
    }

    /// Get the x component
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Get the y component
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Get the z component
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Get the component along `axis`
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Return a copy with the component along `axis` replaced
    pub fn with(&self, axis: Axis, value: f64) -> Self {
        let mut out = *self;
        match axis {
            Axis::X => out.x = value,
            Axis::Y => out.y = value,
            Axis::Z => out.z = value,
        }
        out
    }

    /// Check if all components are finite (not NaN or infinite)
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Dot product
    pub fn dot(&self, other: Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    pub fn cross(&self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Euclidean length
    pub fn length(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    /// Unit-length copy, or zero when the length is zero
    pub fn normalized(&self) -> Vector3 {
        let len = self.length();
        if len > 0.0 {
            *self * (1.0 / len)
        } else {
            Vector3::zero()
        }
    }

    /// Get the vector as an array
    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Vector3) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

/// Orientation quaternion
///
/// Quaternions are not normalized on construction. Callers that need a
/// rotation should go through [`Quaternion::normalized`]; the raw value is
/// kept so configuration round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Quaternion {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl Quaternion {
    /// Tolerance used by [`Quaternion::is_unit`]
    pub const UNIT_TOLERANCE: f64 = 1e-6;

    /// Create a new quaternion
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quaternion { x, y, z, w }
    }

    /// The identity rotation
    pub const fn identity() -> Self {
        Quaternion::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Rotation of `angle` radians about `axis`
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let axis = axis.normalized();
        let half = angle * 0.5;
        let s = half.sin();
        Quaternion::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Get the x component
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Get the y component
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Get the z component
    pub fn z(&self) -> f64 {
        self.z
    }

    /// Get the w component
    pub fn w(&self) -> f64 {
        self.w
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Whether the norm is 1 within [`Quaternion::UNIT_TOLERANCE`]
    pub fn is_unit(&self) -> bool {
        (self.norm() - 1.0).abs() < Self::UNIT_TOLERANCE
    }

    /// Check if all components are finite
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Unit-length copy; a zero quaternion becomes the identity
    pub fn normalized(&self) -> Quaternion {
        let n = self.norm();
        if n > 0.0 && n.is_finite() {
            Quaternion::new(self.x / n, self.y / n, self.z / n, self.w / n)
        } else {
            Quaternion::identity()
        }
    }

    /// Conjugate (inverse for unit quaternions)
    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate `v` by this quaternion (normalized first)
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        let q = self.normalized();
        let u = Vector3::new(q.x, q.y, q.z);
        let t = u.cross(v) * 2.0;
        v + t * q.w + u.cross(t)
    }

    /// Advance this orientation by angular velocity `omega` over `dt`
    pub fn integrate(&self, omega: Vector3, dt: f64) -> Quaternion {
        let spin = Quaternion::new(omega.x, omega.y, omega.z, 0.0) * *self;
        Quaternion::new(
            self.x + 0.5 * dt * spin.x,
            self.y + 0.5 * dt * spin.y,
            self.z + 0.5 * dt * spin.z,
            self.w + 0.5 * dt * spin.w,
        )
        .normalized()
    }

    /// Convert to Euler angles using the Y-Z-X convention
    ///
    /// Returns a vector whose `y` is heading, `z` attitude and `x` bank.
    /// Near the poles (|test| > 0.499) bank is pinned to zero.
    pub fn to_euler(&self) -> Vector3 {
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        let test = x * y + z * w;

        let (heading, attitude, bank) = if test > 0.499 {
            (2.0 * x.atan2(w), std::f64::consts::FRAC_PI_2, 0.0)
        } else if test < -0.499 {
            (-2.0 * x.atan2(w), -std::f64::consts::FRAC_PI_2, 0.0)
        } else {
            let sqx = x * x;
            let sqy = y * y;
            let sqz = z * z;
            (
                (2.0 * y * w - 2.0 * x * z).atan2(1.0 - 2.0 * sqy - 2.0 * sqz),
                (2.0 * test).clamp(-1.0, 1.0).asin(),
                (2.0 * x * w - 2.0 * y * z).atan2(1.0 - 2.0 * sqx - 2.0 * sqz),
            )
        };

        Vector3::new(bank, heading, attitude)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    /// Hamilton product
    fn mul(self, rhs: Quaternion) -> Quaternion {
        Quaternion::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

/// Mass with special handling for zero (static) bodies
///
/// # Examples
///
/// ```
/// use physics_sync::math::Mass;
///
/// let mass = Mass::new(10.5);
/// assert!(!mass.is_immovable());
/// assert!(Mass::immovable().is_immovable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mass {
    value: f64,
}

impl Mass {
    /// Threshold below which mass is considered effectively zero (immovable)
    pub const IMMOVABLE_THRESHOLD: f64 = 1e-10;

    /// Create a new mass in kilograms
    ///
    /// # Panics
    ///
    /// Panics if the mass is negative or not finite. Use `try_new` for
    /// values coming from user configuration.
    pub fn new(value: f64) -> Self {
        assert!(value >= 0.0 && value.is_finite(), "Mass must be non-negative and finite");
        Mass { value }
    }

    /// Try to create a new mass; `None` for negative or non-finite values
    pub fn try_new(value: f64) -> Option<Self> {
        if value >= 0.0 && value.is_finite() {
            Some(Mass { value })
        } else {
            None
        }
    }

    /// A static body
    pub fn immovable() -> Self {
        Mass { value: 0.0 }
    }

    /// Get the mass value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Check if this is an immovable body (zero or near-zero mass)
    pub fn is_immovable(&self) -> bool {
        self.value < Self::IMMOVABLE_THRESHOLD
    }

    /// Inverse mass, 0.0 for immovable bodies
    pub fn inverse(&self) -> f64 {
        if self.is_immovable() {
            0.0
        } else {
            1.0 / self.value
        }
    }
}

impl Default for Mass {
    fn default() -> Self {
        Mass::immovable()
    }
}
