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
//! Stepping-loop settings

use crate::error::{Result, SyncError};
use serde::Deserialize;

/// Fixed-timestep settings for the simulation clock
///
/// # Timestep Guidelines
///
/// - `fixed_time_step` is the simulated time consumed by one engine step.
///   1/60 s matches a typical display refresh.
/// - `max_sub_steps` caps how many fixed steps one tick may run, bounding
///   the worst-case cost of a late tick.
/// - `interval_ms` is how often the host timer fires. It is deliberately
///   much shorter than the fixed step; ticks that carry less than a step of
///   wall-clock time are absorbed by the engine's accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClockSettings {
    /// Simulated seconds per engine step
    pub fixed_time_step: f64,
    /// Upper bound on engine steps per tick
    pub max_sub_steps: u32,
    /// Host timer period in milliseconds
    pub interval_ms: u64,
}

impl ClockSettings {
    /// Default fixed step: 60 steps per simulated second
    pub const DEFAULT_FIXED_TIME_STEP: f64 = 1.0 / 60.0;
    /// Default sub-step cap
    pub const DEFAULT_MAX_SUB_STEPS: u32 = 3;
    /// Default timer period
    pub const DEFAULT_INTERVAL_MS: u64 = 5;

    /// Validate the settings
    ///
    /// Rejects non-positive or non-finite steps, a zero sub-step cap and a
    /// zero interval. Steps outside `[1e-6, 1.0]` are rejected as well: they
    /// either lose precision or make the integrator unstable.
    pub fn validate(&self) -> Result<()> {
        let dt = self.fixed_time_step;

        if dt <= 0.0 || !dt.is_finite() {
            return Err(SyncError::InvalidSettings(format!(
                "fixed time step {} must be positive and finite",
                dt
            )));
        }

        if dt < 1e-6 {
            return Err(SyncError::InvalidSettings(format!(
                "fixed time step {} is extremely small and would need millions of steps per second",
                dt
            )));
        }

        if dt > 1.0 {
            return Err(SyncError::InvalidSettings(format!(
                "fixed time step {} is large and may cause instability",
                dt
            )));
        }

        if self.max_sub_steps == 0 {
            return Err(SyncError::InvalidSettings(
                "max sub-steps must be at least 1".to_string(),
            ));
        }

        if self.interval_ms == 0 {
            return Err(SyncError::InvalidSettings(
                "timer interval must be at least 1 ms".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ClockSettings {
    fn default() -> Self {
        ClockSettings {
            fixed_time_step: Self::DEFAULT_FIXED_TIME_STEP,
            max_sub_steps: Self::DEFAULT_MAX_SUB_STEPS,
            interval_ms: Self::DEFAULT_INTERVAL_MS,
        }
    }
}
