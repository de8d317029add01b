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
//! Fixed-timestep clock
//!
//! The host drives the world through a repeating timer. Each tick carries a
//! wall-clock timestamp in milliseconds; the clock turns consecutive
//! timestamps into a delta, steps the engine and syncs every node.
//!
//! ```text
//!            start: snapshot, generation += 1
//!   Stopped ─────────────────────────────────▶ Running
//!      ▲                                          │
//!      └──────────────────────────────────────────┘
//!            stop: generation += 1, restore
//! ```
//!
//! Every timer callback is tagged with the generation current when it was
//! registered. A tick whose tag no longer matches is stale and does nothing,
//! so a tick that was already queued when `stop` ran can never step a
//! torn-down world.

use crate::config::ClockSettings;
use crate::engine::PhysicsEngine;
use crate::registry::TrackedBody;
use crate::sync::{self, WorldSnapshot};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback invoked with the tick timestamp in milliseconds
pub type TickCallback = Box<dyn FnMut(f64)>;

/// Handle of a registered interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wrap a raw timer key
    pub fn new(raw: u64) -> Self {
        TimerHandle(raw)
    }

    /// Raw timer key
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Host periodic timer
pub trait TimerService {
    /// Invoke `callback` every `interval_ms` until cleared
    fn set_interval(&mut self, interval_ms: u64, callback: TickCallback) -> TimerHandle;

    /// Cancel an interval; unknown handles are ignored
    fn clear_interval(&mut self, handle: TimerHandle);
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Clock stopped or tick from an earlier run; nothing happened
    Stale,
    /// First tick of a run; timestamp recorded, no step
    Primed,
    /// Engine stepped and nodes synced
    Stepped {
        /// Seconds since the previous tick
        dt: f64,
        /// Fixed steps the engine ran
        steps: u32,
        /// Node fields written
        synced: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Stopped,
    Running { timer: Option<TimerHandle> },
}

/// Fixed-timestep scheduler state machine
#[derive(Debug)]
pub struct SimulationClock {
    settings: ClockSettings,
    state: ClockState,
    generation: u64,
    previous: Option<f64>,
    snapshot: Option<WorldSnapshot>,
}

impl SimulationClock {
    /// Create a stopped clock
    pub fn new(settings: ClockSettings) -> Self {
        SimulationClock {
            settings,
            state: ClockState::Stopped,
            generation: 0,
            previous: None,
            snapshot: None,
        }
    }

    /// Stepping settings
    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    /// Whether the clock is running
    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    /// Generation tag of the current run
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Baseline captured by the last `start`
    pub fn snapshot(&self) -> Option<&WorldSnapshot> {
        self.snapshot.as_ref()
    }

    /// Timer of the current run
    pub fn timer(&self) -> Option<TimerHandle> {
        match self.state {
            ClockState::Running { timer } => timer,
            ClockState::Stopped => None,
        }
    }

    /// Enter Running, capturing the baseline of `bodies`
    ///
    /// Returns the generation tag to attach to the timer callback, or `None`
    /// if the clock was already running.
    pub fn start<E: PhysicsEngine + ?Sized>(
        &mut self,
        engine: &E,
        bodies: &[TrackedBody],
    ) -> Option<u64> {
        if self.is_running() {
            return None;
        }
        self.snapshot = Some(sync::snapshot(engine, bodies));
        self.generation += 1;
        self.previous = None;
        self.state = ClockState::Running { timer: None };
        tracing::debug!(
            generation = self.generation,
            bodies = bodies.len(),
            "simulation clock started"
        );
        Some(self.generation)
    }

    /// Record the timer that drives the current run
    pub fn attach_timer(&mut self, timer: TimerHandle) {
        if let ClockState::Running { timer: slot } = &mut self.state {
            *slot = Some(timer);
        }
    }

    /// Handle one timer tick
    ///
    /// The first tick of a run only records its timestamp. Later ticks step
    /// the engine by the elapsed wall-clock time and then sync every body.
    pub fn tick<E: PhysicsEngine + ?Sized>(
        &mut self,
        generation: u64,
        timestamp_ms: f64,
        engine: &mut E,
        bodies: &[TrackedBody],
    ) -> TickOutcome {
        if !self.is_running() || generation != self.generation {
            return TickOutcome::Stale;
        }

        let previous = self.previous.replace(timestamp_ms);
        let Some(previous) = previous else {
            return TickOutcome::Primed;
        };

        let dt = (timestamp_ms - previous) / 1000.0;
        let steps = engine.step(
            self.settings.fixed_time_step,
            dt,
            self.settings.max_sub_steps,
        );
        let synced = sync::apply_all(engine, bodies);
        tracing::trace!(dt, steps, synced, "tick");

        TickOutcome::Stepped { dt, steps, synced }
    }

    /// Leave Running and restore the baseline
    ///
    /// Returns the timer to cancel, or `None` if the clock was already
    /// stopped, in which case nothing else happens.
    pub fn stop<E: PhysicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        bodies: &[TrackedBody],
    ) -> Option<Option<TimerHandle>> {
        let timer = match self.state {
            ClockState::Running { timer } => timer,
            ClockState::Stopped => return None,
        };
        self.state = ClockState::Stopped;
        self.generation += 1;
        self.previous = None;

        engine.reset_pending_time();
        let restored = match &self.snapshot {
            Some(snapshot) => sync::restore_all(engine, bodies, snapshot),
            None => 0,
        };
        tracing::debug!(restored, "simulation clock stopped");
        Some(timer)
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(ClockSettings::default())
    }
}

struct Interval {
    period_ms: f64,
    next_due_ms: f64,
    // taken out while the callback runs
    callback: Option<TickCallback>,
}

#[derive(Default)]
struct ManualTimerState {
    now_ms: f64,
    next_id: u64,
    intervals: BTreeMap<u64, Interval>,
}

/// Deterministic [`TimerService`] driven by explicit calls
///
/// Clones share state: hand one to the world and keep one to advance time.
/// Callbacks may set or clear intervals on the same timer while running.
///
/// ```
/// use physics_sync::clock::{ManualTimer, TimerService};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let mut timer = ManualTimer::new();
/// let hits = Rc::new(Cell::new(0));
/// let counter = hits.clone();
/// timer.set_interval(5, Box::new(move |_| counter.set(counter.get() + 1)));
///
/// timer.advance(16.0);
/// assert_eq!(hits.get(), 3);
/// ```
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Rc<RefCell<ManualTimerState>>,
}

impl ManualTimer {
    /// Create a timer at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds
    pub fn now(&self) -> f64 {
        self.state.borrow().now_ms
    }

    /// Number of live intervals
    pub fn active_intervals(&self) -> usize {
        self.state.borrow().intervals.len()
    }

    /// Advance time, firing every interval that falls due, in time order
    pub fn advance(&self, ms: f64) {
        let target = self.now() + ms.max(0.0);
        loop {
            let due = {
                let state = self.state.borrow();
                let next = state
                    .intervals
                    .iter()
                    .filter(|(_, i)| i.callback.is_some() && i.next_due_ms <= target)
                    .min_by(|(ia, a), (ib, b)| {
                        a.next_due_ms
                            .total_cmp(&b.next_due_ms)
                            .then_with(|| ia.cmp(ib))
                    })
                    .map(|(&id, i)| (id, i.next_due_ms));
                next
            };
            let Some((id, at)) = due else {
                break;
            };
            self.state.borrow_mut().now_ms = at;
            self.run(id, at, true);
        }
        self.state.borrow_mut().now_ms = target;
    }

    /// Fire every live interval once at `timestamp_ms` without rescheduling
    pub fn fire(&self, timestamp_ms: f64) {
        self.state.borrow_mut().now_ms = timestamp_ms;
        let ids: Vec<u64> = self.state.borrow().intervals.keys().copied().collect();
        for id in ids {
            self.run(id, timestamp_ms, false);
        }
    }

    fn run(&self, id: u64, at: f64, reschedule: bool) {
        let callback = self
            .state
            .borrow_mut()
            .intervals
            .get_mut(&id)
            .and_then(|i| i.callback.take());
        let Some(mut callback) = callback else {
            return;
        };

        callback(at);

        let mut state = self.state.borrow_mut();
        // cleared from inside the callback: drop it
        if let Some(interval) = state.intervals.get_mut(&id) {
            interval.callback = Some(callback);
            if reschedule {
                interval.next_due_ms += interval.period_ms;
            }
        }
    }
}

impl TimerService for ManualTimer {
    fn set_interval(&mut self, interval_ms: u64, callback: TickCallback) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let period_ms = interval_ms.max(1) as f64;
        let next_due_ms = state.now_ms + period_ms;
        state.intervals.insert(
            id,
            Interval {
                period_ms,
                next_due_ms,
                callback: Some(callback),
            },
        );
        TimerHandle(id)
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        self.state.borrow_mut().intervals.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncPolicy;
    use crate::engine::{BodyDesc, ReferenceEngine, Shape};
    use crate::math::{Mass, Quaternion, Vector3};
    use crate::registry::WorldRegistry;
    use crate::scene::{NodeRef, NodeTransform, SceneNode, SceneObject};
    use std::cell::Cell;

    fn falling_world() -> (ReferenceEngine, WorldRegistry, Rc<RefCell<SceneObject>>) {
        let mut engine = ReferenceEngine::new();
        engine.set_gravity(Vector3::new(0.0, -9.82, 0.0));
        let handle = engine.add_body(BodyDesc {
            shape: Shape::Sphere { radius: 0.1 },
            mass: Mass::new(1.0),
            position: Vector3::new(0.0, 2.0, 0.0),
            quaternion: Quaternion::identity(),
            angular_damping: 0.8,
        });
        let node = SceneObject::shared("ball", NodeTransform::at(0.0, 2.0, 0.0));
        let node_ref: NodeRef = node.clone();
        let mut registry = WorldRegistry::new();
        registry.add_body(handle, Some(node_ref), SyncPolicy::default(), false);
        (engine, registry, node)
    }

    #[test]
    fn test_first_tick_only_primes() {
        let (mut engine, registry, node) = falling_world();
        let mut clock = SimulationClock::default();
        let generation = clock.start(&engine, registry.bodies()).unwrap();

        let outcome = clock.tick(generation, 1000.0, &mut engine, registry.bodies());
        assert_eq!(outcome, TickOutcome::Primed);
        assert_eq!(node.borrow().transform().y, 2.0);
    }

    #[test]
    fn test_second_tick_steps_and_syncs() {
        let (mut engine, registry, node) = falling_world();
        let mut clock = SimulationClock::default();
        let generation = clock.start(&engine, registry.bodies()).unwrap();

        clock.tick(generation, 1000.0, &mut engine, registry.bodies());
        let outcome = clock.tick(generation, 1016.0, &mut engine, registry.bodies());

        match outcome {
            TickOutcome::Stepped { dt, steps, synced } => {
                assert!((dt - 0.016).abs() < 1e-12);
                assert_eq!(steps, 1);
                assert_eq!(synced, 6);
            }
            other => panic!("expected a step, got {:?}", other),
        }
        assert!(node.borrow().transform().y < 2.0);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let (mut engine, registry, node) = falling_world();
        let mut clock = SimulationClock::default();
        let old = clock.start(&engine, registry.bodies()).unwrap();
        clock.stop(&mut engine, registry.bodies());
        let current = clock.start(&engine, registry.bodies()).unwrap();
        assert_ne!(old, current);

        clock.tick(old, 0.0, &mut engine, registry.bodies());
        assert_eq!(
            clock.tick(old, 100.0, &mut engine, registry.bodies()),
            TickOutcome::Stale
        );
        assert_eq!(node.borrow().transform().y, 2.0);
    }

    #[test]
    fn test_tick_after_stop_is_stale() {
        let (mut engine, registry, _node) = falling_world();
        let mut clock = SimulationClock::default();
        let generation = clock.start(&engine, registry.bodies()).unwrap();
        clock.tick(generation, 0.0, &mut engine, registry.bodies());
        clock.stop(&mut engine, registry.bodies());

        assert_eq!(
            clock.tick(generation, 16.0, &mut engine, registry.bodies()),
            TickOutcome::Stale
        );
    }

    #[test]
    fn test_start_twice_and_stop_twice() {
        let (mut engine, registry, _node) = falling_world();
        let mut clock = SimulationClock::default();
        assert!(clock.stop(&mut engine, registry.bodies()).is_none());

        assert!(clock.start(&engine, registry.bodies()).is_some());
        assert!(clock.start(&engine, registry.bodies()).is_none());
        clock.attach_timer(TimerHandle::new(4));
        assert_eq!(clock.timer(), Some(TimerHandle::new(4)));

        assert_eq!(
            clock.stop(&mut engine, registry.bodies()),
            Some(Some(TimerHandle::new(4)))
        );
        assert!(!clock.is_running());
        assert!(clock.stop(&mut engine, registry.bodies()).is_none());
    }

    #[test]
    fn test_stop_restores_baseline() {
        let (mut engine, registry, node) = falling_world();
        let mut clock = SimulationClock::default();
        let generation = clock.start(&engine, registry.bodies()).unwrap();
        for t in 0..30 {
            clock.tick(generation, t as f64 * 16.0, &mut engine, registry.bodies());
        }
        assert!(node.borrow().transform().y < 1.9);

        clock.stop(&mut engine, registry.bodies());
        assert_eq!(node.borrow().transform().y, 2.0);
        let handle = registry.bodies()[0].handle();
        assert_eq!(engine.body(handle).unwrap().velocity, Vector3::zero());
    }

    #[test]
    fn test_restart_does_not_reuse_old_timestamp() {
        let (mut engine, registry, node) = falling_world();
        let mut clock = SimulationClock::default();
        let first = clock.start(&engine, registry.bodies()).unwrap();
        clock.tick(first, 0.0, &mut engine, registry.bodies());
        clock.stop(&mut engine, registry.bodies());

        let second = clock.start(&engine, registry.bodies()).unwrap();
        // an hour later: primes instead of stepping an hour of backlog
        assert_eq!(
            clock.tick(second, 3_600_000.0, &mut engine, registry.bodies()),
            TickOutcome::Primed
        );
        assert_eq!(node.borrow().transform().y, 2.0);
    }

    #[test]
    fn test_manual_timer_fires_in_order() {
        let mut timer = ManualTimer::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let fast = log.clone();
        let slow = log.clone();
        timer.set_interval(5, Box::new(move |t| fast.borrow_mut().push(("fast", t))));
        timer.set_interval(8, Box::new(move |t| slow.borrow_mut().push(("slow", t))));

        timer.advance(10.0);
        assert_eq!(
            *log.borrow(),
            vec![("fast", 5.0), ("slow", 8.0), ("fast", 10.0)]
        );
        assert_eq!(timer.now(), 10.0);
    }

    #[test]
    fn test_manual_timer_clear_from_inside_callback() {
        let timer = ManualTimer::new();
        let hits = Rc::new(Cell::new(0));
        let slot: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));

        let mut inner = timer.clone();
        let counter = hits.clone();
        let own = slot.clone();
        let handle = timer.clone().set_interval(
            5,
            Box::new(move |_| {
                counter.set(counter.get() + 1);
                if let Some(h) = own.get() {
                    inner.clear_interval(h);
                }
            }),
        );
        slot.set(Some(handle));

        timer.advance(50.0);
        assert_eq!(hits.get(), 1);
        assert_eq!(timer.active_intervals(), 0);
    }

    #[test]
    fn test_manual_timer_fire() {
        let mut timer = ManualTimer::new();
        let seen = Rc::new(Cell::new(0.0));
        let out = seen.clone();
        timer.set_interval(5, Box::new(move |t| out.set(t)));

        timer.fire(1234.0);
        assert_eq!(seen.get(), 1234.0);
        assert_eq!(timer.now(), 1234.0);
    }
}
