// Copyright 2024 Saptak Santra
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

//! The deterministic simulation scheduler.
//!
//! One `Scheduler` owns exactly one `World` and two insertion-ordered system
//! lists: update systems (run every tick) and draw systems (run only in
//! headed mode, after update systems, for the same tick). There is no
//! implicit parallelism; systems never run concurrently with each other.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::system::BoxedSystem;
use crate::time::{Clock, FixedTime, SystemClock, Time};
use crate::world::World;

const DEFAULT_TICKS_PER_SECOND: u32 = 60;

/// Owns a `World`, its systems, and the fixed-step accumulator that turns
/// wall-clock deltas into whole ticks.
pub struct Scheduler {
    world: World,
    update_systems: Vec<BoxedSystem>,
    draw_systems: Vec<BoxedSystem>,
    tick_rate: u32,
    clock: Box<dyn Clock + Send + Sync>,
    time: Time,
    fixed: FixedTime,
    started: bool,
}

impl Scheduler {
    pub fn new(world: World) -> Self {
        Self {
            world,
            update_systems: Vec::new(),
            draw_systems: Vec::new(),
            tick_rate: 0,
            clock: Box::new(SystemClock::new()),
            time: Time::new(),
            fixed: FixedTime::new(DEFAULT_TICKS_PER_SECOND),
            started: false,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an update system. Systems run in registration order.
    ///
    /// # Panics
    /// Panics if called after the first `step`/`update`/`run_*` call; system
    /// lists are fixed once a run begins.
    pub fn add_update_system(&mut self, system: BoxedSystem) -> &mut Self {
        assert!(!self.started, "cannot register systems after a run has started");
        self.update_systems.push(system);
        self
    }

    /// Register a draw system, run only by `draw()` in headed mode.
    ///
    /// # Panics
    /// Panics if called after the first `step`/`update`/`run_*` call.
    pub fn add_draw_system(&mut self, system: BoxedSystem) -> &mut Self {
        assert!(!self.started, "cannot register systems after a run has started");
        self.draw_systems.push(system);
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn current_tick(&self) -> u32 {
        self.world.tick()
    }

    /// Zero tick rate means "use the default" when converting a duration to
    /// a tick count in `run_for`.
    pub fn set_tick_rate(&mut self, ticks_per_second: u32) {
        self.tick_rate = ticks_per_second;
        self.fixed = FixedTime::new(self.effective_tick_rate());
    }

    fn effective_tick_rate(&self) -> u32 {
        if self.tick_rate == 0 {
            DEFAULT_TICKS_PER_SECOND
        } else {
            self.tick_rate
        }
    }

    /// Run every update system once, in order, then advance the tick.
    /// Headless mode never surfaces a system error upward: it is logged and
    /// the step still counts, since a QA session converts per-tick problems
    /// into report entries rather than aborting a run.
    pub fn step(&mut self) {
        self.started = true;
        for system in &mut self.update_systems {
            if let Err(err) = system.run(&mut self.world) {
                warn!(system = system.name(), error = %err, "update system failed");
            }
        }
        self.world.increment_tick();
    }

    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Step enough times to cover `duration` at the scheduler's effective
    /// tick rate, rounding up so a partial tick's worth of duration still
    /// advances at least one tick.
    pub fn run_for(&mut self, duration: Duration) {
        let rate = self.effective_tick_rate() as f64;
        let ticks = (duration.as_secs_f64() * rate).ceil() as u32;
        self.step_n(ticks);
    }

    /// Step until `predicate(&world)` returns true, or `max_ticks` ticks
    /// have run. `max_ticks == 0` means no limit; callers that want a
    /// watchdog bound should always pass a nonzero value. Returns the
    /// number of ticks actually run, so a caller can tell a predicate
    /// match apart from hitting the ceiling.
    pub fn run_until(&mut self, max_ticks: u32, mut predicate: impl FnMut(&World) -> bool) -> u32 {
        let mut ran = 0u32;
        loop {
            if predicate(&self.world) {
                return ran;
            }
            if max_ticks != 0 && ran >= max_ticks {
                debug!(max_ticks, "run_until hit its tick ceiling");
                return ran;
            }
            self.step();
            ran += 1;
        }
    }

    /// Step `n` times, invoking `callback` with the world after every step.
    pub fn run_with_callback(&mut self, n: u32, mut callback: impl FnMut(&World)) {
        for _ in 0..n {
            self.step();
            callback(&self.world);
        }
    }

    /// Run all update systems, then all draw systems, for one frame. Unlike
    /// headless `step`, a system error here is surfaced to the host rather
    /// than swallowed.
    pub fn update(&mut self) -> Result<()> {
        self.started = true;
        self.time.update(self.clock.as_ref());
        self.fixed.accumulate(self.time.delta());
        while self.fixed.try_consume_step() {
            for system in &mut self.update_systems {
                system.run(&mut self.world)?;
            }
            self.world.increment_tick();
        }
        Ok(())
    }

    pub fn draw(&mut self) -> Result<()> {
        for system in &mut self.draw_systems {
            system.run(&mut self.world)?;
        }
        Ok(())
    }

    /// Discard the world and zero the tick; system lists are kept.
    pub fn reset(&mut self) {
        self.world.reset();
        self.time = Time::new();
        self.fixed = FixedTime::new(self.effective_tick_rate());
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSystem;
    impl crate::system::System for CountingSystem {
        fn name(&self) -> &'static str {
            "CountingSystem"
        }
        fn run(&mut self, world: &mut World) -> Result<()> {
            let count = world.resource::<u32>().copied().unwrap_or(0);
            world.insert_resource(count + 1);
            Ok(())
        }
    }

    #[test]
    fn smoke_step_advances_tick_and_runs_systems() {
        let mut scheduler = Scheduler::new(World::new());
        scheduler.add_update_system(Box::new(CountingSystem));
        scheduler.step_n(100);
        assert_eq!(scheduler.current_tick(), 100);
        assert_eq!(*scheduler.world().resource::<u32>().unwrap(), 100);
    }

    #[test]
    fn run_until_stops_at_predicate() {
        let mut scheduler = Scheduler::new(World::new());
        scheduler.add_update_system(Box::new(CountingSystem));
        let ran = scheduler.run_until(1000, |world| world.tick() >= 10);
        assert_eq!(scheduler.current_tick(), 10);
        assert_eq!(ran, 10);
    }

    #[test]
    fn run_until_respects_max_ticks_ceiling() {
        let mut scheduler = Scheduler::new(World::new());
        let ran = scheduler.run_until(5, |_| false);
        assert_eq!(scheduler.current_tick(), 5);
        assert_eq!(ran, 5);
    }

    #[test]
    fn reset_discards_world_and_zeros_tick() {
        let mut scheduler = Scheduler::new(World::new());
        scheduler.step_n(5);
        scheduler.reset();
        assert_eq!(scheduler.current_tick(), 0);
    }
}
