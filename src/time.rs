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

//! Time management and fixed timestep support.
//!
//! This module provides:
//! - [`Clock`] - an injectable source of "now", so a `Scheduler` never reads
//!   the wall clock directly and a run can be driven by a fake clock in tests
//! - [`Time`] - frame timing and delta time tracking, fed by a `Clock`
//! - [`FixedTime`] - a fixed-timestep accumulator for deterministic updates
//!
//! # Examples
//!
//! ```
//! use sim_core::time::{FixedTime, SystemClock, Time};
//!
//! let clock = SystemClock::new();
//! let mut time = Time::new();
//! let mut fixed = FixedTime::new(60); // 60 Hz
//!
//! time.update(&clock);
//! fixed.accumulate(time.delta());
//! while fixed.try_consume_step() {
//!     // Run one fixed-step update.
//! }
//! ```

use std::time::{Duration, Instant};

/// A source of monotonic "now". The scheduler and `Time` never call
/// `Instant::now()` directly; they go through a `Clock` so a test can
/// substitute a deterministic one.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for deterministic tests and
/// headless replays where no real time should pass between steps.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Instant,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self { now: start }
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
    }
}

/// Frame timing: delta time and total elapsed time since `Time::new`,
/// sampled from an injected [`Clock`] rather than the wall clock directly.
#[derive(Clone, Debug)]
pub struct Time {
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    time_scale: f32,
    startup: Option<Instant>,
    last_update: Option<Instant>,
}

impl Time {
    pub fn new() -> Self {
        Self {
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            time_scale: 1.0,
            startup: None,
            last_update: None,
        }
    }

    /// Sample `clock` and advance delta/elapsed/frame_count. The first call
    /// after construction establishes the baseline and reports a zero delta.
    pub fn update(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        let startup = *self.startup.get_or_insert(now);
        let last = self.last_update.unwrap_or(startup);
        self.delta = now.duration_since(last);
        self.elapsed = now.duration_since(startup);
        self.last_update = Some(now);
        self.frame_count += 1;
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32() * self.time_scale
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.time_scale = 0.0;
    }

    pub fn resume(&mut self) {
        self.time_scale = 1.0;
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-step accumulator. A caller feeds it wall-clock delta via
/// `accumulate`, then drains whole steps one at a time with
/// `try_consume_step`; each call removes exactly one step's worth of time,
/// so a caller that wants a catch-up loop calls it in a `while` and a caller
/// that wants at most one step per signal calls it once.
#[derive(Clone, Debug)]
pub struct FixedTime {
    timestep: Duration,
    accumulator: Duration,
}

impl FixedTime {
    pub fn new(hz: u32) -> Self {
        Self::from_duration(Duration::from_secs_f64(1.0 / hz.max(1) as f64))
    }

    pub fn from_duration(timestep: Duration) -> Self {
        Self {
            timestep,
            accumulator: Duration::ZERO,
        }
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta;
    }

    /// Remove one timestep from the accumulator if a full step is available.
    pub fn try_consume_step(&mut self) -> bool {
        if self.accumulator >= self.timestep {
            self.accumulator -= self.timestep;
            true
        } else {
            false
        }
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn timestep_seconds(&self) -> f32 {
        self.timestep.as_secs_f32()
    }

    /// Leftover accumulated time, as a fraction of one timestep, usable for
    /// render interpolation between the last and next fixed step.
    pub fn overstep_fraction(&self) -> f32 {
        let step = self.timestep.as_secs_f32();
        if step > 0.0 {
            self.accumulator.as_secs_f32() / step
        } else {
            0.0
        }
    }
}

impl Default for FixedTime {
    fn default() -> Self {
        Self::new(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_reports_zero_delta_on_first_sample() {
        let clock = ManualClock::new(Instant::now());
        let mut time = Time::new();
        time.update(&clock);
        assert_eq!(time.delta(), Duration::ZERO);
        assert_eq!(time.frame_count(), 1);
    }

    #[test]
    fn time_tracks_delta_between_samples() {
        let mut clock = ManualClock::new(Instant::now());
        let mut time = Time::new();
        time.update(&clock);
        clock.advance(Duration::from_millis(16));
        time.update(&clock);
        assert_eq!(time.delta(), Duration::from_millis(16));
        assert_eq!(time.elapsed(), Duration::from_millis(16));
    }

    #[test]
    fn fixed_time_consumes_one_step_per_call() {
        let mut fixed = FixedTime::new(60);
        fixed.accumulate(Duration::from_millis(33));
        assert!(fixed.try_consume_step());
        assert!(fixed.try_consume_step());
        assert!(!fixed.try_consume_step());
    }

    #[test]
    fn fixed_time_partial_accumulation_yields_no_step() {
        let mut fixed = FixedTime::new(60);
        fixed.accumulate(Duration::from_millis(8));
        assert!(!fixed.try_consume_step());
        assert!(fixed.overstep_fraction() > 0.0 && fixed.overstep_fraction() < 1.0);
    }
}
